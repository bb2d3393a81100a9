//! Value types shared by the nl80211 records: MAC addresses, channel
//! widths, bands and channel definitions.

use std::fmt;
use std::str::FromStr;

use super::consts::{attr, tx_power};
use crate::netlink::{AttrNode, AttrTable, Error};

/// A 48-bit hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub const BROADCAST: Self = Self([0xff; 6]);

    /// Build from an attribute payload; `None` unless exactly 6 bytes.
    pub fn from_slice(data: &[u8]) -> Option<Self> {
        <[u8; 6]>::try_from(data).ok().map(Self)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 6]
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl FromStr for MacAddr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidArgument(format!("invalid MAC address: {}", s));
        let mut out = [0u8; 6];
        let mut parts = s.split(':');
        for byte in out.iter_mut() {
            let part = parts.next().ok_or_else(invalid)?;
            if part.len() != 2 {
                return Err(invalid());
            }
            *byte = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self(out))
    }
}

#[cfg(feature = "output")]
impl serde::Serialize for MacAddr {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Channel width (`NL80211_CHAN_WIDTH_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "output", derive(serde::Serialize))]
pub enum ChannelWidth {
    NoHt20,
    Mhz20,
    Mhz40,
    Mhz80,
    Mhz80P80,
    Mhz160,
    Mhz5,
    Mhz10,
    Mhz1,
    Mhz2,
    Mhz4,
    Mhz8,
    Mhz16,
    Mhz320,
    /// Id not known to this crate.
    Unknown,
}

impl ChannelWidth {
    /// Every width with a wire id.
    pub const ALL: [ChannelWidth; 14] = [
        Self::NoHt20,
        Self::Mhz20,
        Self::Mhz40,
        Self::Mhz80,
        Self::Mhz80P80,
        Self::Mhz160,
        Self::Mhz5,
        Self::Mhz10,
        Self::Mhz1,
        Self::Mhz2,
        Self::Mhz4,
        Self::Mhz8,
        Self::Mhz16,
        Self::Mhz320,
    ];

    pub fn from_id(id: u32) -> Self {
        match id {
            0 => Self::NoHt20,
            1 => Self::Mhz20,
            2 => Self::Mhz40,
            3 => Self::Mhz80,
            4 => Self::Mhz80P80,
            5 => Self::Mhz160,
            6 => Self::Mhz5,
            7 => Self::Mhz10,
            8 => Self::Mhz1,
            9 => Self::Mhz2,
            10 => Self::Mhz4,
            11 => Self::Mhz8,
            12 => Self::Mhz16,
            13 => Self::Mhz320,
            _ => Self::Unknown,
        }
    }

    /// Wire id; `None` for [`ChannelWidth::Unknown`].
    pub fn id(self) -> Option<u32> {
        Some(match self {
            Self::NoHt20 => 0,
            Self::Mhz20 => 1,
            Self::Mhz40 => 2,
            Self::Mhz80 => 3,
            Self::Mhz80P80 => 4,
            Self::Mhz160 => 5,
            Self::Mhz5 => 6,
            Self::Mhz10 => 7,
            Self::Mhz1 => 8,
            Self::Mhz2 => 9,
            Self::Mhz4 => 10,
            Self::Mhz8 => 11,
            Self::Mhz16 => 12,
            Self::Mhz320 => 13,
            Self::Unknown => return None,
        })
    }

    /// Occupied bandwidth in MHz (80+80 counts both segments).
    pub fn mhz(self) -> u32 {
        match self {
            Self::NoHt20 | Self::Mhz20 => 20,
            Self::Mhz40 => 40,
            Self::Mhz80 => 80,
            Self::Mhz80P80 | Self::Mhz160 => 160,
            Self::Mhz5 => 5,
            Self::Mhz10 => 10,
            Self::Mhz1 => 1,
            Self::Mhz2 => 2,
            Self::Mhz4 => 4,
            Self::Mhz8 => 8,
            Self::Mhz16 => 16,
            Self::Mhz320 => 320,
            Self::Unknown => 0,
        }
    }
}

impl fmt::Display for ChannelWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoHt20 => write!(f, "20 MHz (no HT)"),
            Self::Mhz80P80 => write!(f, "80+80 MHz"),
            Self::Unknown => write!(f, "unknown"),
            other => write!(f, "{} MHz", other.mhz()),
        }
    }
}

/// Frequency band (`NL80211_BAND_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "output", derive(serde::Serialize))]
pub enum Band {
    Ghz2,
    Ghz5,
    Ghz60,
    Ghz6,
    S1g,
    Lc,
    /// Id not known to this crate.
    Unknown,
}

impl Band {
    /// Every band with a wire id.
    pub const ALL: [Band; 6] = [
        Self::Ghz2,
        Self::Ghz5,
        Self::Ghz60,
        Self::Ghz6,
        Self::S1g,
        Self::Lc,
    ];

    pub fn from_id(id: u32) -> Self {
        match id {
            0 => Self::Ghz2,
            1 => Self::Ghz5,
            2 => Self::Ghz60,
            3 => Self::Ghz6,
            4 => Self::S1g,
            5 => Self::Lc,
            _ => Self::Unknown,
        }
    }

    /// Wire id; `None` for [`Band::Unknown`].
    pub fn id(self) -> Option<u32> {
        Some(match self {
            Self::Ghz2 => 0,
            Self::Ghz5 => 1,
            Self::Ghz60 => 2,
            Self::Ghz6 => 3,
            Self::S1g => 4,
            Self::Lc => 5,
            Self::Unknown => return None,
        })
    }

    /// Band a center frequency (MHz) falls in.
    pub fn from_freq(freq: u32) -> Self {
        match freq {
            2400..=2500 => Self::Ghz2,
            4900..=5924 => Self::Ghz5,
            5925..=7125 => Self::Ghz6,
            58320..=70200 => Self::Ghz60,
            _ => Self::Unknown,
        }
    }

    /// Rank used when choosing the "highest" band: 2.4 < 5 < 6 < 60.
    pub fn rank(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::S1g => 1,
            Self::Ghz2 => 2,
            Self::Ghz5 => 3,
            Self::Ghz6 => 4,
            Self::Ghz60 => 5,
            Self::Lc => 6,
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ghz2 => "2.4GHz",
            Self::Ghz5 => "5GHz",
            Self::Ghz60 => "60GHz",
            Self::Ghz6 => "6GHz",
            Self::S1g => "S1G",
            Self::Lc => "LC",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// IEEE channel number for a frequency in MHz; 0 when unknown.
pub fn freq_to_channel(freq: u32) -> u32 {
    match freq {
        2484 => 14,
        2407..=2483 => (freq - 2407) / 5,
        4910..=4980 => (freq - 4000) / 5,
        5000..=5924 => (freq - 5000) / 5,
        5935 => 2,
        5950..=7125 => (freq - 5950) / 5,
        58320..=70200 => (freq - 56160) / 2160,
        _ => 0,
    }
}

/// Center frequency of `channel` in `band`; 0 when unknown.
pub fn channel_to_freq(channel: u32, band: Band) -> u32 {
    match band {
        Band::Ghz2 => match channel {
            14 => 2484,
            1..=13 => 2407 + channel * 5,
            _ => 0,
        },
        Band::Ghz5 => match channel {
            182..=196 => 4000 + channel * 5,
            1..=181 => 5000 + channel * 5,
            _ => 0,
        },
        Band::Ghz6 => match channel {
            2 => 5935,
            1..=233 => 5950 + channel * 5,
            _ => 0,
        },
        Band::Ghz60 => match channel {
            1..=6 => 56160 + channel * 2160,
            _ => 0,
        },
        _ => 0,
    }
}

/// A channel definition: control frequency, width and segment centers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "output", derive(serde::Serialize))]
pub struct ChannelSpec {
    /// Control channel frequency (MHz).
    pub freq: u32,
    pub width: ChannelWidth,
    pub center_freq1: Option<u32>,
    pub center_freq2: Option<u32>,
}

impl ChannelSpec {
    /// A 20 MHz channel centered on `freq`.
    pub fn new(freq: u32) -> Self {
        Self {
            freq,
            width: ChannelWidth::Mhz20,
            center_freq1: Some(freq),
            center_freq2: None,
        }
    }

    pub fn width(mut self, width: ChannelWidth) -> Self {
        self.width = width;
        self
    }

    pub fn center_freq1(mut self, freq: u32) -> Self {
        self.center_freq1 = Some(freq);
        self
    }

    pub fn center_freq2(mut self, freq: u32) -> Self {
        self.center_freq2 = Some(freq);
        self
    }

    pub fn band(&self) -> Band {
        Band::from_freq(self.freq)
    }

    pub fn channel(&self) -> u32 {
        freq_to_channel(self.freq)
    }

    /// Read the channel-definition attributes of a message; `None` when no
    /// frequency is present.
    pub fn from_table(table: &AttrTable<'_>) -> Option<Self> {
        let freq = table.u32(attr::WIPHY_FREQ)?;
        Some(Self {
            freq,
            width: table
                .u32(attr::CHANNEL_WIDTH)
                .map_or(ChannelWidth::Mhz20, ChannelWidth::from_id),
            center_freq1: table.u32(attr::CENTER_FREQ1),
            center_freq2: table.u32(attr::CENTER_FREQ2),
        })
    }

    /// Encode as channel-definition attributes.
    pub fn to_attrs(&self) -> Vec<AttrNode> {
        let mut nodes = vec![AttrNode::u32(attr::WIPHY_FREQ, self.freq)];
        if let Some(id) = self.width.id() {
            nodes.push(AttrNode::u32(attr::CHANNEL_WIDTH, id));
        }
        if let Some(cf1) = self.center_freq1 {
            nodes.push(AttrNode::u32(attr::CENTER_FREQ1, cf1));
        }
        if let Some(cf2) = self.center_freq2 {
            nodes.push(AttrNode::u32(attr::CENTER_FREQ2, cf2));
        }
        nodes
    }
}

impl fmt::Display for ChannelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} MHz (channel {}), width {}", self.freq, self.channel(), self.width)?;
        if let Some(cf1) = self.center_freq1 {
            write!(f, ", center1 {} MHz", cf1)?;
        }
        if let Some(cf2) = self.center_freq2 {
            write!(f, ", center2 {} MHz", cf2)?;
        }
        Ok(())
    }
}

/// Transmit power request. Levels are in mBm (1/100 dBm).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxPowerSetting {
    /// Let the driver pick.
    Automatic,
    /// Cap at the given level.
    Limited(u32),
    /// Force the given level.
    Fixed(u32),
}

impl TxPowerSetting {
    pub fn to_attrs(&self) -> Vec<AttrNode> {
        match *self {
            Self::Automatic => vec![AttrNode::u32(
                attr::WIPHY_TX_POWER_SETTING,
                tx_power::AUTOMATIC,
            )],
            Self::Limited(mbm) => vec![
                AttrNode::u32(attr::WIPHY_TX_POWER_SETTING, tx_power::LIMITED),
                AttrNode::u32(attr::WIPHY_TX_POWER_LEVEL, mbm),
            ],
            Self::Fixed(mbm) => vec![
                AttrNode::u32(attr::WIPHY_TX_POWER_SETTING, tx_power::FIXED),
                AttrNode::u32(attr::WIPHY_TX_POWER_LEVEL, mbm),
            ],
        }
    }
}

/// Wiphy id carried by a message: the `WIPHY` attribute, or the upper 32
/// bits of the `WDEV` identifier when only that is present.
pub fn wiphy_id(table: &AttrTable<'_>) -> Option<u32> {
    table
        .u32(attr::WIPHY)
        .or_else(|| table.u64(attr::WDEV).map(|wdev| (wdev >> 32) as u32))
}

/// Extract the SSID element (id 0) from a raw information-element blob.
pub fn ssid_from_ies(ies: &[u8]) -> Option<String> {
    let mut rest = ies;
    while rest.len() >= 2 {
        let (id, len) = (rest[0], rest[1] as usize);
        let body = rest.get(2..2 + len)?;
        if id == 0 {
            return Some(String::from_utf8_lossy(body).into_owned());
        }
        rest = &rest[2 + len..];
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::tree::encode;

    #[test]
    fn test_width_roundtrip() {
        for width in ChannelWidth::ALL {
            let id = width.id().unwrap();
            assert_eq!(ChannelWidth::from_id(id), width);
        }
        for id in 0..14 {
            assert_eq!(ChannelWidth::from_id(id).id(), Some(id));
        }
        assert_eq!(ChannelWidth::from_id(99), ChannelWidth::Unknown);
        assert_eq!(ChannelWidth::Unknown.id(), None);
    }

    #[test]
    fn test_band_roundtrip() {
        for band in Band::ALL {
            assert_eq!(Band::from_id(band.id().unwrap()), band);
        }
        assert_eq!(Band::from_id(42), Band::Unknown);
        assert_eq!(Band::Unknown.id(), None);
    }

    #[test]
    fn test_freq_channel() {
        assert_eq!(freq_to_channel(2412), 1);
        assert_eq!(freq_to_channel(2484), 14);
        assert_eq!(freq_to_channel(5180), 36);
        assert_eq!(freq_to_channel(5955), 1);
        assert_eq!(freq_to_channel(100), 0);
        assert_eq!(channel_to_freq(36, Band::Ghz5), 5180);
        assert_eq!(channel_to_freq(1, Band::Ghz6), 5955);
        assert_eq!(channel_to_freq(6, Band::Ghz2), 2437);
        assert_eq!(channel_to_freq(0, Band::Ghz2), 0);
        assert_eq!(Band::from_freq(5955), Band::Ghz6);
        assert_eq!(Band::from_freq(5180), Band::Ghz5);
        assert_eq!(Band::from_freq(10), Band::Unknown);
    }

    #[test]
    fn test_mac_parse_display() {
        let mac: MacAddr = "02:00:00:AB:cd:10".parse().unwrap();
        assert_eq!(mac.0, [0x02, 0, 0, 0xab, 0xcd, 0x10]);
        assert_eq!(mac.to_string(), "02:00:00:ab:cd:10");
        assert!("02:00:00:ab:cd".parse::<MacAddr>().is_err());
        assert!("02:00:00:ab:cd:10:11".parse::<MacAddr>().is_err());
        assert!("zz:00:00:ab:cd:10".parse::<MacAddr>().is_err());
        assert_eq!(MacAddr::from_slice(&[1, 2, 3]), None);
    }

    #[test]
    fn test_wiphy_id_prefers_wiphy_attr() {
        let with_wiphy = encode(&[
            AttrNode::u32(attr::WIPHY, 0x0103),
            AttrNode::u64(attr::WDEV, 0x0002_0000_0001),
        ])
        .unwrap();
        assert_eq!(wiphy_id(&AttrTable::parse(&with_wiphy)), Some(0x0103));

        let wdev_only = encode(&[AttrNode::u64(attr::WDEV, 0x0002_0000_0001)]).unwrap();
        assert_eq!(wiphy_id(&AttrTable::parse(&wdev_only)), Some(0x0002));

        assert_eq!(wiphy_id(&AttrTable::parse(&[])), None);
    }

    #[test]
    fn test_channel_spec_attrs() {
        let spec = ChannelSpec::new(5180)
            .width(ChannelWidth::Mhz80)
            .center_freq1(5210);
        let bytes = encode(&spec.to_attrs()).unwrap();
        let parsed = ChannelSpec::from_table(&AttrTable::parse(&bytes)).unwrap();
        assert_eq!(parsed, spec);
        assert_eq!(parsed.channel(), 36);
        assert_eq!(parsed.band(), Band::Ghz5);
    }

    #[test]
    fn test_ssid_from_ies() {
        let ies = [1, 2, 0x82, 0x84, 0, 4, b'h', b'o', b'm', b'e'];
        assert_eq!(ssid_from_ies(&ies).as_deref(), Some("home"));
        assert_eq!(ssid_from_ies(&[0, 9, b'x']), None);
        assert_eq!(ssid_from_ies(&[]), None);
    }
}

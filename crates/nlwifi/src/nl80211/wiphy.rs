//! Radio (wiphy) capabilities.
//!
//! Wiphys are fetched with a split dump: the kernel spreads one radio over
//! several messages, and may split a single band across them as well.
//! [`Wiphy::from_replies`] folds the fragments back together.

use super::consts::{Cmd, Iftype, attr, band_attr, freq_attr};
use super::listener::ListenerRegistry;
use super::types::{Band, ChannelWidth, freq_to_channel};
use crate::netlink::attr::get;
use crate::netlink::{AttrNode, AttrTable, Error, GenlReply, NlState, Result, Transport};

const HT_CAP_SUP_WIDTH_20_40: u16 = 1 << 1;
const VHT_CAP_SUPP_CHAN_WIDTH_MASK: u32 = 0b11 << 2;
const VHT_CAP_SUPP_CHAN_WIDTH_160: u32 = 1 << 2;
const VHT_CAP_SUPP_CHAN_WIDTH_160_80P80: u32 = 2 << 2;
const VHT_CAP_SU_BEAMFORMER: u32 = 1 << 11;
const VHT_CAP_SU_BEAMFORMEE: u32 = 1 << 12;
const VHT_CAP_MU_BEAMFORMER: u32 = 1 << 19;
const VHT_CAP_MU_BEAMFORMEE: u32 = 1 << 20;

/// One channel of a band.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "output", derive(serde::Serialize))]
pub struct ChannelInfo {
    pub freq: u32,
    pub channel: u32,
    pub disabled: bool,
    pub no_ir: bool,
    pub radar: bool,
    /// Regulatory power cap (mBm).
    pub max_tx_power_mbm: Option<u32>,
}

impl ChannelInfo {
    fn parse(table: &AttrTable<'_>) -> Option<Self> {
        let freq = table.u32(freq_attr::FREQ)?;
        Some(Self {
            freq,
            channel: freq_to_channel(freq),
            disabled: table.flag(freq_attr::DISABLED),
            no_ir: table.flag(freq_attr::NO_IR),
            radar: table.flag(freq_attr::RADAR),
            max_tx_power_mbm: table.u32(freq_attr::MAX_TX_POWER),
        })
    }
}

/// Capabilities of one band.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "output", derive(serde::Serialize))]
pub struct BandInfo {
    pub band: Band,
    pub channels: Vec<ChannelInfo>,
    pub ht_capa: Option<u16>,
    pub ht_mcs_set: Option<Vec<u8>>,
    pub vht_capa: Option<u32>,
    pub vht_mcs_set: Option<Vec<u8>>,
    /// HE (802.11ax) capabilities are advertised.
    pub he: bool,
}

impl BandInfo {
    fn new(band: Band) -> Self {
        Self {
            band,
            channels: Vec::new(),
            ht_capa: None,
            ht_mcs_set: None,
            vht_capa: None,
            vht_mcs_set: None,
            he: false,
        }
    }

    fn merge(&mut self, table: &AttrTable<'_>) {
        for (_, freq) in table.iter_nested(band_attr::FREQS) {
            let Some(ch) = ChannelInfo::parse(&AttrTable::parse(freq)) else {
                continue;
            };
            if !self.channels.iter().any(|c| c.freq == ch.freq) {
                self.channels.push(ch);
            }
        }
        if let Some(v) = table.u16(band_attr::HT_CAPA) {
            self.ht_capa = Some(v);
        }
        if let Some(v) = table.get(band_attr::HT_MCS_SET) {
            self.ht_mcs_set = Some(v.to_vec());
        }
        if let Some(v) = table.u32(band_attr::VHT_CAPA) {
            self.vht_capa = Some(v);
        }
        if let Some(v) = table.get(band_attr::VHT_MCS_SET) {
            self.vht_mcs_set = Some(v.to_vec());
        }
        self.he |= table.has(band_attr::IFTYPE_DATA);
    }

    /// Receive spatial streams advertised by the HT and VHT MCS sets.
    pub fn spatial_streams(&self) -> u8 {
        let ht = self.ht_mcs_set.as_deref().map_or(0, |set| {
            set.iter().take(4).filter(|b| **b != 0).count() as u8
        });
        // VHT RX MCS map: two bits per stream, little-endian, 3 = unsupported.
        let vht = self
            .vht_mcs_set
            .as_deref()
            .and_then(|set| set.get(..2))
            .map_or(0, |b| {
                let map = u16::from_le_bytes([b[0], b[1]]);
                (0..8u8)
                    .filter(|ss| (map >> (2 * ss)) & 0b11 != 0b11)
                    .map(|ss| ss + 1)
                    .max()
                    .unwrap_or(0)
            });
        ht.max(vht)
    }

    /// Channels usable without restriction.
    pub fn enabled_channels(&self) -> impl Iterator<Item = &ChannelInfo> {
        self.channels.iter().filter(|c| !c.disabled)
    }
}

/// SU/MU beamforming roles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "output", derive(serde::Serialize))]
pub struct Beamforming {
    pub su_beamformer: bool,
    pub su_beamformee: bool,
    pub mu_beamformer: bool,
    pub mu_beamformee: bool,
}

/// A physical radio and what it can do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "output", derive(serde::Serialize))]
pub struct Wiphy {
    pub index: u32,
    pub name: String,
    pub bands: Vec<BandInfo>,
    pub iftypes: Vec<Iftype>,
    pub cipher_suites: Vec<u32>,
    pub antenna_avail_tx: u32,
    pub antenna_avail_rx: u32,
    pub antenna_tx: u32,
    pub antenna_rx: u32,
    pub max_scan_ssids: u8,
    pub max_ap_stations: Option<u32>,
    pub mlo_support: bool,
    pub feature_flags: u32,
    pub ext_features: Vec<u8>,
}

impl Wiphy {
    /// Fold split-dump fragments into one record per wiphy, in first-seen order.
    pub fn from_replies(replies: &[GenlReply]) -> Vec<Wiphy> {
        let mut out: Vec<Wiphy> = Vec::new();
        for reply in replies {
            let table = reply.table();
            let Some(index) = table.u32(attr::WIPHY) else {
                continue;
            };
            let pos = match out.iter().position(|w| w.index == index) {
                Some(pos) => pos,
                None => {
                    out.push(Wiphy {
                        index,
                        ..Default::default()
                    });
                    out.len() - 1
                }
            };
            out[pos].merge(&table);
        }
        out
    }

    fn merge(&mut self, t: &AttrTable<'_>) {
        t.fill_string(attr::WIPHY_NAME, &mut self.name);
        t.fill_u32(attr::WIPHY_ANTENNA_AVAIL_TX, &mut self.antenna_avail_tx);
        t.fill_u32(attr::WIPHY_ANTENNA_AVAIL_RX, &mut self.antenna_avail_rx);
        t.fill_u32(attr::WIPHY_ANTENNA_TX, &mut self.antenna_tx);
        t.fill_u32(attr::WIPHY_ANTENNA_RX, &mut self.antenna_rx);
        t.fill_u8(attr::MAX_NUM_SCAN_SSIDS, &mut self.max_scan_ssids);
        t.fill_u32(attr::FEATURE_FLAGS, &mut self.feature_flags);
        if let Some(v) = t.u32(attr::MAX_AP_ASSOC_STA) {
            self.max_ap_stations = Some(v);
        }
        self.mlo_support |= t.flag(attr::MLO_SUPPORT);
        if let Some(ext) = t.get(attr::EXT_FEATURES) {
            self.ext_features = ext.to_vec();
        }
        if let Some(suites) = t.get(attr::CIPHER_SUITES) {
            self.cipher_suites = suites
                .chunks_exact(4)
                .filter_map(|c| get::u32_ne(c).ok())
                .collect();
        }
        for (kind, _) in t.iter_nested(attr::SUPPORTED_IFTYPES) {
            let iftype = Iftype::from_u32(kind as u32);
            if !self.iftypes.contains(&iftype) {
                self.iftypes.push(iftype);
            }
        }
        for (id, band) in t.iter_nested(attr::WIPHY_BANDS) {
            let band_id = Band::from_id(id as u32);
            let pos = match self.bands.iter().position(|b| b.band == band_id) {
                Some(pos) => pos,
                None => {
                    self.bands.push(BandInfo::new(band_id));
                    self.bands.len() - 1
                }
            };
            self.bands[pos].merge(&AttrTable::parse(band));
        }
    }

    pub fn band(&self, band: Band) -> Option<&BandInfo> {
        self.bands.iter().find(|b| b.band == band)
    }

    pub fn supports_iftype(&self, iftype: Iftype) -> bool {
        self.iftypes.contains(&iftype)
    }

    /// Whether extended feature bit `bit` is set.
    pub fn has_ext_feature(&self, bit: u32) -> bool {
        self.ext_features
            .get((bit / 8) as usize)
            .is_some_and(|b| b & (1 << (bit % 8)) != 0)
    }

    /// Channel widths the HT/VHT capabilities allow, narrowest first.
    pub fn channel_widths(&self) -> Vec<ChannelWidth> {
        let mut widths = Vec::new();
        for band in &self.bands {
            widths.push(ChannelWidth::Mhz20);
            if band.ht_capa.is_some_and(|c| c & HT_CAP_SUP_WIDTH_20_40 != 0) {
                widths.push(ChannelWidth::Mhz40);
            }
            if let Some(vht) = band.vht_capa {
                widths.push(ChannelWidth::Mhz80);
                match vht & VHT_CAP_SUPP_CHAN_WIDTH_MASK {
                    VHT_CAP_SUPP_CHAN_WIDTH_160 => widths.push(ChannelWidth::Mhz160),
                    VHT_CAP_SUPP_CHAN_WIDTH_160_80P80 => {
                        widths.push(ChannelWidth::Mhz160);
                        widths.push(ChannelWidth::Mhz80P80);
                    }
                    _ => {}
                }
            }
        }
        widths.sort_by_key(|w| (w.mhz(), *w));
        widths.dedup();
        widths
    }

    /// Beamforming roles advertised by any band.
    pub fn beamforming(&self) -> Beamforming {
        let caps = self
            .bands
            .iter()
            .filter_map(|b| b.vht_capa)
            .fold(0, |acc, c| acc | c);
        Beamforming {
            su_beamformer: caps & VHT_CAP_SU_BEAMFORMER != 0,
            su_beamformee: caps & VHT_CAP_SU_BEAMFORMEE != 0,
            mu_beamformer: caps & VHT_CAP_MU_BEAMFORMER != 0,
            mu_beamformee: caps & VHT_CAP_MU_BEAMFORMEE != 0,
        }
    }

    /// Best guess at the band the radio operates on.
    ///
    /// In order: the band of `current_freq`; the only band; the highest
    /// band whose stream count equals the number of available TX antennas;
    /// the band with the most streams (ties to the highest band).
    pub fn operating_band(&self, current_freq: Option<u32>) -> Band {
        let current = current_freq.map_or(Band::Unknown, Band::from_freq);
        if current != Band::Unknown {
            return current;
        }
        if let [only] = self.bands.as_slice() {
            return only.band;
        }
        let mask = match self.antenna_avail_tx {
            0 => self.antenna_tx,
            mask => mask,
        };
        let antennas = mask.count_ones() as u8;
        let by_antennas = self
            .bands
            .iter()
            .filter(|b| antennas > 0 && b.spatial_streams() == antennas)
            .max_by_key(|b| b.band.rank());
        if let Some(b) = by_antennas {
            return b.band;
        }
        self.bands
            .iter()
            .max_by_key(|b| (b.spatial_streams(), b.band.rank()))
            .map_or(Band::Unknown, |b| b.band)
    }
}

impl<T: Transport> NlState<T, ListenerRegistry> {
    /// Every wiphy with merged capabilities.
    pub async fn get_wiphys(&mut self) -> Result<Vec<Wiphy>> {
        let command = Cmd::GetWiphy.dump().attr(AttrNode::flag(attr::SPLIT_WIPHY_DUMP));
        let replies = self.request(command).await?;
        Ok(Wiphy::from_replies(&replies))
    }

    /// One wiphy by index.
    pub async fn get_wiphy(&mut self, index: u32) -> Result<Wiphy> {
        let command = Cmd::GetWiphy
            .dump()
            .attr(AttrNode::u32(attr::WIPHY, index))
            .attr(AttrNode::flag(attr::SPLIT_WIPHY_DUMP));
        let replies = match self.request(command).await {
            Ok(replies) => replies,
            Err(e) if e.errno() == Some(libc::ENODEV) || e.errno() == Some(libc::ENOENT) => {
                return Err(Error::WiphyNotFound { wiphy: index });
            }
            Err(e) => return Err(e),
        };
        Wiphy::from_replies(&replies)
            .into_iter()
            .find(|w| w.index == index)
            .ok_or(Error::WiphyNotFound { wiphy: index })
    }
}

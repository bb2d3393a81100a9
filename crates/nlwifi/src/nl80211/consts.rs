//! nl80211 command and attribute identifiers.
//!
//! Values mirror `include/uapi/linux/nl80211.h`. Only the identifiers this
//! crate reads or writes are listed.

use crate::netlink::Command;

/// nl80211 commands.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cmd {
    Unspec = 0,
    GetWiphy = 1,
    SetWiphy = 2,
    NewWiphy = 3,
    DelWiphy = 4,
    GetInterface = 5,
    SetInterface = 6,
    NewInterface = 7,
    DelInterface = 8,
    StartAp = 15,
    StopAp = 16,
    GetStation = 17,
    SetStation = 18,
    NewStation = 19,
    DelStation = 20,
    SetReg = 26,
    ReqSetReg = 27,
    GetReg = 31,
    GetScan = 32,
    TriggerScan = 33,
    NewScanResults = 34,
    ScanAborted = 35,
    RegChange = 36,
    Connect = 46,
    Disconnect = 48,
    GetSurvey = 50,
    NewSurveyResults = 51,
    RegisterFrame = 58,
    Frame = 59,
    FrameTxStatus = 60,
    ChSwitchNotify = 88,
    RadarDetect = 94,
    Vendor = 103,
    ChSwitchStartedNotify = 110,
    WiphyRegChange = 113,
    AbortScan = 114,
}

impl Cmd {
    /// Map a wire id; unknown ids become [`Cmd::Unspec`].
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::GetWiphy,
            2 => Self::SetWiphy,
            3 => Self::NewWiphy,
            4 => Self::DelWiphy,
            5 => Self::GetInterface,
            6 => Self::SetInterface,
            7 => Self::NewInterface,
            8 => Self::DelInterface,
            15 => Self::StartAp,
            16 => Self::StopAp,
            17 => Self::GetStation,
            18 => Self::SetStation,
            19 => Self::NewStation,
            20 => Self::DelStation,
            26 => Self::SetReg,
            27 => Self::ReqSetReg,
            31 => Self::GetReg,
            32 => Self::GetScan,
            33 => Self::TriggerScan,
            34 => Self::NewScanResults,
            35 => Self::ScanAborted,
            36 => Self::RegChange,
            46 => Self::Connect,
            48 => Self::Disconnect,
            50 => Self::GetSurvey,
            51 => Self::NewSurveyResults,
            58 => Self::RegisterFrame,
            59 => Self::Frame,
            60 => Self::FrameTxStatus,
            88 => Self::ChSwitchNotify,
            94 => Self::RadarDetect,
            103 => Self::Vendor,
            110 => Self::ChSwitchStartedNotify,
            113 => Self::WiphyRegChange,
            114 => Self::AbortScan,
            _ => Self::Unspec,
        }
    }

    /// A "do" request for this command.
    pub fn request(self) -> Command {
        Command::new(self as u8, self.name())
    }

    /// A dump request for this command.
    pub fn dump(self) -> Command {
        Command::dump(self as u8, self.name())
    }

    /// Command name used in logs and errors.
    pub fn name(self) -> &'static str {
        match self {
            Self::Unspec => "unspec",
            Self::GetWiphy => "get_wiphy",
            Self::SetWiphy => "set_wiphy",
            Self::NewWiphy => "new_wiphy",
            Self::DelWiphy => "del_wiphy",
            Self::GetInterface => "get_interface",
            Self::SetInterface => "set_interface",
            Self::NewInterface => "new_interface",
            Self::DelInterface => "del_interface",
            Self::StartAp => "start_ap",
            Self::StopAp => "stop_ap",
            Self::GetStation => "get_station",
            Self::SetStation => "set_station",
            Self::NewStation => "new_station",
            Self::DelStation => "del_station",
            Self::SetReg => "set_reg",
            Self::ReqSetReg => "req_set_reg",
            Self::GetReg => "get_reg",
            Self::GetScan => "get_scan",
            Self::TriggerScan => "trigger_scan",
            Self::NewScanResults => "new_scan_results",
            Self::ScanAborted => "scan_aborted",
            Self::RegChange => "reg_change",
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::GetSurvey => "get_survey",
            Self::NewSurveyResults => "new_survey_results",
            Self::RegisterFrame => "register_frame",
            Self::Frame => "frame",
            Self::FrameTxStatus => "frame_tx_status",
            Self::ChSwitchNotify => "ch_switch_notify",
            Self::RadarDetect => "radar_detect",
            Self::Vendor => "vendor",
            Self::ChSwitchStartedNotify => "ch_switch_started_notify",
            Self::WiphyRegChange => "wiphy_reg_change",
            Self::AbortScan => "abort_scan",
        }
    }
}

/// Top-level attributes (`NL80211_ATTR_*`).
pub mod attr {
    pub const WIPHY: u16 = 1;
    pub const WIPHY_NAME: u16 = 2;
    pub const IFINDEX: u16 = 3;
    pub const IFNAME: u16 = 4;
    pub const IFTYPE: u16 = 5;
    pub const MAC: u16 = 6;
    pub const STA_INFO: u16 = 21;
    pub const WIPHY_BANDS: u16 = 22;
    pub const SUPPORTED_IFTYPES: u16 = 32;
    pub const REG_ALPHA2: u16 = 33;
    pub const REG_RULES: u16 = 34;
    pub const WIPHY_FREQ: u16 = 38;
    pub const IE: u16 = 42;
    pub const MAX_NUM_SCAN_SSIDS: u16 = 43;
    pub const SCAN_FREQUENCIES: u16 = 44;
    pub const SCAN_SSIDS: u16 = 45;
    pub const GENERATION: u16 = 46;
    pub const BSS: u16 = 47;
    pub const REG_INITIATOR: u16 = 48;
    pub const REG_TYPE: u16 = 49;
    pub const FRAME: u16 = 51;
    pub const SSID: u16 = 52;
    pub const REASON_CODE: u16 = 54;
    pub const CIPHER_SUITES: u16 = 57;
    pub const DISCONNECTED_BY_AP: u16 = 71;
    pub const STATUS_CODE: u16 = 72;
    pub const PID: u16 = 82;
    pub const FOUR_ADDR: u16 = 83;
    pub const SURVEY_INFO: u16 = 84;
    pub const COOKIE: u16 = 88;
    pub const FRAME_MATCH: u16 = 91;
    pub const ACK: u16 = 92;
    pub const WIPHY_TX_POWER_SETTING: u16 = 97;
    pub const WIPHY_TX_POWER_LEVEL: u16 = 98;
    pub const FRAME_TYPE: u16 = 101;
    pub const WIPHY_ANTENNA_TX: u16 = 105;
    pub const WIPHY_ANTENNA_RX: u16 = 106;
    pub const WIPHY_ANTENNA_AVAIL_TX: u16 = 113;
    pub const WIPHY_ANTENNA_AVAIL_RX: u16 = 114;
    pub const DONT_WAIT_FOR_ACK: u16 = 142;
    pub const FEATURE_FLAGS: u16 = 143;
    pub const WDEV: u16 = 153;
    pub const SCAN_FLAGS: u16 = 158;
    pub const CHANNEL_WIDTH: u16 = 159;
    pub const CENTER_FREQ1: u16 = 160;
    pub const CENTER_FREQ2: u16 = 161;
    pub const RADAR_EVENT: u16 = 168;
    pub const SPLIT_WIPHY_DUMP: u16 = 174;
    pub const VENDOR_ID: u16 = 195;
    pub const VENDOR_SUBCMD: u16 = 196;
    pub const VENDOR_DATA: u16 = 197;
    pub const MAX_AP_ASSOC_STA: u16 = 202;
    pub const EXT_FEATURES: u16 = 217;
    pub const RADAR_BACKGROUND: u16 = 308;
    pub const MLO_LINKS: u16 = 312;
    pub const MLO_LINK_ID: u16 = 313;
    pub const MLO_SUPPORT: u16 = 315;
}

/// Station info (`NL80211_STA_INFO_*`), nested in [`attr::STA_INFO`].
pub mod sta_info {
    pub const INACTIVE_TIME: u16 = 1;
    pub const RX_BYTES: u16 = 2;
    pub const TX_BYTES: u16 = 3;
    pub const SIGNAL: u16 = 7;
    pub const TX_BITRATE: u16 = 8;
    pub const RX_PACKETS: u16 = 9;
    pub const TX_PACKETS: u16 = 10;
    pub const TX_RETRIES: u16 = 11;
    pub const TX_FAILED: u16 = 12;
    pub const SIGNAL_AVG: u16 = 13;
    pub const RX_BITRATE: u16 = 14;
    pub const CONNECTED_TIME: u16 = 16;
    pub const RX_BYTES64: u16 = 23;
    pub const TX_BYTES64: u16 = 24;
}

/// Rate info (`NL80211_RATE_INFO_*`), nested in the bitrate attributes.
pub mod rate_info {
    pub const BITRATE: u16 = 1;
    pub const MCS: u16 = 2;
    pub const WIDTH_40: u16 = 3;
    pub const SHORT_GI: u16 = 4;
    pub const BITRATE32: u16 = 5;
    pub const VHT_MCS: u16 = 6;
    pub const VHT_NSS: u16 = 7;
    pub const WIDTH_80: u16 = 8;
    pub const WIDTH_80P80: u16 = 9;
    pub const WIDTH_160: u16 = 10;
    pub const HE_MCS: u16 = 13;
    pub const HE_NSS: u16 = 14;
    pub const WIDTH_320: u16 = 18;
    pub const EHT_MCS: u16 = 19;
    pub const EHT_NSS: u16 = 20;
}

/// Survey info (`NL80211_SURVEY_INFO_*`).
pub mod survey_info {
    pub const FREQUENCY: u16 = 1;
    pub const NOISE: u16 = 2;
    pub const IN_USE: u16 = 3;
    pub const TIME: u16 = 4;
    pub const TIME_BUSY: u16 = 5;
    pub const TIME_EXT_BUSY: u16 = 6;
    pub const TIME_RX: u16 = 7;
    pub const TIME_TX: u16 = 8;
    pub const TIME_SCAN: u16 = 9;
}

/// Band attributes (`NL80211_BAND_ATTR_*`).
pub mod band_attr {
    pub const FREQS: u16 = 1;
    pub const RATES: u16 = 2;
    pub const HT_MCS_SET: u16 = 3;
    pub const HT_CAPA: u16 = 4;
    pub const VHT_MCS_SET: u16 = 7;
    pub const VHT_CAPA: u16 = 8;
    pub const IFTYPE_DATA: u16 = 9;
}

/// Frequency attributes (`NL80211_FREQUENCY_ATTR_*`).
pub mod freq_attr {
    pub const FREQ: u16 = 1;
    pub const DISABLED: u16 = 2;
    pub const NO_IR: u16 = 3;
    pub const RADAR: u16 = 5;
    pub const MAX_TX_POWER: u16 = 6;
}

/// Regulatory rule attributes (`NL80211_ATTR_REG_RULE_*` and friends),
/// nested in [`attr::REG_RULES`].
pub mod reg_rule {
    pub const FLAGS: u16 = 1;
    pub const FREQ_RANGE_START: u16 = 2;
    pub const FREQ_RANGE_END: u16 = 3;
    pub const FREQ_RANGE_MAX_BW: u16 = 4;
    pub const POWER_RULE_MAX_ANT_GAIN: u16 = 5;
    pub const POWER_RULE_MAX_EIRP: u16 = 6;
    pub const DFS_CAC_TIME: u16 = 7;
}

/// BSS attributes (`NL80211_BSS_*`), nested in [`attr::BSS`].
pub mod bss_attr {
    pub const BSSID: u16 = 1;
    pub const FREQUENCY: u16 = 2;
    pub const TSF: u16 = 3;
    pub const BEACON_INTERVAL: u16 = 4;
    pub const CAPABILITY: u16 = 5;
    pub const INFORMATION_ELEMENTS: u16 = 6;
    pub const SIGNAL_MBM: u16 = 7;
    pub const STATUS: u16 = 9;
    pub const SEEN_MS_AGO: u16 = 10;
}

/// Radar event types (`NL80211_RADAR_*`), carried in [`attr::RADAR_EVENT`].
pub mod radar {
    pub const DETECTED: u32 = 0;
    pub const CAC_FINISHED: u32 = 1;
    pub const CAC_ABORTED: u32 = 2;
    pub const NOP_FINISHED: u32 = 3;
    pub const PRE_CAC_EXPIRED: u32 = 4;
    pub const CAC_STARTED: u32 = 5;
}

/// Scan request flags (`NL80211_SCAN_FLAG_*`).
pub mod scan_flag {
    pub const LOW_PRIORITY: u32 = 1 << 0;
    pub const FLUSH: u32 = 1 << 1;
    pub const AP: u32 = 1 << 2;
}

/// Transmit power setting modes (`NL80211_TX_POWER_*`).
pub mod tx_power {
    pub const AUTOMATIC: u32 = 0;
    pub const LIMITED: u32 = 1;
    pub const FIXED: u32 = 2;
}

/// Interface types.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "output", derive(serde::Serialize))]
pub enum Iftype {
    #[default]
    Unspecified = 0,
    Adhoc = 1,
    Station = 2,
    Ap = 3,
    ApVlan = 4,
    Wds = 5,
    Monitor = 6,
    MeshPoint = 7,
    P2pClient = 8,
    P2pGo = 9,
    P2pDevice = 10,
    Ocb = 11,
    Nan = 12,
}

impl Iftype {
    /// Map a wire id; unknown ids become [`Iftype::Unspecified`].
    pub fn from_u32(value: u32) -> Self {
        match value {
            1 => Self::Adhoc,
            2 => Self::Station,
            3 => Self::Ap,
            4 => Self::ApVlan,
            5 => Self::Wds,
            6 => Self::Monitor,
            7 => Self::MeshPoint,
            8 => Self::P2pClient,
            9 => Self::P2pGo,
            10 => Self::P2pDevice,
            11 => Self::Ocb,
            12 => Self::Nan,
            _ => Self::Unspecified,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Unspecified => "unspecified",
            Self::Adhoc => "IBSS",
            Self::Station => "managed",
            Self::Ap => "AP",
            Self::ApVlan => "AP/VLAN",
            Self::Wds => "WDS",
            Self::Monitor => "monitor",
            Self::MeshPoint => "mesh point",
            Self::P2pClient => "P2P-client",
            Self::P2pGo => "P2P-GO",
            Self::P2pDevice => "P2P-device",
            Self::Ocb => "outside context of a BSS",
            Self::Nan => "NAN",
        }
    }
}

impl std::str::FromStr for Iftype {
    type Err = crate::netlink::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "managed" | "station" | "sta" => Ok(Self::Station),
            "ap" | "__ap" => Ok(Self::Ap),
            "monitor" => Ok(Self::Monitor),
            "ibss" | "adhoc" => Ok(Self::Adhoc),
            "mesh" | "mp" => Ok(Self::MeshPoint),
            "wds" => Ok(Self::Wds),
            "p2p-client" => Ok(Self::P2pClient),
            "p2p-go" => Ok(Self::P2pGo),
            "ocb" => Ok(Self::Ocb),
            _ => Err(crate::netlink::Error::InvalidArgument(format!(
                "unknown interface type: {}",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::message::{NLM_F_ACK, NLM_F_DUMP};

    #[test]
    fn test_cmd_builds_commands() {
        let get = Cmd::GetInterface.request();
        assert_eq!(get.cmd, Cmd::GetInterface as u8);
        assert_eq!(get.name, "get_interface");
        assert_eq!(get.flags & NLM_F_ACK, NLM_F_ACK);

        let dump = Cmd::GetStation.dump();
        assert_eq!(dump.cmd, Cmd::GetStation as u8);
        assert_eq!(dump.flags & NLM_F_DUMP, NLM_F_DUMP);
        assert!(dump.ifindex.is_none());
    }

    #[test]
    fn test_cmd_roundtrip() {
        for cmd in [
            Cmd::GetWiphy,
            Cmd::NewInterface,
            Cmd::TriggerScan,
            Cmd::RadarDetect,
            Cmd::Vendor,
            Cmd::AbortScan,
        ] {
            assert_eq!(Cmd::from_u8(cmd as u8), cmd);
        }
    }

    #[test]
    fn test_unknown_ids_fall_back() {
        assert_eq!(Cmd::from_u8(250), Cmd::Unspec);
        assert_eq!(Iftype::from_u32(99), Iftype::Unspecified);
    }

    #[test]
    fn test_iftype_parse() {
        assert_eq!("managed".parse::<Iftype>().unwrap(), Iftype::Station);
        assert_eq!("AP".parse::<Iftype>().unwrap(), Iftype::Ap);
        assert!("bogus".parse::<Iftype>().is_err());
    }
}

//! Unsolicited nl80211 notifications.
//!
//! [`EVENT_TABLE`] maps each notification command to the [`EventKind`] a
//! listener subscribes to and the decoder for its payload. Dispatch reads
//! only the origin (device index, wiphy, name) before it knows whether any
//! listener wants the event; the payload is decoded afterwards.

use super::consts::{Cmd, Iftype, attr, radar};
use super::types::{ChannelSpec, MacAddr, wiphy_id};
use crate::netlink::{AttrTable, GenlMessage};

/// Kinds of notification a listener can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "output", derive(serde::Serialize))]
pub enum EventKind {
    WiphyNew,
    WiphyDel,
    InterfaceNew,
    InterfaceDel,
    InterfaceChanged,
    StationNew,
    StationDel,
    ScanStarted,
    ScanResults,
    ScanAborted,
    RegChange,
    Connect,
    Disconnect,
    ChannelSwitchStarted,
    ChannelSwitch,
    Radar,
    MgmtFrame,
    Vendor,
}

impl EventKind {
    /// Number of kinds; the size of a listener's callback table.
    pub const COUNT: usize = 18;

    pub const ALL: [EventKind; Self::COUNT] = [
        Self::WiphyNew,
        Self::WiphyDel,
        Self::InterfaceNew,
        Self::InterfaceDel,
        Self::InterfaceChanged,
        Self::StationNew,
        Self::StationDel,
        Self::ScanStarted,
        Self::ScanResults,
        Self::ScanAborted,
        Self::RegChange,
        Self::Connect,
        Self::Disconnect,
        Self::ChannelSwitchStarted,
        Self::ChannelSwitch,
        Self::Radar,
        Self::MgmtFrame,
        Self::Vendor,
    ];

    /// Slot of this kind in a listener's callback table.
    pub fn slot(self) -> usize {
        self as usize
    }
}

/// Radar detection progress reported with [`EventKind::Radar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "output", derive(serde::Serialize))]
pub enum RadarEvent {
    Detected,
    CacStarted,
    CacFinished,
    CacAborted,
    NopFinished,
    PreCacExpired,
    /// CAC started on the background radar chain.
    BackgroundCacStarted,
    Unknown(u32),
}

impl RadarEvent {
    fn from_attrs(event: u32, background: bool) -> Self {
        match event {
            radar::DETECTED => Self::Detected,
            radar::CAC_STARTED if background => Self::BackgroundCacStarted,
            radar::CAC_STARTED => Self::CacStarted,
            radar::CAC_FINISHED => Self::CacFinished,
            radar::CAC_ABORTED => Self::CacAborted,
            radar::NOP_FINISHED => Self::NopFinished,
            radar::PRE_CAC_EXPIRED => Self::PreCacExpired,
            other => Self::Unknown(other),
        }
    }
}

/// Where a notification came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "output", derive(serde::Serialize))]
pub struct EventOrigin {
    pub ifindex: Option<u32>,
    pub wiphy: Option<u32>,
    pub ifname: Option<String>,
}

impl EventOrigin {
    pub fn from_table(table: &AttrTable<'_>) -> Self {
        Self {
            ifindex: table.u32(attr::IFINDEX),
            wiphy: wiphy_id(table),
            ifname: table.string(attr::IFNAME).map(str::to_owned),
        }
    }
}

/// Decoded body of a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "output", derive(serde::Serialize))]
pub enum EventPayload {
    None,
    Interface {
        iftype: Iftype,
        mac: Option<MacAddr>,
    },
    Station {
        mac: Option<MacAddr>,
    },
    Scan {
        ssids: Vec<String>,
        freqs: Vec<u32>,
    },
    Regulatory {
        alpha2: Option<String>,
    },
    Connect {
        bssid: Option<MacAddr>,
        status: u16,
    },
    Disconnect {
        reason: u16,
        by_ap: bool,
    },
    ChannelSwitch {
        channel: Option<ChannelSpec>,
    },
    Radar {
        event: RadarEvent,
        channel: Option<ChannelSpec>,
    },
    Frame {
        freq: Option<u32>,
        data: Vec<u8>,
    },
    Vendor {
        vendor_id: u32,
        subcmd: u32,
        data: Vec<u8>,
    },
}

/// A decoded notification as handed to listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "output", derive(serde::Serialize))]
pub struct WifiEvent {
    pub kind: EventKind,
    /// Raw command id of the notification.
    pub cmd: u8,
    pub origin: EventOrigin,
    pub payload: EventPayload,
}

/// One row of the notification table.
pub struct EventEntry {
    pub cmd: Cmd,
    pub kind: EventKind,
    pub decode: fn(&AttrTable<'_>) -> EventPayload,
}

/// Notification command → kind and payload decoder.
pub static EVENT_TABLE: [EventEntry; 19] = [
    EventEntry { cmd: Cmd::NewWiphy, kind: EventKind::WiphyNew, decode: decode_none },
    EventEntry { cmd: Cmd::DelWiphy, kind: EventKind::WiphyDel, decode: decode_none },
    EventEntry { cmd: Cmd::NewInterface, kind: EventKind::InterfaceNew, decode: decode_interface },
    EventEntry { cmd: Cmd::DelInterface, kind: EventKind::InterfaceDel, decode: decode_interface },
    EventEntry { cmd: Cmd::SetInterface, kind: EventKind::InterfaceChanged, decode: decode_interface },
    EventEntry { cmd: Cmd::NewStation, kind: EventKind::StationNew, decode: decode_station },
    EventEntry { cmd: Cmd::DelStation, kind: EventKind::StationDel, decode: decode_station },
    EventEntry { cmd: Cmd::TriggerScan, kind: EventKind::ScanStarted, decode: decode_scan },
    EventEntry { cmd: Cmd::NewScanResults, kind: EventKind::ScanResults, decode: decode_scan },
    EventEntry { cmd: Cmd::ScanAborted, kind: EventKind::ScanAborted, decode: decode_scan },
    EventEntry { cmd: Cmd::RegChange, kind: EventKind::RegChange, decode: decode_reg },
    EventEntry { cmd: Cmd::WiphyRegChange, kind: EventKind::RegChange, decode: decode_reg },
    EventEntry { cmd: Cmd::Connect, kind: EventKind::Connect, decode: decode_connect },
    EventEntry { cmd: Cmd::Disconnect, kind: EventKind::Disconnect, decode: decode_disconnect },
    EventEntry {
        cmd: Cmd::ChSwitchStartedNotify,
        kind: EventKind::ChannelSwitchStarted,
        decode: decode_channel_switch,
    },
    EventEntry { cmd: Cmd::ChSwitchNotify, kind: EventKind::ChannelSwitch, decode: decode_channel_switch },
    EventEntry { cmd: Cmd::RadarDetect, kind: EventKind::Radar, decode: decode_radar },
    EventEntry { cmd: Cmd::Frame, kind: EventKind::MgmtFrame, decode: decode_frame },
    EventEntry { cmd: Cmd::Vendor, kind: EventKind::Vendor, decode: decode_vendor },
];

/// Table row for a notification command.
pub fn lookup(cmd: u8) -> Option<&'static EventEntry> {
    let cmd = Cmd::from_u8(cmd);
    if cmd == Cmd::Unspec {
        return None;
    }
    EVENT_TABLE.iter().find(|e| e.cmd == cmd)
}

/// Fully decode a notification; `None` for commands outside the table.
pub fn decode(msg: &GenlMessage<'_>) -> Option<WifiEvent> {
    let entry = lookup(msg.cmd())?;
    let table = msg.table();
    Some(WifiEvent {
        kind: entry.kind,
        cmd: msg.cmd(),
        origin: EventOrigin::from_table(&table),
        payload: (entry.decode)(&table),
    })
}

fn decode_none(_: &AttrTable<'_>) -> EventPayload {
    EventPayload::None
}

fn decode_interface(t: &AttrTable<'_>) -> EventPayload {
    EventPayload::Interface {
        iftype: t.u32(attr::IFTYPE).map_or(Iftype::Unspecified, Iftype::from_u32),
        mac: t.get(attr::MAC).and_then(MacAddr::from_slice),
    }
}

fn decode_station(t: &AttrTable<'_>) -> EventPayload {
    EventPayload::Station {
        mac: t.get(attr::MAC).and_then(MacAddr::from_slice),
    }
}

fn decode_scan(t: &AttrTable<'_>) -> EventPayload {
    let ssids = t
        .iter_nested(attr::SCAN_SSIDS)
        .map(|(_, ssid)| String::from_utf8_lossy(ssid).into_owned())
        .collect();
    let freqs = t
        .iter_nested(attr::SCAN_FREQUENCIES)
        .filter_map(|(_, f)| crate::netlink::attr::get::u32_ne(f).ok())
        .collect();
    EventPayload::Scan { ssids, freqs }
}

fn decode_reg(t: &AttrTable<'_>) -> EventPayload {
    EventPayload::Regulatory {
        alpha2: t.string(attr::REG_ALPHA2).map(str::to_owned),
    }
}

fn decode_connect(t: &AttrTable<'_>) -> EventPayload {
    EventPayload::Connect {
        bssid: t.get(attr::MAC).and_then(MacAddr::from_slice),
        status: t.u16(attr::STATUS_CODE).unwrap_or(0),
    }
}

fn decode_disconnect(t: &AttrTable<'_>) -> EventPayload {
    EventPayload::Disconnect {
        reason: t.u16(attr::REASON_CODE).unwrap_or(0),
        by_ap: t.flag(attr::DISCONNECTED_BY_AP),
    }
}

fn decode_channel_switch(t: &AttrTable<'_>) -> EventPayload {
    EventPayload::ChannelSwitch {
        channel: ChannelSpec::from_table(t),
    }
}

fn decode_radar(t: &AttrTable<'_>) -> EventPayload {
    let background = t.flag(attr::RADAR_BACKGROUND);
    EventPayload::Radar {
        event: RadarEvent::from_attrs(t.u32(attr::RADAR_EVENT).unwrap_or(radar::DETECTED), background),
        channel: ChannelSpec::from_table(t),
    }
}

fn decode_frame(t: &AttrTable<'_>) -> EventPayload {
    EventPayload::Frame {
        freq: t.u32(attr::WIPHY_FREQ),
        data: t.get(attr::FRAME).map(<[u8]>::to_vec).unwrap_or_default(),
    }
}

fn decode_vendor(t: &AttrTable<'_>) -> EventPayload {
    EventPayload::Vendor {
        vendor_id: t.u32(attr::VENDOR_ID).unwrap_or(0),
        subcmd: t.u32(attr::VENDOR_SUBCMD).unwrap_or(0),
        data: t.get(attr::VENDOR_DATA).map(<[u8]>::to_vec).unwrap_or_default(),
    }
}

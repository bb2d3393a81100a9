//! Scanning: trigger, abort and fetch results.
//!
//! A triggered scan completes asynchronously; subscribe to
//! [`EventKind::ScanResults`](super::EventKind::ScanResults) and
//! [`EventKind::ScanAborted`](super::EventKind::ScanAborted) to learn when.

use super::consts::{Cmd, attr, bss_attr, scan_flag};
use super::listener::ListenerRegistry;
use super::types::{MacAddr, freq_to_channel, ssid_from_ies};
use crate::netlink::{AttrNode, AttrTable, Error, NlState, Result, Transport};

/// Longest SSID allowed by 802.11.
const MAX_SSID_LEN: usize = 32;

/// What to scan for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    /// SSIDs to probe for; an empty entry is the wildcard. No entries
    /// means a passive scan.
    pub ssids: Vec<Vec<u8>>,
    /// Frequencies to visit; empty means all.
    pub freqs: Vec<u32>,
    /// Extra IEs appended to probe requests.
    pub ies: Option<Vec<u8>>,
    /// `NL80211_SCAN_FLAG_*` bits.
    pub flags: u32,
}

impl Default for ScanRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanRequest {
    /// Active wildcard scan on every channel.
    pub fn new() -> Self {
        Self {
            ssids: vec![Vec::new()],
            freqs: Vec::new(),
            ies: None,
            flags: 0,
        }
    }

    pub fn passive() -> Self {
        Self {
            ssids: Vec::new(),
            ..Self::new()
        }
    }

    /// Probe for a specific SSID in addition to any already listed.
    pub fn ssid(mut self, ssid: impl Into<Vec<u8>>) -> Self {
        self.ssids.push(ssid.into());
        self
    }

    pub fn freqs(mut self, freqs: impl IntoIterator<Item = u32>) -> Self {
        self.freqs.extend(freqs);
        self
    }

    pub fn ies(mut self, ies: Vec<u8>) -> Self {
        self.ies = Some(ies);
        self
    }

    /// Drop cached results before scanning.
    pub fn flush(mut self) -> Self {
        self.flags |= scan_flag::FLUSH;
        self
    }

    pub fn low_priority(mut self) -> Self {
        self.flags |= scan_flag::LOW_PRIORITY;
        self
    }

    fn validate(&self) -> Result<()> {
        if let Some(ssid) = self.ssids.iter().find(|s| s.len() > MAX_SSID_LEN) {
            return Err(Error::InvalidArgument(format!(
                "SSID longer than {} bytes ({})",
                MAX_SSID_LEN,
                ssid.len()
            )));
        }
        Ok(())
    }

    fn to_attrs(&self) -> Vec<AttrNode> {
        // Empty lists produce empty nests, which the encoder drops.
        let ssids = self
            .ssids
            .iter()
            .enumerate()
            .map(|(i, s)| AttrNode::raw(i as u16 + 1, s.clone()))
            .collect();
        let freqs = self
            .freqs
            .iter()
            .enumerate()
            .map(|(i, f)| AttrNode::u32(i as u16 + 1, *f))
            .collect();
        let mut nodes = vec![
            AttrNode::nested(attr::SCAN_SSIDS, ssids),
            AttrNode::nested(attr::SCAN_FREQUENCIES, freqs),
        ];
        if let Some(ies) = &self.ies {
            nodes.push(AttrNode::raw(attr::IE, ies.clone()));
        }
        if self.flags != 0 {
            nodes.push(AttrNode::u32(attr::SCAN_FLAGS, self.flags));
        }
        nodes
    }
}

/// One scan result.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "output", derive(serde::Serialize))]
pub struct Bss {
    pub bssid: MacAddr,
    pub freq: u32,
    pub channel: u32,
    /// Signal strength in mBm.
    pub signal_mbm: Option<i32>,
    pub tsf: Option<u64>,
    pub beacon_interval: Option<u16>,
    pub capability: Option<u16>,
    pub ssid: Option<String>,
    pub ies: Vec<u8>,
    /// Association status (`NL80211_BSS_STATUS_*`), if any.
    pub status: Option<u32>,
    pub seen_ms_ago: Option<u32>,
}

impl Bss {
    pub fn parse(table: &AttrTable<'_>) -> Option<Self> {
        let bss = table.nested(attr::BSS)?;
        let bssid = bss.get(bss_attr::BSSID).and_then(MacAddr::from_slice)?;
        let freq = bss.u32(bss_attr::FREQUENCY).unwrap_or(0);
        let ies = bss
            .get(bss_attr::INFORMATION_ELEMENTS)
            .map(<[u8]>::to_vec)
            .unwrap_or_default();
        Some(Self {
            bssid,
            freq,
            channel: freq_to_channel(freq),
            signal_mbm: bss.i32(bss_attr::SIGNAL_MBM),
            tsf: bss.u64(bss_attr::TSF),
            beacon_interval: bss.u16(bss_attr::BEACON_INTERVAL),
            capability: bss.u16(bss_attr::CAPABILITY),
            ssid: ssid_from_ies(&ies),
            ies,
            status: bss.u32(bss_attr::STATUS),
            seen_ms_ago: bss.u32(bss_attr::SEEN_MS_AGO),
        })
    }

    /// Signal strength in dBm.
    pub fn signal_dbm(&self) -> Option<f64> {
        self.signal_mbm.map(|mbm| f64::from(mbm) / 100.0)
    }
}

impl<T: Transport> NlState<T, ListenerRegistry> {
    /// Start a scan. Completion is reported by notification.
    pub async fn trigger_scan(&mut self, ifindex: u32, request: &ScanRequest) -> Result<()> {
        request.validate()?;
        let command = Cmd::TriggerScan
            .request()
            .ifindex(ifindex)
            .attrs(request.to_attrs());
        self.request(command).await?;
        tracing::debug!(ifindex, ssids = request.ssids.len(), "scan triggered");
        Ok(())
    }

    pub async fn abort_scan(&mut self, ifindex: u32) -> Result<()> {
        self.request(Cmd::AbortScan.request().ifindex(ifindex))
            .await?;
        Ok(())
    }

    /// Results cached by the kernel for an interface.
    pub async fn get_scan_results(&mut self, ifindex: u32) -> Result<Vec<Bss>> {
        let replies = self.request(Cmd::GetScan.dump().ifindex(ifindex)).await?;
        Ok(replies
            .iter()
            .filter_map(|r| Bss::parse(&r.table()))
            .collect())
    }
}

//! Associated station statistics.

use super::consts::{Cmd, attr, rate_info, sta_info};
use super::listener::ListenerRegistry;
use super::types::{ChannelWidth, MacAddr};
use crate::netlink::{AttrNode, AttrTable, Error, Mode, NlState, Reply, Result, Transport, Verdict};

/// Transmit or receive rate of a station.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "output", derive(serde::Serialize))]
pub struct RateInfo {
    /// Bitrate in units of 100 kbit/s.
    pub bitrate: u32,
    pub mcs: Option<u8>,
    pub nss: Option<u8>,
    pub width: ChannelWidth,
    pub short_gi: bool,
}

impl RateInfo {
    pub fn parse(table: &AttrTable<'_>) -> Self {
        let bitrate = table
            .u32(rate_info::BITRATE32)
            .or_else(|| table.u16(rate_info::BITRATE).map(u32::from))
            .unwrap_or(0);
        let mcs = table
            .u8(rate_info::EHT_MCS)
            .or_else(|| table.u8(rate_info::HE_MCS))
            .or_else(|| table.u8(rate_info::VHT_MCS))
            .or_else(|| table.u8(rate_info::MCS));
        let nss = table
            .u8(rate_info::EHT_NSS)
            .or_else(|| table.u8(rate_info::HE_NSS))
            .or_else(|| table.u8(rate_info::VHT_NSS));
        let width = if table.flag(rate_info::WIDTH_320) {
            ChannelWidth::Mhz320
        } else if table.flag(rate_info::WIDTH_160) {
            ChannelWidth::Mhz160
        } else if table.flag(rate_info::WIDTH_80P80) {
            ChannelWidth::Mhz80P80
        } else if table.flag(rate_info::WIDTH_80) {
            ChannelWidth::Mhz80
        } else if table.flag(rate_info::WIDTH_40) {
            ChannelWidth::Mhz40
        } else {
            ChannelWidth::Mhz20
        };
        Self {
            bitrate,
            mcs,
            nss,
            width,
            short_gi: table.flag(rate_info::SHORT_GI),
        }
    }

    /// Bitrate in Mbit/s.
    pub fn mbps(&self) -> f64 {
        f64::from(self.bitrate) / 10.0
    }
}

/// One associated station.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "output", derive(serde::Serialize))]
pub struct Station {
    pub mac: MacAddr,
    pub ifindex: u32,
    pub inactive_ms: Option<u32>,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_packets: u32,
    pub tx_packets: u32,
    pub tx_retries: u32,
    pub tx_failed: u32,
    pub signal_dbm: Option<i8>,
    pub signal_avg_dbm: Option<i8>,
    pub tx_bitrate: Option<RateInfo>,
    pub rx_bitrate: Option<RateInfo>,
    pub connected_secs: Option<u32>,
}

impl Station {
    /// Parse a `NEW_STATION` reply. `None` without a MAC address.
    pub fn parse(table: &AttrTable<'_>) -> Option<Self> {
        let mac = table.get(attr::MAC).and_then(MacAddr::from_slice)?;
        let info = table.nested(attr::STA_INFO).unwrap_or_default();
        let mut station = Self {
            mac,
            ifindex: table.u32(attr::IFINDEX).unwrap_or(0),
            inactive_ms: info.u32(sta_info::INACTIVE_TIME),
            rx_bytes: 0,
            tx_bytes: 0,
            rx_packets: 0,
            tx_packets: 0,
            tx_retries: 0,
            tx_failed: 0,
            signal_dbm: info.i8(sta_info::SIGNAL),
            signal_avg_dbm: info.i8(sta_info::SIGNAL_AVG),
            tx_bitrate: info.nested(sta_info::TX_BITRATE).map(|t| RateInfo::parse(&t)),
            rx_bitrate: info.nested(sta_info::RX_BITRATE).map(|t| RateInfo::parse(&t)),
            connected_secs: info.u32(sta_info::CONNECTED_TIME),
        };
        // 64-bit counters are preferred; the 32-bit ones wrap.
        station.rx_bytes = info
            .u64(sta_info::RX_BYTES64)
            .or_else(|| info.u32(sta_info::RX_BYTES).map(u64::from))
            .unwrap_or(0);
        station.tx_bytes = info
            .u64(sta_info::TX_BYTES64)
            .or_else(|| info.u32(sta_info::TX_BYTES).map(u64::from))
            .unwrap_or(0);
        info.fill_u32(sta_info::RX_PACKETS, &mut station.rx_packets);
        info.fill_u32(sta_info::TX_PACKETS, &mut station.tx_packets);
        info.fill_u32(sta_info::TX_RETRIES, &mut station.tx_retries);
        info.fill_u32(sta_info::TX_FAILED, &mut station.tx_failed);
        Some(station)
    }
}

impl<T: Transport> NlState<T, ListenerRegistry> {
    /// Statistics for one station. `mac` is required.
    pub async fn get_station(&mut self, ifindex: u32, mac: Option<MacAddr>) -> Result<Station> {
        let mac = mac.ok_or_else(|| Error::InvalidArgument("station address required".into()))?;
        let command = Cmd::GetStation
            .request()
            .ifindex(ifindex)
            .attr(AttrNode::raw(attr::MAC, mac.octets()));
        let not_found = || Error::StationNotFound {
            mac: mac.to_string(),
            ifindex,
        };
        let replies = match self.request(command).await {
            Ok(replies) => replies,
            Err(e) if e.errno() == Some(libc::ENOENT) => return Err(not_found()),
            Err(e) => return Err(e),
        };
        replies
            .iter()
            .find_map(|r| Station::parse(&r.table()))
            .ok_or_else(not_found)
    }

    /// Every station associated to an interface.
    pub async fn get_stations(&mut self, ifindex: u32) -> Result<Vec<Station>> {
        let replies = self.request(Cmd::GetStation.dump().ifindex(ifindex)).await?;
        Ok(replies
            .iter()
            .filter_map(|r| Station::parse(&r.table()))
            .collect())
    }

    /// Dump stations without waiting; `on_station` runs from the read loop
    /// for each one and `on_done` once with the final outcome.
    ///
    /// Returns the request's sequence number.
    pub async fn get_stations_async<F, D>(
        &mut self,
        ifindex: u32,
        mut on_station: F,
        on_done: D,
    ) -> Result<u32>
    where
        F: FnMut(Station) + Send + 'static,
        D: FnOnce(Result<()>) + Send + 'static,
    {
        let mut on_done = Some(on_done);
        let command = Cmd::GetStation.dump().ifindex(ifindex);
        self.send_command(Mode::Async, command, move |reply| {
            match reply {
                Reply::Message(msg) => {
                    if let Some(station) = Station::parse(&msg.table()) {
                        on_station(station);
                    }
                }
                Reply::Done => {
                    if let Some(done) = on_done.take() {
                        done(Ok(()));
                    }
                }
                Reply::Failed { seq, completion } => {
                    if let Some(done) = on_done.take() {
                        done(completion.clone().into_result(Cmd::GetStation.name(), seq));
                    }
                }
            }
            Verdict::Continue
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::fixtures::{MockTransport, done_frame, error_frame, multi_frame, nodes_frame};
    use crate::nl80211::testing::{attrs, last, state};
    use std::sync::{Arc, Mutex};

    fn station_nodes(last_octet: u8) -> Vec<AttrNode> {
        vec![
            AttrNode::u32(attr::IFINDEX, 3),
            AttrNode::raw(attr::MAC, vec![2, 0, 0, 0, 0, last_octet]),
            AttrNode::nested(
                attr::STA_INFO,
                vec![
                    AttrNode::u32(sta_info::INACTIVE_TIME, 120),
                    AttrNode::u32(sta_info::RX_BYTES, 7),
                    AttrNode::u64(sta_info::RX_BYTES64, 5_000_000_000),
                    AttrNode::u32(sta_info::TX_BYTES, 99),
                    AttrNode::u32(sta_info::TX_PACKETS, 12),
                    AttrNode::u8(sta_info::SIGNAL, (-48i8) as u8),
                    AttrNode::nested(
                        sta_info::TX_BITRATE,
                        vec![
                            AttrNode::u32(rate_info::BITRATE32, 8667),
                            AttrNode::u8(rate_info::VHT_MCS, 9),
                            AttrNode::u8(rate_info::VHT_NSS, 2),
                            AttrNode::flag(rate_info::WIDTH_80),
                            AttrNode::flag(rate_info::SHORT_GI),
                        ],
                    ),
                ],
            ),
        ]
    }

    #[tokio::test]
    async fn test_get_station_requires_address() {
        let mock = MockTransport::new();
        let mut state = state(&mock).await;
        let err = state.get_station(3, None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(mock.sent_commands().is_empty());
    }

    #[tokio::test]
    async fn test_get_station() {
        let mock = MockTransport::with_responder(|sent| {
            vec![nodes_frame(0, sent.seq, Cmd::NewStation as u8, &station_nodes(5))]
        });
        let mut state = state(&mock).await;
        let mac: MacAddr = "02:00:00:00:00:05".parse().unwrap();
        let sta = state.get_station(3, Some(mac)).await.unwrap();
        assert_eq!(sta.mac, mac);
        assert_eq!(sta.rx_bytes, 5_000_000_000);
        assert_eq!(sta.tx_bytes, 99);
        assert_eq!(sta.tx_packets, 12);
        assert_eq!(sta.signal_dbm, Some(-48));
        let rate = sta.tx_bitrate.unwrap();
        assert_eq!(rate.bitrate, 8667);
        assert_eq!(rate.mcs, Some(9));
        assert_eq!(rate.nss, Some(2));
        assert_eq!(rate.width, ChannelWidth::Mhz80);
        assert!(rate.short_gi);
        assert_eq!(sta.rx_bitrate, None);

        let sent = last(&mock);
        assert_eq!(attrs(&sent).get(attr::MAC), Some(&mac.0[..]));
        assert_eq!(attrs(&sent).u32(attr::IFINDEX), Some(3));
    }

    #[tokio::test]
    async fn test_get_station_not_found() {
        let mock = MockTransport::with_responder(|sent| vec![error_frame(sent.seq, -libc::ENOENT)]);
        let mut state = state(&mock).await;
        let err = state
            .get_station(3, Some(MacAddr([2, 0, 0, 0, 0, 1])))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::StationNotFound { ifindex: 3, .. }));
    }

    #[tokio::test]
    async fn test_get_stations_async() {
        let mock = MockTransport::with_responder(|sent| {
            vec![
                multi_frame(sent.seq, Cmd::NewStation as u8, &station_nodes(1)),
                multi_frame(sent.seq, Cmd::NewStation as u8, &station_nodes(2)),
                done_frame(sent.seq),
            ]
        });
        let mut state = state(&mock).await;
        let seen = Arc::new(Mutex::new(Vec::new()));
        let done = Arc::new(Mutex::new(None));
        let (seen_sink, done_sink) = (Arc::clone(&seen), Arc::clone(&done));
        let seq = state
            .get_stations_async(
                3,
                move |sta| seen_sink.lock().unwrap().push(sta.mac.0[5]),
                move |result| *done_sink.lock().unwrap() = Some(result.is_ok()),
            )
            .await
            .unwrap();
        while state.is_pending(seq) {
            state.dispatch_once().await.unwrap();
        }
        assert_eq!(*seen.lock().unwrap(), [1, 2]);
        assert_eq!(*done.lock().unwrap(), Some(true));
    }

    #[tokio::test]
    async fn test_get_stations_async_expiry_names_request() {
        let mock = MockTransport::new();
        let mut state = state(&mock).await;
        let done = Arc::new(Mutex::new(None));
        let done_sink = Arc::clone(&done);
        let seq = state
            .get_stations_async(3, |_| {}, move |result| {
                *done_sink.lock().unwrap() = Some(result);
            })
            .await
            .unwrap();

        let later = std::time::Instant::now() + std::time::Duration::from_secs(60);
        assert_eq!(state.expire_requests(later), 1);
        let result = done.lock().unwrap().take().unwrap();
        match result {
            Err(Error::Expired { command, seq: expired }) => {
                assert_eq!(command, "get_station");
                assert_eq!(expired, seq);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_stations_dump() {
        let mock = MockTransport::with_responder(|sent| {
            vec![
                multi_frame(sent.seq, Cmd::NewStation as u8, &station_nodes(1)),
                done_frame(sent.seq),
            ]
        });
        let mut state = state(&mock).await;
        let stations = state.get_stations(3).await.unwrap();
        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].inactive_ms, Some(120));
    }
}

//! Radio-wide settings: transmit power, antennas, regulatory domain and
//! background radar detection.

use super::consts::{Cmd, attr, reg_rule};
use super::listener::ListenerRegistry;
use super::types::{ChannelSpec, TxPowerSetting};
use crate::netlink::{AttrNode, AttrTable, Error, NlState, Result, Transport};

/// One regulatory rule. Frequencies are in kHz, power in mBm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "output", derive(serde::Serialize))]
pub struct RegRule {
    pub start_khz: u32,
    pub end_khz: u32,
    pub max_bandwidth_khz: u32,
    pub max_antenna_gain: u32,
    pub max_eirp_mbm: u32,
    pub flags: u32,
    pub dfs_cac_ms: Option<u32>,
}

impl RegRule {
    fn parse(table: &AttrTable<'_>) -> Self {
        let mut rule = Self {
            dfs_cac_ms: table.u32(reg_rule::DFS_CAC_TIME),
            ..Default::default()
        };
        table.fill_u32(reg_rule::FREQ_RANGE_START, &mut rule.start_khz);
        table.fill_u32(reg_rule::FREQ_RANGE_END, &mut rule.end_khz);
        table.fill_u32(reg_rule::FREQ_RANGE_MAX_BW, &mut rule.max_bandwidth_khz);
        table.fill_u32(reg_rule::POWER_RULE_MAX_ANT_GAIN, &mut rule.max_antenna_gain);
        table.fill_u32(reg_rule::POWER_RULE_MAX_EIRP, &mut rule.max_eirp_mbm);
        table.fill_u32(reg_rule::FLAGS, &mut rule.flags);
        rule
    }
}

/// A regulatory domain as reported by `GET_REG`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "output", derive(serde::Serialize))]
pub struct RegDomain {
    /// ISO 3166 alpha2, or "00" for the world domain.
    pub alpha2: String,
    /// Wiphy with a self-managed domain; `None` for the global one.
    pub wiphy: Option<u32>,
    pub rules: Vec<RegRule>,
}

impl RegDomain {
    pub fn parse(table: &AttrTable<'_>) -> Option<Self> {
        let alpha2 = table.string(attr::REG_ALPHA2)?.to_owned();
        let rules = table
            .iter_nested(attr::REG_RULES)
            .map(|(_, rule)| RegRule::parse(&AttrTable::parse(rule)))
            .collect();
        Some(Self {
            alpha2,
            wiphy: table.u32(attr::WIPHY),
            rules,
        })
    }
}

fn validate_alpha2(alpha2: &str) -> Result<()> {
    let ok = alpha2 == "00"
        || (alpha2.len() == 2 && alpha2.bytes().all(|b| b.is_ascii_uppercase()));
    if ok {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!(
            "regulatory domain must be two upper-case letters or \"00\": {:?}",
            alpha2
        )))
    }
}

impl<T: Transport> NlState<T, ListenerRegistry> {
    /// Set a wiphy's transmit power.
    pub async fn set_tx_power(&mut self, wiphy: u32, setting: TxPowerSetting) -> Result<()> {
        let command = Cmd::SetWiphy
            .request()
            .attr(AttrNode::u32(attr::WIPHY, wiphy))
            .attrs(setting.to_attrs());
        self.request(command).await?;
        tracing::debug!(wiphy, ?setting, "tx power set");
        Ok(())
    }

    /// Current transmit power of an interface (mBm), if the driver reports it.
    pub async fn get_tx_power(&mut self, ifindex: u32) -> Result<Option<u32>> {
        Ok(self.get_interface(ifindex).await?.tx_power_mbm)
    }

    /// Set the TX and RX antenna bitmasks of a wiphy.
    pub async fn set_antenna(&mut self, wiphy: u32, tx_mask: u32, rx_mask: u32) -> Result<()> {
        if tx_mask == 0 || rx_mask == 0 {
            return Err(Error::InvalidArgument(
                "antenna masks must select at least one antenna".into(),
            ));
        }
        let command = Cmd::SetWiphy.request().attrs([
            AttrNode::u32(attr::WIPHY, wiphy),
            AttrNode::u32(attr::WIPHY_ANTENNA_TX, tx_mask),
            AttrNode::u32(attr::WIPHY_ANTENNA_RX, rx_mask),
        ]);
        self.request(command).await?;
        Ok(())
    }

    /// Ask the kernel to switch regulatory domain.
    ///
    /// The change is applied asynchronously and announced with
    /// [`EventKind::RegChange`](super::EventKind::RegChange).
    pub async fn set_reg_domain(&mut self, alpha2: &str) -> Result<()> {
        validate_alpha2(alpha2)?;
        let command = Cmd::ReqSetReg
            .request()
            .attr(AttrNode::string(attr::REG_ALPHA2, alpha2));
        self.request(command).await?;
        Ok(())
    }

    /// Current regulatory domain, global or for one self-managed wiphy.
    pub async fn get_reg_domain(&mut self, wiphy: Option<u32>) -> Result<RegDomain> {
        let mut command = Cmd::GetReg.request();
        if let Some(wiphy) = wiphy {
            command = command.attr(AttrNode::u32(attr::WIPHY, wiphy));
        }
        let replies = self.request(command).await?;
        replies
            .iter()
            .find_map(|r| RegDomain::parse(&r.table()))
            .ok_or_else(|| Error::InvalidMessage("get_reg: no regulatory domain in reply".into()))
    }

    /// Start CAC on the background radar chain for `channel`.
    pub async fn start_background_radar(&mut self, ifindex: u32, channel: &ChannelSpec) -> Result<()> {
        let command = Cmd::RadarDetect
            .request()
            .ifindex(ifindex)
            .attrs(channel.to_attrs())
            .attr(AttrNode::flag(attr::RADAR_BACKGROUND));
        self.request(command).await?;
        tracing::debug!(ifindex, freq = channel.freq, "background radar started");
        Ok(())
    }

    /// Stop background radar detection.
    pub async fn stop_background_radar(&mut self, ifindex: u32) -> Result<()> {
        let command = Cmd::RadarDetect.request().ifindex(ifindex).attrs([
            AttrNode::u32(attr::WIPHY_FREQ, 0),
            AttrNode::flag(attr::RADAR_BACKGROUND),
        ]);
        self.request(command).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::fixtures::{MockTransport, ack_frame, nodes_frame};
    use crate::nl80211::consts::tx_power;
    use crate::nl80211::testing::{attrs, last, state};
    use crate::nl80211::types::ChannelWidth;

    fn acking() -> MockTransport {
        MockTransport::with_responder(|sent| vec![ack_frame(sent.seq)])
    }

    #[tokio::test]
    async fn test_set_tx_power() {
        let mock = acking();
        let mut state = state(&mock).await;
        state.set_tx_power(1, TxPowerSetting::Fixed(1500)).await.unwrap();
        let sent = last(&mock);
        let table = attrs(&sent);
        assert_eq!(table.u32(attr::WIPHY), Some(1));
        assert_eq!(table.u32(attr::WIPHY_TX_POWER_SETTING), Some(tx_power::FIXED));
        assert_eq!(table.u32(attr::WIPHY_TX_POWER_LEVEL), Some(1500));

        state.set_tx_power(1, TxPowerSetting::Automatic).await.unwrap();
        assert!(!attrs(&last(&mock)).has(attr::WIPHY_TX_POWER_LEVEL));
    }

    #[tokio::test]
    async fn test_set_antenna() {
        let mock = acking();
        let mut state = state(&mock).await;
        assert!(state.set_antenna(0, 0, 3).await.is_err());
        assert!(mock.sent_commands().is_empty());
        state.set_antenna(0, 0b11, 0b01).await.unwrap();
        let sent = last(&mock);
        assert_eq!(attrs(&sent).u32(attr::WIPHY_ANTENNA_TX), Some(3));
        assert_eq!(attrs(&sent).u32(attr::WIPHY_ANTENNA_RX), Some(1));
    }

    #[tokio::test]
    async fn test_reg_domain() {
        let mock = MockTransport::with_responder(|sent| {
            if sent.cmd == Cmd::GetReg as u8 {
                vec![nodes_frame(
                    0,
                    sent.seq,
                    Cmd::GetReg as u8,
                    &[
                        AttrNode::string(attr::REG_ALPHA2, "DE"),
                        AttrNode::nested(
                            attr::REG_RULES,
                            vec![AttrNode::nested(
                                1,
                                vec![
                                    AttrNode::u32(reg_rule::FREQ_RANGE_START, 5_170_000),
                                    AttrNode::u32(reg_rule::FREQ_RANGE_END, 5_250_000),
                                    AttrNode::u32(reg_rule::FREQ_RANGE_MAX_BW, 80_000),
                                    AttrNode::u32(reg_rule::POWER_RULE_MAX_EIRP, 2000),
                                ],
                            )],
                        ),
                    ],
                )]
            } else {
                vec![ack_frame(sent.seq)]
            }
        });
        let mut state = state(&mock).await;
        assert!(state.set_reg_domain("de").await.is_err());
        state.set_reg_domain("DE").await.unwrap();
        assert_eq!(attrs(&last(&mock)).string(attr::REG_ALPHA2), Some("DE"));
        state.set_reg_domain("00").await.unwrap();

        let reg = state.get_reg_domain(None).await.unwrap();
        assert_eq!(reg.alpha2, "DE");
        assert_eq!(reg.wiphy, None);
        assert_eq!(reg.rules.len(), 1);
        assert_eq!(reg.rules[0].max_bandwidth_khz, 80_000);
        assert_eq!(reg.rules[0].max_eirp_mbm, 2000);
    }

    #[tokio::test]
    async fn test_background_radar() {
        let mock = acking();
        let mut state = state(&mock).await;
        let channel = ChannelSpec::new(5500).width(ChannelWidth::Mhz80).center_freq1(5530);
        state.start_background_radar(3, &channel).await.unwrap();
        let sent = last(&mock);
        assert_eq!(sent.cmd, Cmd::RadarDetect as u8);
        let table = attrs(&sent);
        assert!(table.flag(attr::RADAR_BACKGROUND));
        assert_eq!(table.u32(attr::WIPHY_FREQ), Some(5500));
        assert_eq!(table.u32(attr::CENTER_FREQ1), Some(5530));

        state.stop_background_radar(3).await.unwrap();
        let table_sent = last(&mock);
        let table = attrs(&table_sent);
        assert!(table.flag(attr::RADAR_BACKGROUND));
        assert_eq!(table.u32(attr::WIPHY_FREQ), Some(0));
    }
}

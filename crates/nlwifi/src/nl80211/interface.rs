//! Virtual interface management.

use super::consts::{Cmd, Iftype, attr};
use super::listener::ListenerRegistry;
use super::types::{ChannelSpec, MacAddr};
use crate::netlink::{AttrNode, AttrTable, Error, NlState, Result, Transport};

/// Linux `IFNAMSIZ` minus the terminator.
const MAX_IFNAME_LEN: usize = 15;

/// An nl80211 interface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "output", derive(serde::Serialize))]
pub struct Interface {
    pub ifindex: u32,
    pub name: String,
    pub wiphy: u32,
    pub wdev: Option<u64>,
    pub iftype: Iftype,
    pub mac: Option<MacAddr>,
    pub ssid: Option<String>,
    /// Operating channel, when the interface is up on one.
    pub channel: Option<ChannelSpec>,
    /// Current transmit power (mBm).
    pub tx_power_mbm: Option<u32>,
    pub four_addr: bool,
}

impl Interface {
    /// Parse a `NEW_INTERFACE` reply. `None` without an interface index.
    pub fn parse(table: &AttrTable<'_>) -> Option<Self> {
        let mut iface = Self {
            ifindex: table.u32(attr::IFINDEX)?,
            wdev: table.u64(attr::WDEV),
            mac: table.get(attr::MAC).and_then(MacAddr::from_slice),
            ssid: table
                .get(attr::SSID)
                .map(|s| String::from_utf8_lossy(s).into_owned()),
            channel: ChannelSpec::from_table(table),
            tx_power_mbm: table.u32(attr::WIPHY_TX_POWER_LEVEL),
            four_addr: table.u8(attr::FOUR_ADDR).is_some_and(|v| v != 0),
            ..Default::default()
        };
        table.fill_string(attr::IFNAME, &mut iface.name);
        table.fill_u32(attr::WIPHY, &mut iface.wiphy);
        if let Some(t) = table.u32(attr::IFTYPE) {
            iface.iftype = Iftype::from_u32(t);
        }
        Some(iface)
    }
}

/// Parameters for [`NlState::create_interface`].
#[derive(Debug, Clone)]
pub struct NewInterface {
    pub wiphy: u32,
    pub name: String,
    pub iftype: Iftype,
    pub mac: Option<MacAddr>,
    pub four_addr: bool,
}

impl NewInterface {
    pub fn new(wiphy: u32, name: impl Into<String>, iftype: Iftype) -> Self {
        Self {
            wiphy,
            name: name.into(),
            iftype,
            mac: None,
            four_addr: false,
        }
    }

    pub fn mac(mut self, mac: MacAddr) -> Self {
        self.mac = Some(mac);
        self
    }

    pub fn four_addr(mut self, enabled: bool) -> Self {
        self.four_addr = enabled;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() || self.name.len() > MAX_IFNAME_LEN {
            return Err(Error::InvalidArgument(format!(
                "interface name must be 1-{} bytes: {:?}",
                MAX_IFNAME_LEN, self.name
            )));
        }
        if self.iftype == Iftype::Unspecified {
            return Err(Error::InvalidArgument("interface type required".into()));
        }
        Ok(())
    }

    fn to_attrs(&self) -> Vec<AttrNode> {
        let mut nodes = vec![
            AttrNode::u32(attr::WIPHY, self.wiphy),
            AttrNode::string(attr::IFNAME, &self.name),
            AttrNode::u32(attr::IFTYPE, self.iftype as u32),
        ];
        if let Some(mac) = self.mac {
            nodes.push(AttrNode::raw(attr::MAC, mac.octets()));
        }
        if self.four_addr {
            nodes.push(AttrNode::u8(attr::FOUR_ADDR, 1));
        }
        nodes
    }
}

impl<T: Transport> NlState<T, ListenerRegistry> {
    /// Every nl80211 interface.
    pub async fn get_interfaces(&mut self) -> Result<Vec<Interface>> {
        let replies = self.request(Cmd::GetInterface.dump()).await?;
        Ok(replies
            .iter()
            .filter_map(|r| Interface::parse(&r.table()))
            .collect())
    }

    /// One interface by index.
    pub async fn get_interface(&mut self, ifindex: u32) -> Result<Interface> {
        let replies = self
            .request(Cmd::GetInterface.request().ifindex(ifindex))
            .await
            .map_err(|e| not_found(e, ifindex))?;
        replies
            .iter()
            .find_map(|r| Interface::parse(&r.table()))
            .ok_or(Error::InterfaceNotFound { ifindex })
    }

    /// Interfaces bound to one wiphy.
    pub async fn get_interfaces_for_wiphy(&mut self, wiphy: u32) -> Result<Vec<Interface>> {
        let command = Cmd::GetInterface
            .dump()
            .attr(AttrNode::u32(attr::WIPHY, wiphy));
        let replies = self.request(command).await?;
        Ok(replies
            .iter()
            .filter_map(|r| Interface::parse(&r.table()))
            .filter(|i| i.wiphy == wiphy)
            .collect())
    }

    /// Create a virtual interface and return it as the kernel reports it.
    pub async fn create_interface(&mut self, params: &NewInterface) -> Result<Interface> {
        params.validate()?;
        let command = Cmd::NewInterface.request().attrs(params.to_attrs());
        let replies = self.request(command).await?;
        let iface = replies
            .iter()
            .find_map(|r| Interface::parse(&r.table()))
            .ok_or_else(|| Error::InvalidMessage("new_interface: no interface in reply".into()))?;
        tracing::debug!(ifindex = iface.ifindex, name = %iface.name, "interface created");
        Ok(iface)
    }

    pub async fn delete_interface(&mut self, ifindex: u32) -> Result<()> {
        self.request(Cmd::DelInterface.request().ifindex(ifindex))
            .await
            .map_err(|e| not_found(e, ifindex))?;
        Ok(())
    }

    pub async fn set_interface_type(&mut self, ifindex: u32, iftype: Iftype) -> Result<()> {
        if iftype == Iftype::Unspecified {
            return Err(Error::InvalidArgument("interface type required".into()));
        }
        let command = Cmd::SetInterface
            .request()
            .ifindex(ifindex)
            .attr(AttrNode::u32(attr::IFTYPE, iftype as u32));
        self.request(command)
            .await
            .map_err(|e| not_found(e, ifindex))?;
        Ok(())
    }
}

fn not_found(e: Error, ifindex: u32) -> Error {
    if e.errno() == Some(libc::ENODEV) {
        Error::InterfaceNotFound { ifindex }
    } else {
        e
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::fixtures::{MockTransport, ack_frame, done_frame, error_frame, multi_frame, nodes_frame};
    use crate::nl80211::testing::{attrs, last, state};

    fn iface_nodes(ifindex: u32, name: &str, wiphy: u32) -> Vec<AttrNode> {
        vec![
            AttrNode::u32(attr::IFINDEX, ifindex),
            AttrNode::string(attr::IFNAME, name),
            AttrNode::u32(attr::WIPHY, wiphy),
            AttrNode::u32(attr::IFTYPE, Iftype::Ap as u32),
            AttrNode::raw(attr::MAC, vec![2, 0, 0, 0, 0, ifindex as u8]),
            AttrNode::u32(attr::WIPHY_FREQ, 5180),
            AttrNode::u32(attr::WIPHY_TX_POWER_LEVEL, 2000),
        ]
    }

    #[tokio::test]
    async fn test_get_interfaces() {
        let mock = MockTransport::with_responder(|sent| {
            vec![
                multi_frame(sent.seq, Cmd::NewInterface as u8, &iface_nodes(3, "wlan0", 0)),
                multi_frame(sent.seq, Cmd::NewInterface as u8, &iface_nodes(4, "wlan1", 1)),
                done_frame(sent.seq),
            ]
        });
        let mut state = state(&mock).await;
        let ifaces = state.get_interfaces().await.unwrap();
        assert_eq!(ifaces.len(), 2);
        assert_eq!(ifaces[0].name, "wlan0");
        assert_eq!(ifaces[0].iftype, Iftype::Ap);
        assert_eq!(ifaces[0].channel.unwrap().freq, 5180);
        assert_eq!(ifaces[1].mac.unwrap().to_string(), "02:00:00:00:00:04");
        assert_eq!(ifaces[1].tx_power_mbm, Some(2000));

        let only_wiphy1 = state.get_interfaces_for_wiphy(1).await.unwrap();
        assert_eq!(only_wiphy1.len(), 1);
        assert_eq!(attrs(&last(&mock)).u32(attr::WIPHY), Some(1));
    }

    #[tokio::test]
    async fn test_get_interface_not_found() {
        let mock = MockTransport::with_responder(|sent| vec![error_frame(sent.seq, -libc::ENODEV)]);
        let mut state = state(&mock).await;
        let err = state.get_interface(42).await.unwrap_err();
        assert!(matches!(err, Error::InterfaceNotFound { ifindex: 42 }));
    }

    #[tokio::test]
    async fn test_get_interface_single_reply() {
        let mock = MockTransport::with_responder(|sent| {
            vec![
                nodes_frame(0, sent.seq, Cmd::NewInterface as u8, &iface_nodes(3, "wlan0", 0)),
                ack_frame(sent.seq),
            ]
        });
        let mut state = state(&mock).await;
        let iface = state.get_interface(3).await.unwrap();
        assert_eq!(iface.name, "wlan0");
        assert_eq!(attrs(&last(&mock)).u32(attr::IFINDEX), Some(3));
    }

    #[tokio::test]
    async fn test_create_interface() {
        let mock = MockTransport::with_responder(|sent| {
            vec![nodes_frame(0, sent.seq, Cmd::NewInterface as u8, &iface_nodes(9, "ap0", 1))]
        });
        let mut state = state(&mock).await;
        let params = NewInterface::new(1, "ap0", Iftype::Ap).mac("02:00:00:00:00:09".parse().unwrap());
        let iface = state.create_interface(&params).await.unwrap();
        assert_eq!(iface.ifindex, 9);

        let sent = last(&mock);
        assert_eq!(sent.cmd, Cmd::NewInterface as u8);
        let table = attrs(&sent);
        assert_eq!(table.string(attr::IFNAME), Some("ap0"));
        assert_eq!(table.u32(attr::IFTYPE), Some(Iftype::Ap as u32));
        assert_eq!(table.get(attr::MAC), Some(&[2, 0, 0, 0, 0, 9][..]));
    }

    #[tokio::test]
    async fn test_create_interface_validates_locally() {
        let mock = MockTransport::new();
        let mut state = state(&mock).await;
        let long = NewInterface::new(0, "a-very-long-interface-name", Iftype::Station);
        assert!(matches!(
            state.create_interface(&long).await,
            Err(Error::InvalidArgument(_))
        ));
        assert!(state.set_interface_type(3, Iftype::Unspecified).await.is_err());
        assert!(mock.sent_commands().is_empty());
    }

    #[tokio::test]
    async fn test_set_type_and_delete() {
        let mock = MockTransport::with_responder(|sent| vec![ack_frame(sent.seq)]);
        let mut state = state(&mock).await;
        state.set_interface_type(3, Iftype::Monitor).await.unwrap();
        assert_eq!(attrs(&last(&mock)).u32(attr::IFTYPE), Some(Iftype::Monitor as u32));
        state.delete_interface(3).await.unwrap();
        assert_eq!(last(&mock).cmd, Cmd::DelInterface as u8);
    }
}

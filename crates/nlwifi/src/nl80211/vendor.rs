//! Vendor sub-commands and raw management frames.

use super::consts::{Cmd, attr};
use super::listener::ListenerRegistry;
use crate::netlink::{AttrNode, Error, NlState, Result, Transport};

/// 802.11 management header length; shorter frames are rejected.
const MGMT_HEADER_LEN: usize = 24;

/// Where a vendor command is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VendorTarget {
    Interface(u32),
    Wiphy(u32),
}

impl<T: Transport> NlState<T, ListenerRegistry> {
    /// Pass a vendor sub-command through to the driver.
    ///
    /// Returns the `VENDOR_DATA` payload of every reply, in order.
    pub async fn vendor_command(
        &mut self,
        target: VendorTarget,
        vendor_id: u32,
        subcmd: u32,
        data: &[u8],
    ) -> Result<Vec<Vec<u8>>> {
        let mut command = Cmd::Vendor.request();
        command = match target {
            VendorTarget::Interface(ifindex) => command.ifindex(ifindex),
            VendorTarget::Wiphy(wiphy) => command.attr(AttrNode::u32(attr::WIPHY, wiphy)),
        };
        command = command.attrs([
            AttrNode::u32(attr::VENDOR_ID, vendor_id),
            AttrNode::u32(attr::VENDOR_SUBCMD, subcmd),
        ]);
        if !data.is_empty() {
            command = command.attr(AttrNode::raw(attr::VENDOR_DATA, data));
        }
        let replies = self
            .request(command)
            .await
            .map_err(|e| e.with_context(format!("vendor {:#08x}/{}", vendor_id, subcmd)))?;
        Ok(replies
            .iter()
            .filter_map(|r| r.table().get(attr::VENDOR_DATA).map(<[u8]>::to_vec))
            .collect())
    }

    /// Transmit a raw management frame. Returns the kernel's cookie for
    /// matching the later TX status, when one is assigned.
    pub async fn send_frame(
        &mut self,
        ifindex: u32,
        freq: Option<u32>,
        frame: &[u8],
        no_ack: bool,
    ) -> Result<Option<u64>> {
        if frame.len() < MGMT_HEADER_LEN {
            return Err(Error::InvalidArgument(format!(
                "management frame shorter than {} bytes",
                MGMT_HEADER_LEN
            )));
        }
        let mut command = Cmd::Frame
            .request()
            .ifindex(ifindex)
            .attr(AttrNode::raw(attr::FRAME, frame));
        if let Some(freq) = freq {
            command = command.attr(AttrNode::u32(attr::WIPHY_FREQ, freq));
        }
        if no_ack {
            command = command.attr(AttrNode::flag(attr::DONT_WAIT_FOR_ACK));
        }
        let replies = self.request(command).await?;
        Ok(replies.iter().find_map(|r| r.table().u64(attr::COOKIE)))
    }

    /// Receive management frames of `frame_type` whose body starts with
    /// `match_prefix` as [`EventKind::MgmtFrame`](super::EventKind::MgmtFrame)
    /// notifications on this socket.
    pub async fn register_frame(&mut self, ifindex: u32, frame_type: u16, match_prefix: &[u8]) -> Result<()> {
        let command = Cmd::RegisterFrame.request().ifindex(ifindex).attrs([
            AttrNode::u16(attr::FRAME_TYPE, frame_type),
            AttrNode::raw(attr::FRAME_MATCH, match_prefix),
        ]);
        self.request(command).await?;
        Ok(())
    }
}

//! Generic netlink request assembly.

use super::error::Result;
use super::genl::GenlMsgHdr;
use super::message::{NLMSG_HDRLEN, NlMsgHdr};
use super::tree::{AttrNode, encode_into};

/// Builds one generic netlink request: `nlmsghdr`, `genlmsghdr`, then
/// attribute trees. The length field is patched in by [`finish`](Self::finish).
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    buf: Vec<u8>,
}

impl MessageBuilder {
    /// Start a request for `cmd` of the family whose id is `msg_type`.
    ///
    /// `payload` is the expected attribute size; the buffer is allocated
    /// once for it.
    pub fn genl(msg_type: u16, flags: u16, cmd: u8, version: u8, payload: usize) -> Self {
        let genl = GenlMsgHdr::new(cmd, version);
        let mut buf = Vec::with_capacity(NLMSG_HDRLEN + genl.as_bytes().len() + payload);
        buf.extend_from_slice(NlMsgHdr::new(msg_type, flags).as_bytes());
        buf.resize(NLMSG_HDRLEN, 0);
        buf.extend_from_slice(genl.as_bytes());
        Self { buf }
    }

    /// Append attribute trees. Empty nests are dropped.
    pub fn attrs(&mut self, nodes: &[AttrNode]) -> Result<&mut Self> {
        encode_into(nodes, &mut self.buf)?;
        Ok(self)
    }

    /// Stamp sequence number and sender port.
    pub fn address(&mut self, seq: u32, port_id: u32) -> &mut Self {
        self.buf[8..12].copy_from_slice(&seq.to_ne_bytes());
        self.buf[12..16].copy_from_slice(&port_id.to_ne_bytes());
        self
    }

    /// Bytes written so far, headers included.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn finish(mut self) -> Vec<u8> {
        let len = self.buf.len() as u32;
        self.buf[0..4].copy_from_slice(&len.to_ne_bytes());
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::attr::{AttrTable, NLA_HDRLEN};
    use crate::netlink::genl::GENL_HDRLEN;
    use crate::netlink::message::NLM_F_REQUEST;

    #[test]
    fn test_headers_only() {
        let msg = MessageBuilder::genl(0x1c, NLM_F_REQUEST, 5, 0, 0).finish();
        assert_eq!(msg.len(), NLMSG_HDRLEN + GENL_HDRLEN);

        let header = NlMsgHdr::from_bytes(&msg).unwrap();
        assert_eq!(header.nlmsg_len as usize, msg.len());
        assert_eq!(header.nlmsg_type, 0x1c);
        assert_eq!(header.nlmsg_flags, NLM_F_REQUEST);
        assert_eq!(GenlMsgHdr::from_bytes(&msg[NLMSG_HDRLEN..]).unwrap().cmd, 5);
    }

    #[test]
    fn test_attrs_and_address() {
        let mut builder = MessageBuilder::genl(0x1c, NLM_F_REQUEST, 33, 0, 64);
        builder
            .attrs(&[
                AttrNode::u32(3, 7),
                AttrNode::nested(45, vec![AttrNode::string(1, "home")]),
                AttrNode::nested(44, Vec::new()),
            ])
            .unwrap()
            .address(77, 1234);
        let msg = builder.finish();
        assert_eq!(
            msg.len(),
            NLMSG_HDRLEN + GENL_HDRLEN + (NLA_HDRLEN + 4) + (NLA_HDRLEN + NLA_HDRLEN + 8)
        );

        let header = NlMsgHdr::from_bytes(&msg).unwrap();
        assert_eq!(header.nlmsg_seq, 77);
        assert_eq!(header.nlmsg_pid, 1234);

        let table = AttrTable::parse(&msg[NLMSG_HDRLEN + GENL_HDRLEN..]);
        assert_eq!(table.u32(3), Some(7));
        assert_eq!(table.nested(45).unwrap().string(1), Some("home"));
        assert!(!table.has(44));
    }
}

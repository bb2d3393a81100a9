//! Parsed generic netlink messages.

use super::header::{GENL_HDRLEN, GenlMsgHdr};
use crate::netlink::attr::AttrTable;
use crate::netlink::error::{Error, Result};
use crate::netlink::message::{NLM_F_MULTI, NlMsgHdr};

/// A borrowed generic netlink message: headers plus attribute stream.
#[derive(Debug, Clone, Copy)]
pub struct GenlMessage<'a> {
    /// Netlink header.
    pub header: &'a NlMsgHdr,
    /// Generic netlink header.
    pub genl: GenlMsgHdr,
    /// Raw attribute stream following the generic header.
    pub attrs: &'a [u8],
}

impl<'a> GenlMessage<'a> {
    /// Split a netlink payload into the generic header and attributes.
    pub fn parse(header: &'a NlMsgHdr, payload: &'a [u8]) -> Result<Self> {
        let genl = GenlMsgHdr::from_bytes(payload)
            .ok_or(Error::Truncated {
                expected: GENL_HDRLEN,
                actual: payload.len(),
            })?;
        Ok(Self {
            header,
            genl,
            attrs: &payload[GENL_HDRLEN..],
        })
    }

    /// Command id.
    pub fn cmd(&self) -> u8 {
        self.genl.cmd
    }

    /// Sequence number (0 for notifications).
    pub fn seq(&self) -> u32 {
        self.header.nlmsg_seq
    }

    /// Part of a multipart reply.
    pub fn is_multi(&self) -> bool {
        self.header.nlmsg_flags & NLM_F_MULTI != 0
    }

    /// Index the attributes.
    pub fn table(&self) -> AttrTable<'a> {
        AttrTable::parse(self.attrs)
    }

    /// Copy into an owned reply.
    pub fn to_owned(&self) -> GenlReply {
        GenlReply {
            cmd: self.genl.cmd,
            flags: self.header.nlmsg_flags,
            seq: self.header.nlmsg_seq,
            attrs: self.attrs.to_vec(),
        }
    }
}

/// An owned copy of one reply message, as collected by synchronous requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenlReply {
    pub cmd: u8,
    pub flags: u16,
    pub seq: u32,
    pub attrs: Vec<u8>,
}

impl GenlReply {
    /// Index the attributes.
    pub fn table(&self) -> AttrTable<'_> {
        AttrTable::parse(&self.attrs)
    }
}

//! `nlmsghdr` framing: one receive buffer holds a batch of frames, each
//! padded to 4 bytes.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::attr::{AttrIter, get};
use super::error::{Error, Result};

/// Round `len` up to the 4-byte frame alignment.
#[inline]
pub const fn nlmsg_align(len: usize) -> usize {
    (len + 3) & !3
}

pub const NLMSG_HDRLEN: usize = nlmsg_align(size_of::<NlMsgHdr>());

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct NlMsgHdr {
    /// Frame length, header included.
    pub nlmsg_len: u32,
    /// Family id for data frames, one of [`NlMsgType`] for control frames.
    pub nlmsg_type: u16,
    pub nlmsg_flags: u16,
    /// Zero on multicast notifications.
    pub nlmsg_seq: u32,
    pub nlmsg_pid: u32,
}

impl NlMsgHdr {
    /// A bare header of `msg_type`; length, sequence and port are filled in later.
    pub fn new(msg_type: u16, flags: u16) -> Self {
        Self {
            nlmsg_len: NLMSG_HDRLEN as u32,
            nlmsg_type: msg_type,
            nlmsg_flags: flags,
            ..Self::default()
        }
    }

    pub fn is_done(&self) -> bool {
        self.nlmsg_type == NlMsgType::DONE
    }

    pub fn is_multi(&self) -> bool {
        self.nlmsg_flags & NLM_F_MULTI != 0
    }

    /// NOOP, ERROR, DONE or OVERRUN rather than family data.
    pub fn is_control(&self) -> bool {
        self.nlmsg_type < NlMsgType::MIN_TYPE
    }

    pub fn as_bytes(&self) -> &[u8] {
        IntoBytes::as_bytes(self)
    }

    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(data)
            .map(|(hdr, _)| hdr)
            .map_err(|_| Error::Truncated {
                expected: size_of::<Self>(),
                actual: data.len(),
            })
    }
}

/// Control message types shared by every netlink protocol.
pub struct NlMsgType;

impl NlMsgType {
    pub const NOOP: u16 = 1;
    /// Error, or ACK when the code is zero.
    pub const ERROR: u16 = 2;
    /// Ends a dump.
    pub const DONE: u16 = 3;
    pub const OVERRUN: u16 = 4;
    pub const MIN_TYPE: u16 = 0x10;
}

pub const NLM_F_REQUEST: u16 = 0x01;
pub const NLM_F_MULTI: u16 = 0x02;
pub const NLM_F_ACK: u16 = 0x04;
pub const NLM_F_DUMP: u16 = 0x300;

// Only meaningful on ERROR frames.
pub const NLM_F_CAPPED: u16 = 0x100;
pub const NLM_F_ACK_TLVS: u16 = 0x200;

/// Extended ACK attribute holding the kernel's error text.
pub const NLMSGERR_ATTR_MSG: u16 = 1;

/// Walks the frames of one receive buffer, yielding header and payload.
///
/// A frame whose length does not fit the buffer ends the walk: nothing
/// after it can be located.
pub struct MessageIter<'a> {
    rest: &'a [u8],
}

impl<'a> MessageIter<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { rest: data }
    }
}

impl<'a> Iterator for MessageIter<'a> {
    type Item = Result<(&'a NlMsgHdr, &'a [u8])>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.len() < NLMSG_HDRLEN {
            return None;
        }
        let data = std::mem::take(&mut self.rest);
        let header = match NlMsgHdr::from_bytes(data) {
            Ok(header) => header,
            Err(e) => return Some(Err(e)),
        };

        let len = header.nlmsg_len as usize;
        if !(NLMSG_HDRLEN..=data.len()).contains(&len) {
            return Some(Err(Error::InvalidMessage(format!(
                "frame length {} in a {} byte buffer",
                len,
                data.len()
            ))));
        }

        self.rest = data.get(nlmsg_align(len)..).unwrap_or_default();
        Some(Ok((header, &data[NLMSG_HDRLEN..len])))
    }
}

/// Payload of an ERROR frame: the code and the echoed request header.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, Immutable, KnownLayout)]
pub struct NlMsgError {
    /// Negative errno, or 0 for an ACK.
    pub error: i32,
    pub msg: NlMsgHdr,
}

impl NlMsgError {
    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(data)
            .map(|(err, _)| err)
            .map_err(|_| Error::Truncated {
                expected: size_of::<Self>(),
                actual: data.len(),
            })
    }

    pub fn is_ack(&self) -> bool {
        self.error == 0
    }

    /// Extended ACK TLVs of the frame carrying `payload` with `flags`.
    ///
    /// Without `NLM_F_CAPPED` the whole request is echoed before them.
    pub fn attrs<'a>(&self, payload: &'a [u8], flags: u16) -> AttrIter<'a> {
        if flags & NLM_F_ACK_TLVS == 0 {
            return AttrIter::new(&[]);
        }
        let start = if flags & NLM_F_CAPPED != 0 {
            size_of::<Self>()
        } else {
            size_of::<i32>() + nlmsg_align(self.msg.nlmsg_len as usize)
        };
        AttrIter::new(payload.get(start..).unwrap_or_default())
    }

    /// Kernel error text, if it sent one.
    pub fn ext_ack_message(&self, payload: &[u8], flags: u16) -> Option<String> {
        self.attrs(payload, flags)
            .find(|(kind, _)| *kind == NLMSGERR_ATTR_MSG)
            .and_then(|(_, data)| get::string(data).ok())
            .map(str::to_owned)
    }
}

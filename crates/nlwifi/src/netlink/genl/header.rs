//! `struct genlmsghdr`: command and version, 4 bytes, between the netlink
//! header and the attributes.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct GenlMsgHdr {
    pub cmd: u8,
    pub version: u8,
    pub reserved: u16,
}

pub const GENL_HDRLEN: usize = size_of::<GenlMsgHdr>();

impl GenlMsgHdr {
    pub const fn new(cmd: u8, version: u8) -> Self {
        Self {
            cmd,
            version,
            reserved: 0,
        }
    }

    /// Copy the header out of the start of `data`; `None` if it is too
    /// short. Any alignment is accepted.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        Self::read_from_prefix(data).ok().map(|(hdr, _)| hdr)
    }

    pub fn as_bytes(&self) -> &[u8] {
        IntoBytes::as_bytes(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        assert_eq!(GENL_HDRLEN, 4);
        assert_eq!(GenlMsgHdr::new(0x21, 1).as_bytes(), [0x21, 1, 0, 0]);
    }

    #[test]
    fn test_from_bytes() {
        let hdr = GenlMsgHdr::from_bytes(&[0x21, 0x00, 0x00, 0x00, 0xaa]).unwrap();
        assert_eq!(hdr.cmd, 0x21);
        assert_eq!(hdr.version, 0);
        assert!(GenlMsgHdr::from_bytes(&[0x03, 0x01, 0x00]).is_none());
    }

    #[test]
    fn test_from_bytes_odd_offset() {
        let buf = [0u8, 0x21, 0x01, 0x00, 0x00];
        for start in 0..2 {
            let hdr = GenlMsgHdr::from_bytes(&buf[start..]);
            assert!(hdr.is_some());
        }
        let hdr = GenlMsgHdr::from_bytes(&buf[1..]).unwrap();
        assert_eq!((hdr.cmd, hdr.version), (0x21, 1));
    }
}

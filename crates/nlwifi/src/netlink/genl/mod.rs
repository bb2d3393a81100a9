//! Generic netlink: the header after `nlmsghdr`, family resolution through
//! the `nlctrl` controller, and borrowed/owned message views.
//!
//! Family ids are assigned by the kernel at module load, so every
//! [`NlState`](super::NlState) resolves its family by name when it opens.

mod family;
mod header;
mod message;

pub use family::{FamilyInfo, get_family_request};
pub use header::{GENL_HDRLEN, GenlMsgHdr};
pub use message::{GenlMessage, GenlReply};

/// Message type of the controller family; the only fixed genl id.
pub const GENL_ID_CTRL: u16 = 0x10;

/// `CTRL_CMD_*` / `CTRL_ATTR_*` identifiers of the controller family.
pub mod ctrl {
    pub const CMD_NEWFAMILY: u8 = 1;
    pub const CMD_GETFAMILY: u8 = 3;

    pub const ATTR_FAMILY_ID: u16 = 1;
    pub const ATTR_FAMILY_NAME: u16 = 2;
    pub const ATTR_VERSION: u16 = 3;
    pub const ATTR_MAXATTR: u16 = 5;
    pub const ATTR_MCAST_GROUPS: u16 = 7;

    /// Inside each `ATTR_MCAST_GROUPS` entry.
    pub const MCAST_GRP_NAME: u16 = 1;
    pub const MCAST_GRP_ID: u16 = 2;
}

//! Async generic netlink transport.
//!
//! The pieces, bottom-up:
//!
//! - [`message`], [`attr`], [`builder`]: the wire format
//! - [`tree`]: attribute trees used to describe requests
//! - [`socket`]: the [`Transport`] trait and the kernel socket behind it
//! - [`request`]: pending-request bookkeeping, correlation and expiry
//! - [`state`]: the socket manager tying them together
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use nlwifi::netlink::{Command, NlState, TransportConfig};
//!
//! # async fn example() -> nlwifi::Result<()> {
//! let mut state: NlState = NlState::connect(TransportConfig::default()).await?;
//! // nl80211 GET_WIPHY dump
//! let replies = state.request(Command::dump(1, "get_wiphy")).await?;
//! println!("{} wiphy fragments", replies.len());
//! # Ok(())
//! # }
//! ```

pub mod attr;
mod builder;
pub mod config;
mod error;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod genl;
pub mod message;
pub mod request;
mod socket;
pub mod state;
pub mod stats;
pub mod tree;

pub use attr::{AttrIter, AttrTable, NlAttr};
pub use builder::MessageBuilder;
pub use config::{FamilySpec, TransportConfig};
pub use error::{Error, Result};
pub use genl::{FamilyInfo, GenlMessage, GenlReply};
pub use message::{MessageIter, NLMSG_HDRLEN, NlMsgHdr, NlMsgType};
pub use request::{Completion, Reply, ReplyHandler, Verdict};
pub use socket::{NetlinkSocket, Transport};
pub use state::{Command, ConnState, Dispatch, Mode, NlState};
pub use stats::Stats;
pub use tree::AttrNode;

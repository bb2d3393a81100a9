//! Async nl80211 control plane for WiFi middleware.
//!
//! This crate talks to the kernel wireless subsystem over generic netlink
//! and schedules lifecycle actions for the access-point and station
//! daemons that sit on top of it.
//!
//! - [`netlink`]: socket manager, request correlation, attribute codec
//! - [`nl80211`]: wireless commands, capability records, event listeners
//! - [`sched`]: action-scheduling state machine for radios, access points
//!   and station endpoints
//!
//! # Features
//!
//! - `output` - `serde::Serialize` on read-only records
//!
//! # Example
//!
//! ```rust,no_run
//! use nlwifi::nl80211::{EventKind, Listener, Nl80211State};
//! use nlwifi::netlink::TransportConfig;
//!
//! #[tokio::main]
//! async fn main() -> nlwifi::Result<()> {
//!     let mut state: Nl80211State = Nl80211State::connect(TransportConfig::default()).await?;
//!
//!     for wiphy in state.get_wiphys().await? {
//!         println!("{}: {} bands", wiphy.name, wiphy.bands.len());
//!     }
//!
//!     state.add_listener(Listener::any().on(EventKind::RegChange, |event| {
//!         println!("regulatory change: {:?}", event.payload);
//!     }));
//!     state.run().await
//! }
//! ```

pub mod netlink;
pub mod nl80211;
pub mod sched;

pub use netlink::{Error, Result};

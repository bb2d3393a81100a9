//! nl80211 wireless configuration.
//!
//! [`Nl80211State`] is a socket manager for the `nl80211` family with a
//! [`ListenerRegistry`] as its event dispatcher. The typed command surface
//! lives in the submodules as methods on it:
//!
//! - [`interface`]: list, create, delete and retype interfaces
//! - [`wiphy`]: radio capabilities
//! - [`station`], [`survey`], [`scan`]: per-interface queries and scanning
//! - [`radio`]: transmit power, antennas, regulatory domain, background radar
//! - [`vendor`]: vendor sub-commands and raw management frames
//!
//! # Example
//!
//! ```rust,no_run
//! use nlwifi::nl80211::{self, ScanRequest};
//!
//! # async fn example() -> nlwifi::Result<()> {
//! let mut state = nl80211::default_state().await?;
//! let wlan0 = state.get_interfaces().await?.into_iter().find(|i| i.name == "wlan0");
//! if let Some(iface) = wlan0 {
//!     state.trigger_scan(iface.ifindex, &ScanRequest::new()).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod consts;
pub mod events;
pub mod interface;
pub mod listener;
pub mod radio;
pub mod scan;
pub mod station;
pub mod survey;
pub mod types;
pub mod vendor;
pub mod wiphy;

pub use consts::{Cmd, Iftype};
pub use events::{EventKind, EventOrigin, EventPayload, RadarEvent, WifiEvent};
pub use interface::{Interface, NewInterface};
pub use listener::{Listener, ListenerId, ListenerRegistry, Scope, event_channel};
pub use radio::{RegDomain, RegRule};
pub use scan::{Bss, ScanRequest};
pub use station::{RateInfo, Station};
pub use survey::SurveyInfo;
pub use types::{Band, ChannelSpec, ChannelWidth, MacAddr, TxPowerSetting};
pub use wiphy::{BandInfo, Beamforming, ChannelInfo, Wiphy};

use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};

use crate::netlink::{ConnState, Error, NetlinkSocket, NlState, Result, Transport, TransportConfig};

/// Socket manager speaking nl80211.
pub type Nl80211State<T = NetlinkSocket> = NlState<T, ListenerRegistry>;

impl<T: Transport> NlState<T, ListenerRegistry> {
    /// Subscribe to notifications.
    pub fn add_listener(&mut self, listener: Listener) -> ListenerId {
        self.dispatcher_mut().add(listener)
    }

    /// Unsubscribe. Returns whether `id` was registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.dispatcher_mut().remove(id)
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.dispatcher().len()
    }
}

static DEFAULT: Mutex<Option<Nl80211State>> = Mutex::const_new(None);

/// The process-wide nl80211 socket, connected on first use.
///
/// The guard serializes access; hold it only as long as needed. A state
/// torn down with [`shutdown_default`] is replaced on the next call.
pub async fn default_state() -> Result<MappedMutexGuard<'static, Nl80211State>> {
    let mut guard = DEFAULT.lock().await;
    let stale = guard
        .as_ref()
        .is_none_or(|state| state.conn_state() != ConnState::Connected);
    if stale {
        *guard = Some(Nl80211State::connect(TransportConfig::default()).await?);
    }
    MutexGuard::try_map(guard, Option::as_mut).map_err(|_| Error::NotConnected)
}

/// Tear down the process-wide socket, cancelling its pending requests.
pub async fn shutdown_default() {
    if let Some(mut state) = DEFAULT.lock().await.take() {
        state.close();
        tracing::debug!("default nl80211 socket closed");
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! nl80211 state over the mock transport.

    use std::time::Duration;

    use super::Nl80211State;
    use crate::netlink::fixtures::{MockTransport, SentMessage};
    use crate::netlink::{AttrTable, TransportConfig};

    pub async fn state(mock: &MockTransport) -> Nl80211State<MockTransport> {
        let config = TransportConfig::default().poll_interval(Duration::from_millis(5));
        let mut state = Nl80211State::with_transport(mock.clone(), config, Default::default());
        state.open().await.unwrap();
        state
    }

    /// Last family command the state sent.
    pub fn last(mock: &MockTransport) -> SentMessage {
        mock.sent_commands().pop().unwrap()
    }

    pub fn attrs(sent: &SentMessage) -> AttrTable<'_> {
        AttrTable::parse(&sent.attrs)
    }
}

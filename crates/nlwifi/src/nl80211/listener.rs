//! Event listeners and the per-socket registry that orders them.
//!
//! A [`Listener`] has a [`Scope`], an optional filter and one optional
//! callback per [`EventKind`]. A kind with no callback is one the listener
//! does not handle; see [`Listener::has_handler`].
//!
//! Matching listeners are invoked device-scoped first, then radio-scoped,
//! then global, each tier in subscription order.
//!
//! # Example
//!
//! ```rust,no_run
//! use nlwifi::nl80211::{EventKind, Listener, Nl80211State};
//! use nlwifi::netlink::TransportConfig;
//!
//! # async fn example() -> nlwifi::Result<()> {
//! let mut state = Nl80211State::connect(TransportConfig::default()).await?;
//! let id = state.add_listener(Listener::device(3).on(EventKind::ScanResults, |event| {
//!     println!("scan finished on {:?}", event.origin.ifname);
//! }));
//! state.run().await?;
//! # let _ = id;
//! # Ok(())
//! # }
//! ```

use std::fmt;

use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::events::{self, EventKind, EventOrigin, WifiEvent};
use crate::netlink::{Dispatch, GenlMessage};

/// Callback invoked with a decoded event.
pub type EventCallback = Box<dyn FnMut(&WifiEvent) + Send>;

/// Extra predicate for radio-scoped and global listeners.
pub type ListenerFilter = Box<dyn Fn(&EventOrigin) -> bool + Send>;

/// Which events a listener is offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Events for one interface index.
    Device(u32),
    /// Events for one wiphy.
    Radio(u32),
    /// Every event.
    Any,
}

impl Scope {
    /// Invocation tier: lower runs first.
    fn tier(&self) -> u8 {
        match self {
            Self::Device(_) => 0,
            Self::Radio(_) => 1,
            Self::Any => 2,
        }
    }
}

/// Handle returned by subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// A subscription to nl80211 notifications.
pub struct Listener {
    scope: Scope,
    filter: Option<ListenerFilter>,
    handlers: [Option<EventCallback>; EventKind::COUNT],
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<_> = EventKind::ALL
            .iter()
            .filter(|k| self.has_handler(**k))
            .collect();
        f.debug_struct("Listener")
            .field("scope", &self.scope)
            .field("filter", &self.filter.is_some())
            .field("kinds", &kinds)
            .finish()
    }
}

impl Listener {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            filter: None,
            handlers: std::array::from_fn(|_| None),
        }
    }

    /// Listener for one interface index.
    pub fn device(ifindex: u32) -> Self {
        Self::new(Scope::Device(ifindex))
    }

    /// Listener for one wiphy.
    pub fn radio(wiphy: u32) -> Self {
        Self::new(Scope::Radio(wiphy))
    }

    /// Listener for every device.
    pub fn any() -> Self {
        Self::new(Scope::Any)
    }

    /// Narrow a radio-scoped or global listener, e.g. to one of several
    /// interfaces sharing a wiphy. Ignored for device-scoped listeners.
    pub fn filter(mut self, f: impl Fn(&EventOrigin) -> bool + Send + 'static) -> Self {
        self.filter = Some(Box::new(f));
        self
    }

    /// Handle `kind` with `f`, replacing any previous callback.
    pub fn on(mut self, kind: EventKind, f: impl FnMut(&WifiEvent) + Send + 'static) -> Self {
        self.handlers[kind.slot()] = Some(Box::new(f));
        self
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Whether this listener has a callback for `kind`.
    pub fn has_handler(&self, kind: EventKind) -> bool {
        self.handlers[kind.slot()].is_some()
    }

    /// Whether an event from `origin` is in scope.
    pub fn matches(&self, origin: &EventOrigin) -> bool {
        let filtered = || self.filter.as_ref().is_none_or(|f| f(origin));
        match self.scope {
            Scope::Device(ifindex) => origin.ifindex == Some(ifindex),
            Scope::Radio(wiphy) => origin.wiphy == Some(wiphy) && filtered(),
            Scope::Any => filtered(),
        }
    }

    fn invoke(&mut self, event: &WifiEvent) {
        if let Some(f) = self.handlers[event.kind.slot()].as_mut() {
            f(event);
        }
    }
}

/// A listener forwarding `kinds` into a stream.
///
/// The stream ends once the listener is removed or its socket torn down.
pub fn event_channel(
    scope: Scope,
    kinds: &[EventKind],
) -> (Listener, UnboundedReceiverStream<WifiEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut listener = Listener::new(scope);
    for kind in kinds {
        let tx = tx.clone();
        listener = listener.on(*kind, move |event| {
            let _ = tx.send(event.clone());
        });
    }
    (listener, UnboundedReceiverStream::new(rx))
}

/// Ordered listener list owned by one socket.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: u64,
    listeners: Vec<(ListenerId, Listener)>,
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.listeners.iter()).finish()
    }
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener behind the last one of the same tier.
    pub fn add(&mut self, listener: Listener) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        let tier = listener.scope.tier();
        let at = self
            .listeners
            .iter()
            .position(|(_, l)| l.scope.tier() > tier)
            .unwrap_or(self.listeners.len());
        self.listeners.insert(at, (id, listener));
        tracing::trace!(%id, ?tier, "listener added");
        id
    }

    /// Unregister. Returns whether `id` was registered.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(i, _)| *i != id);
        self.listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Hand a decoded event to every matching listener in tier order.
    /// Returns how many were invoked.
    pub fn deliver(&mut self, event: &WifiEvent) -> usize {
        let mut count = 0;
        for (_, listener) in &mut self.listeners {
            if listener.has_handler(event.kind) && listener.matches(&event.origin) {
                listener.invoke(event);
                count += 1;
            }
        }
        count
    }
}

impl Dispatch for ListenerRegistry {
    fn dispatch(&mut self, msg: &GenlMessage<'_>) -> usize {
        let Some(entry) = events::lookup(msg.cmd()) else {
            return 0;
        };
        let table = msg.table();
        let origin = EventOrigin::from_table(&table);
        let wanted = self
            .listeners
            .iter()
            .any(|(_, l)| l.has_handler(entry.kind) && l.matches(&origin));
        if !wanted {
            return 0;
        }
        let event = WifiEvent {
            kind: entry.kind,
            cmd: msg.cmd(),
            origin,
            payload: (entry.decode)(&table),
        };
        self.deliver(&event)
    }

    fn clear(&mut self) {
        self.listeners.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::fixtures::{FAMILY_ID, nodes_frame};
    use crate::netlink::message::MessageIter;
    use crate::netlink::AttrNode;
    use crate::nl80211::consts::{Cmd, attr};
    use std::sync::{Arc, Mutex};
    use tokio_stream::StreamExt;

    type Log = Arc<Mutex<Vec<&'static str>>>;

    fn recorder(log: &Log, tag: &'static str) -> impl FnMut(&WifiEvent) + Send + 'static {
        let log = Arc::clone(log);
        move |_| log.lock().unwrap().push(tag)
    }

    fn dispatch(registry: &mut ListenerRegistry, cmd: Cmd, nodes: &[AttrNode]) -> usize {
        let frame = nodes_frame(0, 0, cmd as u8, nodes);
        let (header, payload) = MessageIter::new(&frame).next().unwrap().unwrap();
        assert_eq!(header.nlmsg_type, FAMILY_ID);
        let msg = GenlMessage::parse(header, payload).unwrap();
        registry.dispatch(&msg)
    }

    fn scan_done(ifindex: u32, wiphy: u32) -> Vec<AttrNode> {
        vec![
            AttrNode::u32(attr::WIPHY, wiphy),
            AttrNode::u32(attr::IFINDEX, ifindex),
        ]
    }

    #[test]
    fn test_device_listener_runs_before_global() {
        let log = Log::default();
        let mut registry = ListenerRegistry::new();
        // Registered global first; tier order still puts the device first.
        registry.add(Listener::any().on(EventKind::ScanResults, recorder(&log, "any")));
        registry.add(Listener::device(5).on(EventKind::ScanResults, recorder(&log, "dev")));

        let taken = dispatch(&mut registry, Cmd::NewScanResults, &scan_done(5, 0));
        assert_eq!(taken, 2);
        assert_eq!(*log.lock().unwrap(), ["dev", "any"]);
    }

    #[test]
    fn test_tiers_and_scope() {
        let log = Log::default();
        let mut registry = ListenerRegistry::new();
        registry.add(Listener::any().on(EventKind::ScanResults, recorder(&log, "any")));
        registry.add(Listener::radio(1).on(EventKind::ScanResults, recorder(&log, "radio")));
        registry.add(Listener::device(9).on(EventKind::ScanResults, recorder(&log, "other-dev")));
        registry.add(Listener::device(5).on(EventKind::ScanResults, recorder(&log, "dev")));

        dispatch(&mut registry, Cmd::NewScanResults, &scan_done(5, 1));
        assert_eq!(*log.lock().unwrap(), ["dev", "radio", "any"]);
    }

    #[test]
    fn test_radio_filter_disambiguates() {
        let log = Log::default();
        let mut registry = ListenerRegistry::new();
        registry.add(
            Listener::radio(1)
                .filter(|origin| origin.ifindex == Some(7))
                .on(EventKind::ScanResults, recorder(&log, "wlan7")),
        );
        registry.add(
            Listener::radio(1)
                .filter(|origin| origin.ifindex == Some(8))
                .on(EventKind::ScanResults, recorder(&log, "wlan8")),
        );

        dispatch(&mut registry, Cmd::NewScanResults, &scan_done(8, 1));
        assert_eq!(*log.lock().unwrap(), ["wlan8"]);
    }

    #[test]
    fn test_missing_callback_means_unsupported() {
        let log = Log::default();
        let mut registry = ListenerRegistry::new();
        let listener = Listener::any().on(EventKind::ScanResults, recorder(&log, "scan"));
        assert!(listener.has_handler(EventKind::ScanResults));
        assert!(!listener.has_handler(EventKind::Radar));
        registry.add(listener);

        assert_eq!(dispatch(&mut registry, Cmd::RadarDetect, &scan_done(5, 1)), 0);
        // Not a notification command at all.
        assert_eq!(dispatch(&mut registry, Cmd::GetScan, &scan_done(5, 1)), 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_remove_and_clear() {
        let log = Log::default();
        let mut registry = ListenerRegistry::new();
        let a = registry.add(Listener::any().on(EventKind::ScanResults, recorder(&log, "a")));
        let b = registry.add(Listener::any().on(EventKind::ScanResults, recorder(&log, "b")));
        assert_ne!(a, b);
        assert!(registry.remove(a));
        assert!(!registry.remove(a));

        dispatch(&mut registry, Cmd::NewScanResults, &scan_done(5, 1));
        assert_eq!(*log.lock().unwrap(), ["b"]);

        registry.clear();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_event_channel() {
        let mut registry = ListenerRegistry::new();
        let (listener, mut stream) = event_channel(Scope::Any, &[EventKind::StationNew]);
        registry.add(listener);

        let mac = [2, 0, 0, 0, 0, 9];
        dispatch(
            &mut registry,
            Cmd::NewStation,
            &[AttrNode::u32(attr::IFINDEX, 4), AttrNode::raw(attr::MAC, mac.to_vec())],
        );
        registry.clear();

        let event = stream.next().await.unwrap();
        assert_eq!(event.kind, EventKind::StationNew);
        assert_eq!(event.origin.ifindex, Some(4));
        assert!(stream.next().await.is_none());
    }
}

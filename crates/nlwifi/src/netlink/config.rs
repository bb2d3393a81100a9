//! Transport configuration.

use std::time::Duration;

/// Default per-request time budget.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound on a single wait for socket readability.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Which generic netlink family a socket manager speaks and how it
/// addresses devices.
#[derive(Debug, Clone)]
pub struct FamilySpec {
    /// Family name resolved through the controller.
    pub name: String,
    /// Version byte written into every generic netlink header.
    pub version: u8,
    /// Attribute carrying the target device index, if any.
    pub ifindex_attr: Option<u16>,
    /// Multicast groups to join on connect. Missing ones are tolerated.
    pub groups: Vec<String>,
}

impl FamilySpec {
    /// The kernel wireless configuration family.
    pub fn nl80211() -> Self {
        Self {
            name: "nl80211".into(),
            version: 0,
            ifindex_attr: Some(crate::nl80211::consts::attr::IFINDEX),
            groups: vec!["scan".into(), "config".into(), "mlme".into()],
        }
    }
}

impl Default for FamilySpec {
    fn default() -> Self {
        Self::nl80211()
    }
}

/// Settings for a socket manager.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use nlwifi::netlink::TransportConfig;
///
/// let config = TransportConfig::new()
///     .timeout(Duration::from_secs(3))
///     .recv_buffer(1 << 20);
/// assert_eq!(config.timeout, Duration::from_secs(3));
/// ```
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Time budget for every request.
    pub timeout: Duration,
    /// Upper bound on one wait for readability inside the read loop.
    pub poll_interval: Duration,
    /// Requested `SO_RCVBUF`; `None` keeps the system default.
    pub recv_buffer: Option<usize>,
    /// Ask the kernel for extended ACK reasons.
    pub ext_ack: bool,
    /// Family to resolve and groups to join.
    pub family: FamilySpec,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            recv_buffer: None,
            ext_ack: true,
            family: FamilySpec::default(),
        }
    }
}

impl TransportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn recv_buffer(mut self, size: usize) -> Self {
        self.recv_buffer = Some(size);
        self
    }

    pub fn ext_ack(mut self, enabled: bool) -> Self {
        self.ext_ack = enabled;
        self
    }

    pub fn family(mut self, family: FamilySpec) -> Self {
        self.family = family;
        self
    }
}

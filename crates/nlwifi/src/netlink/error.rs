//! Error types for netlink and scheduler operations.

use std::io;

/// Result type for nlwifi operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during netlink and scheduling operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error from socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error.
    #[cfg(feature = "output")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Kernel rejected a command.
    #[error("{command}: {message} (errno {errno})")]
    Kernel {
        /// Name of the command the kernel rejected.
        command: String,
        /// The errno value from the kernel (positive).
        errno: i32,
        /// Human-readable reason (extended ACK text when available).
        message: String,
    },

    /// Message was truncated.
    #[error("message truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Expected message length.
        expected: usize,
        /// Actual bytes received.
        actual: usize,
    },

    /// Invalid message format.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Invalid attribute format.
    #[error("invalid attribute: {0}")]
    InvalidAttribute(String),

    /// An attribute (or nest) does not fit the 16-bit length field.
    #[error("attribute {kind} too large to encode: {len} bytes")]
    AttributeTooLarge {
        /// Attribute type.
        kind: u16,
        /// Encoded length including header.
        len: usize,
    },

    /// Generic netlink family is not registered in the kernel.
    #[error("generic netlink family not found: {name}")]
    FamilyNotFound {
        /// Family name.
        name: String,
    },

    /// Request exceeded its time budget.
    #[error("{command} (seq {seq}) expired without a reply")]
    Expired {
        /// Name of the command that expired.
        command: String,
        /// Sequence number of the request.
        seq: u32,
    },

    /// Request was cancelled because its socket was torn down.
    #[error("{command} (seq {seq}) cancelled")]
    Cancelled {
        /// Name of the cancelled command.
        command: String,
        /// Sequence number of the request.
        seq: u32,
    },

    /// The reply handler rejected a reply.
    #[error("{command} (seq {seq}) rejected by reply handler")]
    Rejected {
        /// Name of the command.
        command: String,
        /// Sequence number of the request.
        seq: u32,
    },

    /// Socket is not in the connected state.
    #[error("socket not connected")]
    NotConnected,

    /// Invalid argument supplied by the caller.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Interface not found.
    #[error("no interface found for index {ifindex}")]
    InterfaceNotFound {
        /// The interface index that was not found.
        ifindex: u32,
    },

    /// Wiphy not found.
    #[error("no wiphy found for id {wiphy}")]
    WiphyNotFound {
        /// The wiphy id that was not found.
        wiphy: u32,
    },

    /// Station not found.
    #[error("station {mac} not found on interface {ifindex}")]
    StationNotFound {
        /// Station MAC address.
        mac: String,
        /// Interface index.
        ifindex: u32,
    },

    /// An external daemon failed a lifecycle request.
    #[error("{daemon} daemon for {name}: {message}")]
    Daemon {
        /// Daemon kind ("access point", "station").
        daemon: &'static str,
        /// Entity the daemon serves.
        name: String,
        /// Failure reported by the daemon control layer.
        message: String,
    },

    /// Scheduler entity not found.
    #[error("unknown {kind}: {name}")]
    UnknownEntity {
        /// Entity kind ("radio", "access point", "endpoint").
        kind: &'static str,
        /// Entity name.
        name: String,
    },
}

impl Error {
    /// Create a kernel error from a (negative) errno value.
    pub fn from_errno(errno: i32, command: impl Into<String>) -> Self {
        let message = io::Error::from_raw_os_error(errno.abs()).to_string();
        Self::Kernel {
            command: command.into(),
            errno: errno.abs(),
            message,
        }
    }

    /// Add context to this error.
    ///
    /// Prefixes the command of kernel errors. Other errors are returned unchanged.
    pub fn with_context(self, operation: impl Into<String>) -> Self {
        match self {
            Self::Kernel {
                command,
                errno,
                message,
            } => Self::Kernel {
                command: format!("{}: {}", operation.into(), command),
                errno,
                message,
            },
            other => other,
        }
    }

    /// Check if this is a "not found" error (ENOENT, ENODEV, etc.).
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Kernel { errno, .. } => {
                matches!(*errno, libc::ENOENT | libc::ENODEV)
            }
            Self::InterfaceNotFound { .. }
            | Self::WiphyNotFound { .. }
            | Self::StationNotFound { .. }
            | Self::FamilyNotFound { .. }
            | Self::UnknownEntity { .. } => true,
            _ => false,
        }
    }

    /// Check if this is a permission error (EPERM, EACCES).
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::Kernel { errno, .. } => matches!(*errno, libc::EPERM | libc::EACCES),
            _ => false,
        }
    }

    /// Check if this is a "device busy" error (EBUSY).
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Kernel { errno, .. } if *errno == libc::EBUSY)
    }

    /// Check if the request ran out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Expired { .. })
    }

    /// Get the errno value if this is a kernel error.
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::Kernel { errno, .. } => Some(*errno),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_errno() {
        let err = Error::from_errno(-1, "set_wiphy"); // EPERM
        assert!(err.is_permission_denied());
        assert_eq!(err.errno(), Some(1));
    }

    #[test]
    fn test_with_context() {
        let err = Error::from_errno(-19, "get_interface").with_context("wlan0");
        assert!(err.is_not_found());
        let msg = err.to_string();
        assert!(msg.contains("wlan0: get_interface"));
        assert!(msg.contains("No such device"));
    }

    #[test]
    fn test_is_busy() {
        assert!(Error::from_errno(-16, "trigger_scan").is_busy());
        assert!(!Error::from_errno(-1, "trigger_scan").is_busy());
    }

    #[test]
    fn test_expired_is_timeout() {
        let err = Error::Expired {
            command: "get_station".into(),
            seq: 7,
        };
        assert!(err.is_timeout());
        assert!(err.errno().is_none());
        assert_eq!(err.to_string(), "get_station (seq 7) expired without a reply");
    }

    #[test]
    fn test_error_messages() {
        let err = Error::InterfaceNotFound { ifindex: 5 };
        assert_eq!(err.to_string(), "no interface found for index 5");

        let err = Error::UnknownEntity {
            kind: "radio",
            name: "wifi0".into(),
        };
        assert_eq!(err.to_string(), "unknown radio: wifi0");
        assert!(err.is_not_found());
    }
}

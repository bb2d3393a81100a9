//! Per-socket counters.

use super::request::Completion;

/// Running totals for one socket manager.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "output", derive(serde::Serialize))]
pub struct Stats {
    /// Requests handed to the socket.
    pub requests: u64,
    /// Requests finished successfully.
    pub succeeded: u64,
    /// Requests rejected by the kernel, the handler, or a failed send.
    pub failed: u64,
    /// Requests that ran out of time.
    pub expired: u64,
    /// Requests cancelled by teardown.
    pub cancelled: u64,
    /// Notifications received for the family.
    pub events_seen: u64,
    /// Notifications delivered to at least one listener.
    pub events_handled: u64,
    /// Notifications no listener wanted.
    pub events_unhandled: u64,
    /// Frames that could not be parsed.
    pub malformed: u64,
    /// Failed socket reads, overruns included.
    pub recv_errors: u64,
}

impl Stats {
    /// Count a terminal request.
    pub fn record(&mut self, completion: &Completion) {
        match completion {
            Completion::Success => self.succeeded += 1,
            Completion::Expired => self.expired += 1,
            Completion::Cancelled => self.cancelled += 1,
            Completion::Kernel { .. } | Completion::SendFailed(_) | Completion::Rejected => {
                self.failed += 1
            }
        }
    }

    /// Count a notification and whether anyone took it.
    pub fn record_event(&mut self, listeners: usize) {
        self.events_seen += 1;
        if listeners > 0 {
            self.events_handled += 1;
        } else {
            self.events_unhandled += 1;
        }
    }

    /// Requests sent but not yet terminal.
    pub fn in_flight(&self) -> u64 {
        self.requests
            .saturating_sub(self.succeeded + self.failed + self.expired + self.cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record() {
        let mut stats = Stats {
            requests: 4,
            ..Default::default()
        };
        stats.record(&Completion::Success);
        stats.record(&Completion::Expired);
        stats.record(&Completion::Kernel {
            errno: 22,
            reason: None,
        });
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.in_flight(), 1);

        stats.record_event(0);
        stats.record_event(2);
        assert_eq!(stats.events_seen, 2);
        assert_eq!(stats.events_handled, 1);
        assert_eq!(stats.events_unhandled, 1);
    }
}

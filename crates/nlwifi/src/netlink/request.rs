//! Pending request bookkeeping.
//!
//! Every command sent on a socket gets a [`Request`] keyed by its sequence
//! number. Reply fragments carrying that number are routed to it until it
//! reaches a terminal [`Completion`]; the table then removes it and hands
//! back a [`Finished`] record.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use super::error::{Error, Result};
use super::genl::{GenlMessage, GenlReply};

/// Terminal state of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Acknowledged, or the last fragment was accepted.
    Success,
    /// The kernel rejected the command.
    Kernel {
        /// Positive errno.
        errno: i32,
        /// Extended ACK text, when the kernel supplied one.
        reason: Option<String>,
    },
    /// No terminal reply within the time budget.
    Expired,
    /// The socket was closed while the request was pending.
    Cancelled,
    /// The message never left the socket.
    SendFailed(String),
    /// The reply handler refused a reply.
    Rejected,
}

impl Completion {
    /// Collapse to success/failure.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Convert into a crate error for command `command` with sequence `seq`.
    pub fn into_result(self, command: &str, seq: u32) -> Result<()> {
        let command = command.to_string();
        match self {
            Self::Success => Ok(()),
            Self::Kernel { errno, reason } => Err(match reason {
                Some(message) => Error::Kernel {
                    command,
                    errno,
                    message,
                },
                None => Error::from_errno(errno, command),
            }),
            Self::Expired => Err(Error::Expired { command, seq }),
            Self::Cancelled => Err(Error::Cancelled { command, seq }),
            Self::SendFailed(msg) => Err(Error::Io(std::io::Error::other(msg))),
            Self::Rejected => Err(Error::Rejected { command, seq }),
        }
    }
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Kernel {
                errno,
                reason: Some(r),
            } => write!(f, "errno {} ({})", errno, r),
            Self::Kernel { errno, reason: None } => write!(f, "errno {}", errno),
            Self::Expired => write!(f, "expired"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::SendFailed(msg) => write!(f, "send failed: {}", msg),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// What a reply handler is shown.
#[derive(Debug, Clone, Copy)]
pub enum Reply<'a, 'c> {
    /// A data fragment.
    Message(GenlMessage<'a>),
    /// End of a multipart reply, or a bare acknowledgement.
    Done,
    /// The request `seq` is terminating with this result.
    Failed {
        seq: u32,
        completion: &'c Completion,
    },
}

/// A handler's decision after seeing a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verdict {
    /// Let the transport decide: multipart fragments keep the request
    /// open, anything else finalizes it as a success.
    #[default]
    Continue,
    /// Keep waiting after a single-part reply. Nothing can follow the
    /// end marker, so there it finalizes like `Continue`.
    Hold,
    /// Finalize now as a success.
    Done,
    /// Finalize now as rejected.
    Fail,
}

/// Callback receiving every reply for one request.
pub type ReplyHandler = Box<dyn FnMut(Reply<'_, '_>) -> Verdict + Send>;

enum Sink {
    Handler(ReplyHandler),
    Collect(Vec<GenlReply>),
}

impl Sink {
    fn offer(&mut self, reply: Reply<'_, '_>) -> Verdict {
        match self {
            Self::Handler(h) => h(reply),
            Self::Collect(out) => {
                if let Reply::Message(msg) = reply {
                    out.push(msg.to_owned());
                }
                Verdict::Continue
            }
        }
    }

    fn take_replies(self) -> Vec<GenlReply> {
        match self {
            Self::Handler(_) => Vec::new(),
            Self::Collect(out) => out,
        }
    }
}

/// One outstanding command.
pub struct Request {
    /// Correlation key.
    pub seq: u32,
    /// Command id, for diagnostics.
    pub cmd: u8,
    /// Human-readable command name.
    pub name: &'static str,
    /// When the message was handed to the socket.
    pub sent_at: Instant,
    /// Time budget.
    pub timeout: Duration,
    /// Whether a synchronous caller is waiting for the result.
    pub sync: bool,
    sink: Sink,
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("seq", &self.seq)
            .field("cmd", &self.name)
            .field("sent_at", &self.sent_at)
            .field("timeout", &self.timeout)
            .field("sync", &self.sync)
            .finish_non_exhaustive()
    }
}

impl Request {
    /// Request whose replies go to `handler`.
    pub fn with_handler(
        seq: u32,
        cmd: u8,
        name: &'static str,
        timeout: Duration,
        handler: ReplyHandler,
    ) -> Self {
        Self {
            seq,
            cmd,
            name,
            sent_at: Instant::now(),
            timeout,
            sync: false,
            sink: Sink::Handler(handler),
        }
    }

    /// Request whose replies are collected for a synchronous caller.
    pub fn collecting(seq: u32, cmd: u8, name: &'static str, timeout: Duration) -> Self {
        Self {
            seq,
            cmd,
            name,
            sent_at: Instant::now(),
            timeout,
            sync: true,
            sink: Sink::Collect(Vec::new()),
        }
    }

    /// Override the send timestamp.
    pub fn with_sent_at(mut self, at: Instant) -> Self {
        self.sent_at = at;
        self
    }

    /// Mark that a synchronous caller waits on this request.
    pub fn blocking(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    /// Whether the request is older than its budget at `now`.
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.sent_at) >= self.timeout
    }

    fn finish(mut self, completion: Completion) -> Finished {
        if !completion.is_success() {
            self.sink.offer(Reply::Failed {
                seq: self.seq,
                completion: &completion,
            });
        }
        Finished {
            seq: self.seq,
            cmd: self.cmd,
            name: self.name,
            sync: self.sync,
            completion,
            replies: self.sink.take_replies(),
        }
    }
}

/// A request that reached its terminal state.
#[derive(Debug, Clone)]
pub struct Finished {
    pub seq: u32,
    pub cmd: u8,
    pub name: &'static str,
    pub sync: bool,
    pub completion: Completion,
    /// Collected replies (empty for handler-driven requests).
    pub replies: Vec<GenlReply>,
}

impl Finished {
    /// Collapse into the collected replies or an error.
    pub fn into_result(self) -> Result<Vec<GenlReply>> {
        self.completion.into_result(self.name, self.seq)?;
        Ok(self.replies)
    }
}

/// Pending requests of one socket, keyed by sequence number.
#[derive(Debug, Default)]
pub struct RequestTable {
    pending: BTreeMap<u32, Request>,
}

impl RequestTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a request. Fails if its sequence number is already in use.
    pub fn insert(&mut self, request: Request) -> Result<()> {
        if self.pending.contains_key(&request.seq) {
            return Err(Error::InvalidArgument(format!(
                "sequence number {} already pending",
                request.seq
            )));
        }
        self.pending.insert(request.seq, request);
        Ok(())
    }

    pub fn contains(&self, seq: u32) -> bool {
        self.pending.contains_key(&seq)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Sequence numbers currently pending, ascending.
    pub fn seqs(&self) -> impl Iterator<Item = u32> + '_ {
        self.pending.keys().copied()
    }

    /// Route a data fragment to its request.
    ///
    /// Returns the finished record if the fragment made the request terminal.
    pub fn on_message(&mut self, msg: GenlMessage<'_>) -> Option<Finished> {
        let seq = msg.seq();
        let request = self.pending.get_mut(&seq)?;
        let completion = match request.sink.offer(Reply::Message(msg)) {
            Verdict::Continue if msg.is_multi() => return None,
            Verdict::Continue | Verdict::Done => Completion::Success,
            Verdict::Hold => return None,
            Verdict::Fail => Completion::Rejected,
        };
        self.finish(seq, completion)
    }

    /// Route an end-of-multipart marker or acknowledgement. Always terminal.
    pub fn on_done(&mut self, seq: u32) -> Option<Finished> {
        let request = self.pending.get_mut(&seq)?;
        let completion = match request.sink.offer(Reply::Done) {
            Verdict::Fail => Completion::Rejected,
            Verdict::Continue | Verdict::Hold | Verdict::Done => Completion::Success,
        };
        self.finish(seq, completion)
    }

    /// Terminate a request with a failure (kernel error, send failure).
    pub fn fail(&mut self, seq: u32, completion: Completion) -> Option<Finished> {
        self.finish(seq, completion)
    }

    /// Terminate every request older than its budget at `now`.
    pub fn expire(&mut self, now: Instant) -> Vec<Finished> {
        let expired: Vec<u32> = self
            .pending
            .values()
            .filter(|r| r.is_expired(now))
            .map(|r| r.seq)
            .collect();
        expired
            .into_iter()
            .filter_map(|seq| self.finish(seq, Completion::Expired))
            .collect()
    }

    /// Terminate every pending request as cancelled.
    pub fn cancel_all(&mut self) -> Vec<Finished> {
        std::mem::take(&mut self.pending)
            .into_values()
            .map(|r| r.finish(Completion::Cancelled))
            .collect()
    }

    fn finish(&mut self, seq: u32, completion: Completion) -> Option<Finished> {
        self.pending.remove(&seq).map(|r| r.finish(completion))
    }
}

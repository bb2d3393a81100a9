//! Socket manager: request submission, the read loop and teardown.
//!
//! An [`NlState`] owns one transport, its pending requests and an event
//! dispatcher. Everything runs on the task that owns the state: the read
//! loop is driven either by a synchronous request waiting for its reply or
//! by [`NlState::run`] / [`NlState::dispatch_once`].
//!
//! # Example
//!
//! ```rust,no_run
//! use nlwifi::nl80211::Nl80211State;
//! use nlwifi::netlink::TransportConfig;
//!
//! # async fn example() -> nlwifi::Result<()> {
//! let mut state = Nl80211State::connect(TransportConfig::default()).await?;
//! for iface in state.get_interfaces().await? {
//!     println!("{} (ifindex {})", iface.name, iface.ifindex);
//! }
//! state.close();
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::attr::NLA_HDRLEN;
use super::builder::MessageBuilder;
use super::config::TransportConfig;
use super::error::{Error, Result};
use super::genl::{FamilyInfo, GenlMessage, GenlReply, get_family_request};
use super::message::{
    MessageIter, NLM_F_ACK, NLM_F_DUMP, NLM_F_REQUEST, NlMsgError, NlMsgHdr, NlMsgType,
};
use super::request::{Completion, Finished, Reply, ReplyHandler, Request, RequestTable, Verdict};
use super::socket::{NetlinkSocket, Transport};
use super::stats::Stats;
use super::tree::{AttrNode, encoded_size};

/// Lifecycle of a socket manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    /// Socket exists, family not resolved yet.
    Created,
    /// Family resolved, groups joined; commands may be sent.
    Connected,
    /// Torn down; every command fails with [`Error::NotConnected`].
    Closed,
}

/// Receiver of notifications that did not match a pending request.
pub trait Dispatch: Send {
    /// Deliver one notification. Returns how many listeners took it.
    fn dispatch(&mut self, msg: &GenlMessage<'_>) -> usize;

    /// Drop every listener.
    fn clear(&mut self);
}

impl Dispatch for () {
    fn dispatch(&mut self, _msg: &GenlMessage<'_>) -> usize {
        0
    }

    fn clear(&mut self) {}
}

/// Whether `send_command` blocks until the request is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Drive the read loop until the request finishes.
    Sync,
    /// Return once the message is sent; replies arrive from the read loop.
    Async,
}

/// A command ready to be sent.
#[derive(Debug, Clone)]
pub struct Command {
    /// Command id.
    pub cmd: u8,
    /// Name used in logs and errors.
    pub name: &'static str,
    /// Target device index, encoded with the family's ifindex attribute.
    pub ifindex: Option<u32>,
    /// Caller attributes.
    pub attrs: Vec<AttrNode>,
    /// Netlink flags (`NLM_F_REQUEST` is always set).
    pub flags: u16,
    /// Override the configured time budget.
    pub timeout: Option<Duration>,
}

impl Command {
    /// A "do" command expecting an acknowledgement.
    pub fn new(cmd: u8, name: &'static str) -> Self {
        Self {
            cmd,
            name,
            ifindex: None,
            attrs: Vec::new(),
            flags: NLM_F_REQUEST | NLM_F_ACK,
            timeout: None,
        }
    }

    /// A dump command; replies are multipart and end with a done marker.
    pub fn dump(cmd: u8, name: &'static str) -> Self {
        Self {
            flags: NLM_F_REQUEST | NLM_F_DUMP,
            ..Self::new(cmd, name)
        }
    }

    pub fn ifindex(mut self, ifindex: u32) -> Self {
        self.ifindex = Some(ifindex);
        self
    }

    pub fn attr(mut self, node: AttrNode) -> Self {
        self.attrs.push(node);
        self
    }

    pub fn attrs(mut self, nodes: impl IntoIterator<Item = AttrNode>) -> Self {
        self.attrs.extend(nodes);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Socket manager for one generic netlink family.
pub struct NlState<T: Transport = NetlinkSocket, D: Dispatch = ()> {
    transport: T,
    config: TransportConfig,
    conn: ConnState,
    family: FamilyInfo,
    joined: Vec<u32>,
    seq: u32,
    requests: RequestTable,
    finished: HashMap<u32, Finished>,
    dispatcher: D,
    stats: Stats,
}

impl<D: Dispatch + Default> NlState<NetlinkSocket, D> {
    /// Open a kernel socket, resolve the family and join its groups.
    pub async fn connect(config: TransportConfig) -> Result<Self> {
        let transport = NetlinkSocket::open(&config)?;
        let mut state = Self::with_transport(transport, config, D::default());
        state.open().await?;
        Ok(state)
    }
}

impl<T: Transport, D: Dispatch> NlState<T, D> {
    /// Wrap a transport. The state starts in [`ConnState::Created`].
    pub fn with_transport(transport: T, config: TransportConfig, dispatcher: D) -> Self {
        Self {
            transport,
            config,
            conn: ConnState::Created,
            family: FamilyInfo::default(),
            joined: Vec::new(),
            seq: 0,
            requests: RequestTable::new(),
            finished: HashMap::new(),
            dispatcher,
            stats: Stats::default(),
        }
    }

    /// Resolve the family id and join the configured multicast groups.
    ///
    /// An unresolvable family is fatal; a missing group only disables
    /// that class of notification.
    pub async fn open(&mut self) -> Result<()> {
        match self.conn {
            ConnState::Connected => return Ok(()),
            ConnState::Closed => return Err(Error::NotConnected),
            ConnState::Created => {}
        }

        let name = self.config.family.name.clone();
        let (msg_type, cmd, version, attrs) = get_family_request(&name);
        let command = Command::new(cmd, "get_family").attrs(attrs);
        let replies = match self.request_as(msg_type, version, command).await {
            Ok(replies) => replies,
            Err(e) if e.errno() == Some(libc::ENOENT) => {
                return Err(Error::FamilyNotFound { name });
            }
            Err(e) => return Err(e),
        };
        let reply = replies
            .first()
            .ok_or_else(|| Error::FamilyNotFound { name: name.clone() })?;
        self.family = FamilyInfo::parse(&reply.attrs)?;

        for group in &self.config.family.groups {
            let Some(id) = self.family.group(group) else {
                tracing::warn!("{}: multicast group '{}' not available", name, group);
                continue;
            };
            match self.transport.add_membership(id) {
                Ok(()) => self.joined.push(id),
                Err(e) => tracing::warn!("{}: cannot join group '{}': {}", name, group, e),
            }
        }

        self.conn = ConnState::Connected;
        tracing::debug!(
            family = %name,
            id = self.family.id,
            groups = self.joined.len(),
            "connected"
        );
        Ok(())
    }

    /// Current lifecycle state.
    pub fn conn_state(&self) -> ConnState {
        self.conn
    }

    /// Resolved family information.
    pub fn family(&self) -> &FamilyInfo {
        &self.family
    }

    /// Counters.
    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Settings this state was created with.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// The transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut D {
        &mut self.dispatcher
    }

    /// Whether `seq` is still waiting for a terminal reply.
    pub fn is_pending(&self, seq: u32) -> bool {
        self.requests.contains(seq)
    }

    /// Number of pending requests.
    pub fn pending(&self) -> usize {
        self.requests.len()
    }

    /// Send a command and collect its replies.
    pub async fn request(&mut self, command: Command) -> Result<Vec<GenlReply>> {
        self.ensure_connected()?;
        let family = self.family.id;
        let version = self.config.family.version;
        self.request_as(family, version, command).await
    }

    /// Send a command, routing every reply through `handler`.
    ///
    /// In [`Mode::Sync`] the read loop is driven until the request is
    /// terminal and its collapsed result returned. In [`Mode::Async`] the
    /// sequence number is returned as soon as the message is sent.
    ///
    /// A failed send calls `handler` once with the failure before the
    /// error is returned.
    pub async fn send_command<F>(&mut self, mode: Mode, command: Command, handler: F) -> Result<u32>
    where
        F: FnMut(Reply<'_, '_>) -> Verdict + Send + 'static,
    {
        self.ensure_connected()?;
        let seq = self.next_seq();
        let timeout = command.timeout.unwrap_or(self.config.timeout);
        let request = Request::with_handler(seq, command.cmd, command.name, timeout, Box::new(handler))
            .blocking(mode == Mode::Sync);
        let family = self.family.id;
        let version = self.config.family.version;
        if mode == Mode::Async {
            self.submit(family, version, &command, request).await?;
            return Ok(seq);
        }

        let mut waiter = Waiter { state: self, seq };
        waiter.state.submit(family, version, &command, request).await?;
        waiter.wait().await?.completion.into_result(command.name, seq)?;
        Ok(seq)
    }

    /// Async send with a boxed handler.
    pub async fn send_async(&mut self, command: Command, handler: ReplyHandler) -> Result<u32> {
        self.send_command(Mode::Async, command, handler).await
    }

    /// Drive the read loop forever, delivering replies and notifications.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            self.dispatch_once().await?;
        }
    }

    /// One read-loop iteration.
    ///
    /// Waits at most the configured poll interval for data, processes the
    /// batch, then sweeps expired requests. Returns the number of messages
    /// processed.
    ///
    /// A receive-queue overrun (`ENOBUFS`) loses notifications but leaves
    /// the socket usable, so it is counted and skipped. Any other receive
    /// error is returned after the sweep.
    pub async fn dispatch_once(&mut self) -> Result<usize> {
        let polled =
            tokio::time::timeout(self.config.poll_interval, self.transport.recv()).await;
        let result = match polled {
            Ok(Ok(data)) => Ok(self.process(&data)),
            Ok(Err(e)) => {
                self.stats.recv_errors += 1;
                if is_overrun(&e) {
                    tracing::warn!("receive queue overrun, notifications lost");
                    Ok(0)
                } else {
                    tracing::warn!("receive failed: {}", e);
                    Err(e)
                }
            }
            Err(_elapsed) => Ok(0),
        };
        self.expire_requests(Instant::now());
        result
    }

    /// Finalize every request older than its budget at `now`.
    pub fn expire_requests(&mut self, now: Instant) -> usize {
        let expired = self.requests.expire(now);
        let count = expired.len();
        for finished in expired {
            tracing::warn!(seq = finished.seq, "{} expired", finished.name);
            self.complete(finished);
        }
        count
    }

    /// Tear down: cancel pending requests, drop listeners and memberships.
    ///
    /// Idempotent. The transport is released when the state is dropped.
    pub fn close(&mut self) {
        if self.conn == ConnState::Closed {
            return;
        }
        for finished in self.requests.cancel_all() {
            tracing::debug!(seq = finished.seq, "{} cancelled", finished.name);
            self.stats.record(&finished.completion);
        }
        self.finished.clear();
        self.dispatcher.clear();
        for group in std::mem::take(&mut self.joined) {
            if let Err(e) = self.transport.drop_membership(group) {
                tracing::debug!("drop membership {}: {}", group, e);
            }
        }
        self.conn = ConnState::Closed;
    }

    /// Process one received batch. Returns the number of messages handled.
    pub fn process(&mut self, data: &[u8]) -> usize {
        let mut count = 0;
        for item in MessageIter::new(data) {
            let (header, payload) = match item {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!("dropping rest of batch: {}", e);
                    self.stats.malformed += 1;
                    break;
                }
            };
            self.process_message(header, payload);
            count += 1;
        }
        count
    }

    fn process_message(&mut self, header: &NlMsgHdr, payload: &[u8]) {
        let seq = header.nlmsg_seq;
        if seq != 0 && self.requests.contains(seq) {
            if let Some(finished) = self.correlate(header, payload) {
                self.complete(finished);
            }
            return;
        }

        if header.is_control() {
            tracing::trace!(seq, kind = header.nlmsg_type, "unmatched control message");
            return;
        }
        if header.nlmsg_type != self.family.id || self.conn != ConnState::Connected {
            tracing::trace!(kind = header.nlmsg_type, "message for another family");
            return;
        }

        match GenlMessage::parse(header, payload) {
            Ok(msg) => {
                let taken = self.dispatcher.dispatch(&msg);
                self.stats.record_event(taken);
                if taken == 0 {
                    tracing::trace!(cmd = msg.cmd(), "unhandled event");
                }
            }
            Err(e) => {
                self.stats.malformed += 1;
                tracing::warn!("malformed event: {}", e);
            }
        }
    }

    fn correlate(&mut self, header: &NlMsgHdr, payload: &[u8]) -> Option<Finished> {
        let seq = header.nlmsg_seq;
        match header.nlmsg_type {
            NlMsgType::DONE => {
                // A dump that failed midway reports a negative errno here.
                let code = payload
                    .get(..4)
                    .map(|b| i32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
                    .unwrap_or(0);
                if code < 0 {
                    let completion = Completion::Kernel {
                        errno: -code,
                        reason: None,
                    };
                    return self.requests.fail(seq, completion);
                }
                self.requests.on_done(seq)
            }
            NlMsgType::ERROR => match NlMsgError::from_bytes(payload) {
                Ok(err) if err.is_ack() => self.requests.on_done(seq),
                Ok(err) => {
                    let completion = Completion::Kernel {
                        errno: -err.error,
                        reason: err.ext_ack_message(payload, header.nlmsg_flags),
                    };
                    self.requests.fail(seq, completion)
                }
                Err(e) => {
                    self.stats.malformed += 1;
                    tracing::warn!(seq, "malformed error frame: {}", e);
                    None
                }
            },
            NlMsgType::NOOP | NlMsgType::OVERRUN => None,
            _ => match GenlMessage::parse(header, payload) {
                Ok(msg) => self.requests.on_message(msg),
                Err(e) => {
                    self.stats.malformed += 1;
                    tracing::warn!(seq, "malformed reply: {}", e);
                    None
                }
            },
        }
    }

    fn complete(&mut self, finished: Finished) {
        self.stats.record(&finished.completion);
        match &finished.completion {
            Completion::Success => {
                tracing::trace!(seq = finished.seq, "{} done", finished.name)
            }
            Completion::Expired | Completion::Cancelled => {}
            failure => tracing::debug!(seq = finished.seq, "{} failed: {}", finished.name, failure),
        }
        if finished.sync {
            self.finished.insert(finished.seq, finished);
        }
    }

    fn ensure_connected(&self) -> Result<()> {
        match self.conn {
            ConnState::Connected => Ok(()),
            _ => Err(Error::NotConnected),
        }
    }

    /// Next free sequence number. Skips 0 (notifications) and numbers
    /// still in use.
    fn next_seq(&mut self) -> u32 {
        loop {
            self.seq = self.seq.wrapping_add(1);
            if self.seq != 0
                && !self.requests.contains(self.seq)
                && !self.finished.contains_key(&self.seq)
            {
                return self.seq;
            }
        }
    }

    async fn request_as(
        &mut self,
        msg_type: u16,
        version: u8,
        command: Command,
    ) -> Result<Vec<GenlReply>> {
        if self.conn == ConnState::Closed {
            return Err(Error::NotConnected);
        }
        let seq = self.next_seq();
        let timeout = command.timeout.unwrap_or(self.config.timeout);
        let request = Request::collecting(seq, command.cmd, command.name, timeout);
        let mut waiter = Waiter { state: self, seq };
        waiter.state.submit(msg_type, version, &command, request).await?;
        waiter.wait().await?.into_result()
    }

    fn encode(&self, msg_type: u16, version: u8, seq: u32, command: &Command) -> Result<Vec<u8>> {
        let ifindex = self
            .config
            .family
            .ifindex_attr
            .zip(command.ifindex)
            .map(|(kind, ifindex)| AttrNode::u32(kind, ifindex));
        let size = ifindex.as_ref().map_or(0, |_| NLA_HDRLEN + 4) + encoded_size(&command.attrs);
        let mut builder = MessageBuilder::genl(
            msg_type,
            command.flags | NLM_F_REQUEST,
            command.cmd,
            version,
            size,
        );
        if let Some(node) = ifindex {
            builder.attrs(&[node])?;
        }
        builder
            .attrs(&command.attrs)?
            .address(seq, self.transport.port_id());
        Ok(builder.finish())
    }

    async fn submit(
        &mut self,
        msg_type: u16,
        version: u8,
        command: &Command,
        request: Request,
    ) -> Result<()> {
        let seq = request.seq;
        let msg = match self.encode(msg_type, version, seq, command) {
            Ok(msg) => msg,
            Err(e) => {
                // Never reached the wire; the handler still sees one failure.
                self.requests.insert(request)?;
                self.stats.requests += 1;
                if let Some(f) = self.requests.fail(seq, Completion::SendFailed(e.to_string())) {
                    self.stats.record(&f.completion);
                }
                return Err(e);
            }
        };

        self.requests.insert(request)?;
        self.stats.requests += 1;
        tracing::trace!(seq, cmd = command.cmd, "sending {}", command.name);

        if let Err(e) = self.transport.send(&msg).await {
            tracing::debug!(seq, "{}: send failed: {}", command.name, e);
            if let Some(f) = self.requests.fail(seq, Completion::SendFailed(e.to_string())) {
                self.stats.record(&f.completion);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Forget a synchronous request nobody waits for any more.
    fn abandon(&mut self, seq: u32) {
        if let Some(finished) = self.requests.fail(seq, Completion::Cancelled) {
            tracing::debug!(seq, "{} abandoned by its caller", finished.name);
            self.stats.record(&finished.completion);
        }
        self.finished.remove(&seq);
    }
}

fn is_overrun(e: &Error) -> bool {
    matches!(e, Error::Io(io) if io.raw_os_error() == Some(libc::ENOBUFS))
}

/// A synchronous caller's claim on one request.
///
/// Dropping it before the result is collected (the caller's future was
/// dropped, or the read loop failed) cancels the request and discards any
/// parked result.
struct Waiter<'a, T: Transport, D: Dispatch> {
    state: &'a mut NlState<T, D>,
    seq: u32,
}

impl<T: Transport, D: Dispatch> Waiter<'_, T, D> {
    async fn wait(&mut self) -> Result<Finished> {
        let seq = self.seq;
        while self.state.requests.contains(seq) {
            self.state.dispatch_once().await?;
        }
        self.state
            .finished
            .remove(&seq)
            .ok_or_else(|| Error::InvalidMessage(format!("no result recorded for seq {}", seq)))
    }
}

impl<T: Transport, D: Dispatch> Drop for Waiter<'_, T, D> {
    fn drop(&mut self) {
        self.state.abandon(self.seq);
    }
}

impl<T: Transport, D: Dispatch> Drop for NlState<T, D> {
    fn drop(&mut self) {
        self.close();
    }
}

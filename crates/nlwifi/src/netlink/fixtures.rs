//! In-memory transport and frame builders for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::error::{Error, Result};
use super::genl::{GENL_HDRLEN, GENL_ID_CTRL, GenlMsgHdr, ctrl};
use super::message::{
    MessageIter, NLM_F_ACK, NLM_F_MULTI, NLMSG_HDRLEN, NlMsgHdr, NlMsgType, nlmsg_align,
};
use super::socket::Transport;
use super::tree::{AttrNode, encode};

/// Family id the mock controller hands out for nl80211.
pub const FAMILY_ID: u16 = 0x1c;

/// Group ids the mock controller advertises.
pub const GROUPS: [(&str, u32); 3] = [("scan", 5), ("config", 6), ("mlme", 7)];

/// A message the code under test sent.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub msg_type: u16,
    pub flags: u16,
    pub seq: u32,
    pub cmd: u8,
    pub attrs: Vec<u8>,
}

type Responder = Box<dyn FnMut(&SentMessage) -> Vec<Vec<u8>> + Send>;

#[derive(Default)]
struct Inner {
    sent: Vec<SentMessage>,
    inbox: VecDeque<Vec<u8>>,
    responder: Option<Responder>,
    groups: Vec<u32>,
    fail_sends: bool,
    recv_errors: VecDeque<i32>,
    no_family: bool,
    hidden_groups: Vec<&'static str>,
}

/// Transport that answers the controller itself and forwards family
/// commands to an optional responder.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<Inner>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every family command with the frames `f` returns.
    pub fn with_responder(
        f: impl FnMut(&SentMessage) -> Vec<Vec<u8>> + Send + 'static,
    ) -> Self {
        let mock = Self::default();
        mock.inner.lock().unwrap().responder = Some(Box::new(f));
        mock
    }

    /// Controller reports the family as unknown.
    pub fn without_family(self) -> Self {
        self.inner.lock().unwrap().no_family = true;
        self
    }

    /// Controller omits one multicast group.
    pub fn without_group(self, name: &'static str) -> Self {
        self.inner.lock().unwrap().hidden_groups.push(name);
        self
    }

    /// Queue a frame for the next receive.
    pub fn push(&self, frame: Vec<u8>) {
        self.inner.lock().unwrap().inbox.push_back(frame);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.inner.lock().unwrap().sent.clone()
    }

    /// Family commands sent so far (controller traffic excluded).
    pub fn sent_commands(&self) -> Vec<SentMessage> {
        self.sent()
            .into_iter()
            .filter(|m| m.msg_type != GENL_ID_CTRL)
            .collect()
    }

    pub fn groups(&self) -> Vec<u32> {
        self.inner.lock().unwrap().groups.clone()
    }

    pub fn fail_sends(&self, fail: bool) {
        self.inner.lock().unwrap().fail_sends = fail;
    }

    /// Make the next receive fail with `errno` before any queued frame.
    pub fn push_recv_error(&self, errno: i32) {
        self.inner.lock().unwrap().recv_errors.push_back(errno);
    }
}

impl Transport for MockTransport {
    async fn send(&self, msg: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_sends {
            return Err(Error::Io(std::io::Error::from_raw_os_error(libc::ENOBUFS)));
        }
        let sent = parse_sent(msg)?;
        let replies = if sent.msg_type == GENL_ID_CTRL {
            if inner.no_family {
                vec![error_frame(sent.seq, -libc::ENOENT)]
            } else {
                let groups: Vec<_> = GROUPS
                    .iter()
                    .filter(|(name, _)| !inner.hidden_groups.contains(name))
                    .copied()
                    .collect();
                vec![family_frame(sent.seq, &groups)]
            }
        } else {
            match inner.responder.as_mut() {
                Some(f) => f(&sent),
                None => Vec::new(),
            }
        };
        inner.inbox.extend(replies);
        inner.sent.push(sent);
        Ok(())
    }

    async fn recv(&self) -> Result<Vec<u8>> {
        let next = {
            let mut inner = self.inner.lock().unwrap();
            if let Some(errno) = inner.recv_errors.pop_front() {
                return Err(Error::Io(std::io::Error::from_raw_os_error(errno)));
            }
            inner.inbox.pop_front()
        };
        match next {
            Some(frame) => Ok(frame),
            None => std::future::pending().await,
        }
    }

    fn port_id(&self) -> u32 {
        4242
    }

    fn add_membership(&mut self, group: u32) -> Result<()> {
        self.inner.lock().unwrap().groups.push(group);
        Ok(())
    }

    fn drop_membership(&mut self, group: u32) -> Result<()> {
        self.inner.lock().unwrap().groups.retain(|g| *g != group);
        Ok(())
    }
}

fn parse_sent(msg: &[u8]) -> Result<SentMessage> {
    let (header, payload) = MessageIter::new(msg)
        .next()
        .ok_or_else(|| Error::InvalidMessage("empty send".into()))??;
    let genl = GenlMsgHdr::from_bytes(payload)
        .ok_or_else(|| Error::InvalidMessage("missing genl header".into()))?;
    Ok(SentMessage {
        msg_type: header.nlmsg_type,
        flags: header.nlmsg_flags,
        seq: header.nlmsg_seq,
        cmd: genl.cmd,
        attrs: payload[GENL_HDRLEN..].to_vec(),
    })
}

fn frame(msg_type: u16, flags: u16, seq: u32, payload: &[u8]) -> Vec<u8> {
    let mut hdr = NlMsgHdr::new(msg_type, flags);
    hdr.nlmsg_len = (NLMSG_HDRLEN + payload.len()) as u32;
    hdr.nlmsg_seq = seq;
    let mut buf = hdr.as_bytes().to_vec();
    buf.extend_from_slice(payload);
    buf.resize(nlmsg_align(buf.len()), 0);
    buf
}

/// A generic netlink frame carrying an encoded attribute stream.
pub fn genl_frame(msg_type: u16, flags: u16, seq: u32, cmd: u8, attrs: &[u8]) -> Vec<u8> {
    let mut payload = GenlMsgHdr::new(cmd, 1).as_bytes().to_vec();
    payload.extend_from_slice(attrs);
    frame(msg_type, flags, seq, &payload)
}

/// A generic netlink frame built from attribute nodes.
pub fn nodes_frame(flags: u16, seq: u32, cmd: u8, nodes: &[AttrNode]) -> Vec<u8> {
    let attrs = encode(nodes).unwrap();
    genl_frame(FAMILY_ID, flags, seq, cmd, &attrs)
}

/// A multipart fragment built from attribute nodes.
pub fn multi_frame(seq: u32, cmd: u8, nodes: &[AttrNode]) -> Vec<u8> {
    nodes_frame(NLM_F_MULTI, seq, cmd, nodes)
}

/// End-of-dump marker.
pub fn done_frame(seq: u32) -> Vec<u8> {
    frame(NlMsgType::DONE, NLM_F_MULTI, seq, &0i32.to_ne_bytes())
}

/// NLMSG_ERROR frame with `errno` (negative) echoing a bare header.
pub fn error_frame(seq: u32, errno: i32) -> Vec<u8> {
    let mut echoed = NlMsgHdr::new(FAMILY_ID, NLM_F_ACK);
    echoed.nlmsg_seq = seq;
    let mut payload = errno.to_ne_bytes().to_vec();
    payload.extend_from_slice(echoed.as_bytes());
    frame(NlMsgType::ERROR, 0, seq, &payload)
}

/// Acknowledgement.
pub fn ack_frame(seq: u32) -> Vec<u8> {
    error_frame(seq, 0)
}

fn family_frame(seq: u32, groups: &[(&str, u32)]) -> Vec<u8> {
    let groups = groups
        .iter()
        .enumerate()
        .map(|(i, (name, id))| {
            AttrNode::nested(
                i as u16 + 1,
                vec![
                    AttrNode::u32(ctrl::MCAST_GRP_ID, *id),
                    AttrNode::string(ctrl::MCAST_GRP_NAME, name),
                ],
            )
        })
        .collect();
    let attrs = encode(&[
        AttrNode::u16(ctrl::ATTR_FAMILY_ID, FAMILY_ID),
        AttrNode::string(ctrl::ATTR_FAMILY_NAME, "nl80211"),
        AttrNode::u32(ctrl::ATTR_VERSION, 1),
        AttrNode::nested(ctrl::ATTR_MCAST_GROUPS, groups),
    ])
    .unwrap();
    genl_frame(GENL_ID_CTRL, 0, seq, ctrl::CMD_NEWFAMILY, &attrs)
}

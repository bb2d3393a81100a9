//! Attribute trees.
//!
//! An [`AttrNode`] is either a raw leaf or a nested container of further
//! nodes. Requests are described as a list of nodes and serialized in one
//! pass: the encoded size is computed up front so the output buffer is
//! allocated once.
//!
//! A nested node without any encodable descendant is dropped from the
//! output entirely. The kernel rejects empty containers for most nl80211
//! attributes.

use super::attr::{NLA_F_NESTED, NLA_HDRLEN, NlAttr, nla_align};
use super::error::{Error, Result};

/// One node of an attribute tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrNode {
    /// A leaf. An empty payload encodes a flag attribute.
    Raw { kind: u16, data: Vec<u8> },
    /// A container holding child nodes in wire order.
    Nested { kind: u16, children: Vec<AttrNode> },
}

impl AttrNode {
    pub fn raw(kind: u16, data: impl Into<Vec<u8>>) -> Self {
        Self::Raw {
            kind,
            data: data.into(),
        }
    }

    pub fn flag(kind: u16) -> Self {
        Self::raw(kind, Vec::new())
    }

    pub fn u8(kind: u16, value: u8) -> Self {
        Self::raw(kind, vec![value])
    }

    pub fn u16(kind: u16, value: u16) -> Self {
        Self::raw(kind, value.to_ne_bytes())
    }

    pub fn u32(kind: u16, value: u32) -> Self {
        Self::raw(kind, value.to_ne_bytes())
    }

    pub fn u64(kind: u16, value: u64) -> Self {
        Self::raw(kind, value.to_ne_bytes())
    }

    pub fn i32(kind: u16, value: i32) -> Self {
        Self::raw(kind, value.to_ne_bytes())
    }

    /// Null-terminated string.
    pub fn string(kind: u16, value: &str) -> Self {
        let mut data = Vec::with_capacity(value.len() + 1);
        data.extend_from_slice(value.as_bytes());
        data.push(0);
        Self::raw(kind, data)
    }

    pub fn nested(kind: u16, children: Vec<AttrNode>) -> Self {
        Self::Nested { kind, children }
    }

    /// Attribute type of this node.
    pub fn kind(&self) -> u16 {
        match self {
            Self::Raw { kind, .. } | Self::Nested { kind, .. } => *kind,
        }
    }

    /// Bytes this node occupies on the wire, padding included.
    ///
    /// Zero for a nest that would be dropped.
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Raw { data, .. } => nla_align(NLA_HDRLEN + data.len()),
            Self::Nested { children, .. } => {
                let inner = encoded_size(children);
                if inner == 0 { 0 } else { NLA_HDRLEN + inner }
            }
        }
    }

    fn write(&self, buf: &mut Vec<u8>) -> Result<()> {
        match self {
            Self::Raw { kind, data } => {
                let len = NLA_HDRLEN + data.len();
                if len > u16::MAX as usize {
                    return Err(Error::AttributeTooLarge { kind: *kind, len });
                }
                buf.extend_from_slice(NlAttr::new(*kind, data.len()).as_bytes());
                buf.extend_from_slice(data);
                buf.resize(nla_align(buf.len()), 0);
            }
            Self::Nested { kind, children } => {
                let len = self.encoded_len();
                if len == 0 {
                    return Ok(());
                }
                if len > u16::MAX as usize {
                    return Err(Error::AttributeTooLarge { kind: *kind, len });
                }
                let hdr = NlAttr {
                    nla_len: len as u16,
                    nla_type: *kind | NLA_F_NESTED,
                };
                buf.extend_from_slice(hdr.as_bytes());
                for child in children {
                    child.write(buf)?;
                }
            }
        }
        Ok(())
    }

    /// Describe an incoming attribute stream as a list of nodes.
    ///
    /// Only attributes flagged `NLA_F_NESTED` are descended into; other
    /// payloads stay opaque leaves.
    pub fn decode(data: &[u8]) -> Vec<AttrNode> {
        let mut out = Vec::new();
        let mut rest = data;
        while rest.len() >= NLA_HDRLEN {
            let Ok(hdr) = NlAttr::from_bytes(rest) else {
                break;
            };
            let len = hdr.nla_len as usize;
            if len < NLA_HDRLEN || len > rest.len() {
                break;
            }
            let payload = &rest[NLA_HDRLEN..len];
            out.push(if hdr.is_nested() {
                AttrNode::nested(hdr.kind(), Self::decode(payload))
            } else {
                AttrNode::raw(hdr.kind(), payload)
            });
            rest = rest.get(nla_align(len)..).unwrap_or(&[]);
        }
        out
    }
}

/// Total encoded size of a node list.
pub fn encoded_size(nodes: &[AttrNode]) -> usize {
    nodes.iter().map(AttrNode::encoded_len).sum()
}

/// Append the encoding of `nodes` to `buf`.
///
/// Reserves the computed size first; a node that fails to encode aborts
/// the whole list.
pub fn encode_into(nodes: &[AttrNode], buf: &mut Vec<u8>) -> Result<()> {
    buf.reserve(encoded_size(nodes));
    for node in nodes {
        node.write(buf)?;
    }
    Ok(())
}

/// Encode `nodes` into a fresh attribute stream.
pub fn encode(nodes: &[AttrNode]) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(encoded_size(nodes));
    encode_into(nodes, &mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::attr::AttrTable;

    #[test]
    fn test_flag_has_no_payload() {
        let bytes = encode(&[AttrNode::flag(142)]).unwrap();
        assert_eq!(bytes.len(), NLA_HDRLEN);
        let table = AttrTable::parse(&bytes);
        assert!(table.flag(142));
        assert_eq!(table.get(142), Some(&[][..]));
    }

    #[test]
    fn test_size_is_exact() {
        let nodes = vec![
            AttrNode::u32(3, 5),
            AttrNode::string(4, "wlan0"),
            AttrNode::nested(
                44,
                vec![AttrNode::u32(0, 2412), AttrNode::u32(1, 2437)],
            ),
        ];
        let bytes = encode(&nodes).unwrap();
        assert_eq!(bytes.len(), encoded_size(&nodes));
        // 8 (u32) + 12 ("wlan0\0" padded) + 4 + 2 * 8 (nest)
        assert_eq!(bytes.len(), 40);
    }

    #[test]
    fn test_empty_nest_dropped() {
        let nodes = vec![
            AttrNode::u32(3, 5),
            AttrNode::nested(45, vec![]),
            AttrNode::nested(44, vec![AttrNode::nested(1, vec![])]),
        ];
        let bytes = encode(&nodes).unwrap();
        let table = AttrTable::parse(&bytes);
        assert_eq!(table.len(), 1);
        assert!(!table.has(45));
        assert!(!table.has(44));
    }

    #[test]
    fn test_nest_with_flag_kept() {
        let nodes = vec![AttrNode::nested(158, vec![AttrNode::flag(1)])];
        let bytes = encode(&nodes).unwrap();
        assert_eq!(bytes.len(), 2 * NLA_HDRLEN);
    }

    #[test]
    fn test_too_large() {
        let nodes = vec![
            AttrNode::u32(3, 1),
            AttrNode::raw(197, vec![0u8; 70_000]),
        ];
        let err = encode(&nodes).unwrap_err();
        assert!(matches!(err, Error::AttributeTooLarge { kind: 197, .. }));
    }

    #[test]
    fn test_nest_too_large() {
        let children = (0..20).map(|i| AttrNode::raw(i, vec![0u8; 4000])).collect();
        let err = encode(&[AttrNode::nested(197, children)]).unwrap_err();
        assert!(matches!(err, Error::AttributeTooLarge { kind: 197, .. }));
    }

    #[test]
    fn test_decode_matches_input() {
        let nodes = vec![
            AttrNode::u32(1, 0),
            AttrNode::nested(44, vec![AttrNode::u32(0, 5180)]),
            AttrNode::flag(8),
        ];
        let bytes = encode(&nodes).unwrap();
        assert_eq!(AttrNode::decode(&bytes), nodes);
    }
}

//! `nlattr` TLVs.
//!
//! Replies are walked with [`AttrIter`] and usually indexed into an
//! [`AttrTable`], which is what the nl80211 decoders read from. Requests
//! are written through [`AttrNode`](super::tree::AttrNode) trees instead.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::error::{Error, Result};

pub const NLA_HDRLEN: usize = 4;

/// Set on the type of an attribute whose payload is more attributes.
pub const NLA_F_NESTED: u16 = 1 << 15;
const NLA_F_NET_BYTEORDER: u16 = 1 << 14;

/// Round `len` up to the 4-byte TLV alignment.
#[inline]
pub const fn nla_align(len: usize) -> usize {
    (len + 3) & !3
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct NlAttr {
    /// Header plus payload, padding excluded.
    pub nla_len: u16,
    pub nla_type: u16,
}

impl NlAttr {
    pub fn new(kind: u16, payload_len: usize) -> Self {
        Self {
            nla_len: (NLA_HDRLEN + payload_len) as u16,
            nla_type: kind,
        }
    }

    /// Type with the nested/byte-order flags masked off.
    pub fn kind(&self) -> u16 {
        self.nla_type & !(NLA_F_NESTED | NLA_F_NET_BYTEORDER)
    }

    pub fn is_nested(&self) -> bool {
        self.nla_type & NLA_F_NESTED != 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        IntoBytes::as_bytes(self)
    }

    /// Copy the header out of `data`; TLVs inside a nest need not be
    /// aligned relative to the allocation.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::read_from_prefix(data)
            .map(|(attr, _)| attr)
            .map_err(|_| Error::Truncated {
                expected: NLA_HDRLEN,
                actual: data.len(),
            })
    }
}

/// Yields `(kind, payload)` for each TLV of a stream.
///
/// Stops at the first attribute whose length does not fit; a kernel
/// never sends one, so the remainder is treated as garbage.
#[derive(Debug, Clone)]
pub struct AttrIter<'a> {
    rest: &'a [u8],
}

impl<'a> AttrIter<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { rest: data }
    }
}

impl<'a> Iterator for AttrIter<'a> {
    type Item = (u16, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let data = std::mem::take(&mut self.rest);
        let attr = NlAttr::from_bytes(data).ok()?;
        let len = attr.nla_len as usize;
        if !(NLA_HDRLEN..=data.len()).contains(&len) {
            return None;
        }
        self.rest = data.get(nla_align(len)..).unwrap_or_default();
        Some((attr.kind(), &data[NLA_HDRLEN..len]))
    }
}

/// Typed reads of a single payload. nl80211 uses host byte order.
pub mod get {
    use super::{Error, Result};

    fn array<const N: usize>(data: &[u8], what: &str) -> Result<[u8; N]> {
        data.get(..N)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| Error::InvalidAttribute(format!("truncated {} attribute", what)))
    }

    pub fn u8(data: &[u8]) -> Result<u8> {
        array::<1>(data, "u8").map(|[b]| b)
    }

    pub fn u16_ne(data: &[u8]) -> Result<u16> {
        array(data, "u16").map(u16::from_ne_bytes)
    }

    pub fn u32_ne(data: &[u8]) -> Result<u32> {
        array(data, "u32").map(u32::from_ne_bytes)
    }

    pub fn u64_ne(data: &[u8]) -> Result<u64> {
        array(data, "u64").map(u64::from_ne_bytes)
    }

    pub fn i8(data: &[u8]) -> Result<i8> {
        array(data, "s8").map(i8::from_ne_bytes)
    }

    pub fn i32_ne(data: &[u8]) -> Result<i32> {
        array(data, "s32").map(i32::from_ne_bytes)
    }

    /// NUL-terminated or unterminated UTF-8.
    pub fn string(data: &[u8]) -> Result<&str> {
        let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
        std::str::from_utf8(&data[..end])
            .map_err(|e| Error::InvalidAttribute(format!("invalid UTF-8: {}", e)))
    }
}

/// Attribute stream indexed by type.
///
/// Slot `n` holds the payload of the last attribute of type `n` seen in
/// the stream. Getters return `None` for absent or malformed attributes,
/// `fill_*` helpers leave the caller's default in place.
#[derive(Debug, Clone, Default)]
pub struct AttrTable<'a> {
    slots: Vec<Option<&'a [u8]>>,
}

impl<'a> AttrTable<'a> {
    /// Index an attribute stream.
    pub fn parse(data: &'a [u8]) -> Self {
        let mut slots: Vec<Option<&'a [u8]>> = Vec::new();
        for (kind, payload) in AttrIter::new(data) {
            let idx = kind as usize;
            if idx >= slots.len() {
                slots.resize(idx + 1, None);
            }
            slots[idx] = Some(payload);
        }
        Self { slots }
    }

    /// Raw payload of attribute `kind`.
    pub fn get(&self, kind: u16) -> Option<&'a [u8]> {
        self.slots.get(kind as usize).copied().flatten()
    }

    /// Whether attribute `kind` is present.
    pub fn has(&self, kind: u16) -> bool {
        self.get(kind).is_some()
    }

    /// Number of distinct attribute types present.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Whether no attribute is present.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn u8(&self, kind: u16) -> Option<u8> {
        self.get(kind).and_then(|d| get::u8(d).ok())
    }

    pub fn u16(&self, kind: u16) -> Option<u16> {
        self.get(kind).and_then(|d| get::u16_ne(d).ok())
    }

    pub fn u32(&self, kind: u16) -> Option<u32> {
        self.get(kind).and_then(|d| get::u32_ne(d).ok())
    }

    pub fn u64(&self, kind: u16) -> Option<u64> {
        self.get(kind).and_then(|d| get::u64_ne(d).ok())
    }

    pub fn i8(&self, kind: u16) -> Option<i8> {
        self.get(kind).and_then(|d| get::i8(d).ok())
    }

    pub fn i32(&self, kind: u16) -> Option<i32> {
        self.get(kind).and_then(|d| get::i32_ne(d).ok())
    }

    pub fn string(&self, kind: u16) -> Option<&'a str> {
        self.get(kind).and_then(|d| get::string(d).ok())
    }

    /// Flag attributes carry no payload; presence is the value.
    pub fn flag(&self, kind: u16) -> bool {
        self.has(kind)
    }

    /// Index the payload of a nested attribute.
    pub fn nested(&self, kind: u16) -> Option<AttrTable<'a>> {
        self.get(kind).map(AttrTable::parse)
    }

    /// Iterate the children of a nested attribute in wire order.
    pub fn iter_nested(&self, kind: u16) -> AttrIter<'a> {
        AttrIter::new(self.get(kind).unwrap_or(&[]))
    }

    /// Copy the raw payload of `kind` into `out`, capped at `out.len()`.
    ///
    /// Returns the number of bytes copied (0 when absent).
    pub fn copy_raw(&self, kind: u16, out: &mut [u8]) -> usize {
        match self.get(kind) {
            Some(data) => {
                let n = data.len().min(out.len());
                out[..n].copy_from_slice(&data[..n]);
                n
            }
            None => 0,
        }
    }

    pub fn fill_u8(&self, kind: u16, out: &mut u8) {
        if let Some(v) = self.u8(kind) {
            *out = v;
        }
    }

    pub fn fill_u16(&self, kind: u16, out: &mut u16) {
        if let Some(v) = self.u16(kind) {
            *out = v;
        }
    }

    pub fn fill_u32(&self, kind: u16, out: &mut u32) {
        if let Some(v) = self.u32(kind) {
            *out = v;
        }
    }

    pub fn fill_u64(&self, kind: u16, out: &mut u64) {
        if let Some(v) = self.u64(kind) {
            *out = v;
        }
    }

    pub fn fill_string(&self, kind: u16, out: &mut String) {
        if let Some(v) = self.string(kind) {
            out.clear();
            out.push_str(v);
        }
    }
}

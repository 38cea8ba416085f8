//! Trusted-store records and their typed payloads.

use crate::error::{StoreError, StoreResult};
use spp_types::{ByteReader, ByteWriter, decode_string, encode_string};

/// Record kind as stored in the first field of every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlockKind {
    #[default]
    None,
    Named,
    Attribute,
    Timer,
    /// A kind this crate does not know, kept for round-tripping.
    Unknown(u32),
}

impl From<u32> for BlockKind {
    fn from(raw: u32) -> Self {
        match raw {
            0 => Self::None,
            1 => Self::Named,
            2 => Self::Attribute,
            3 => Self::Timer,
            other => Self::Unknown(other),
        }
    }
}

impl From<BlockKind> for u32 {
    fn from(kind: BlockKind) -> Self {
        match kind {
            BlockKind::None => 0,
            BlockKind::Named => 1,
            BlockKind::Attribute => 2,
            BlockKind::Timer => 3,
            BlockKind::Unknown(other) => other,
        }
    }
}

/// One record of a trusted store.
///
/// `key` is the owning group for keyed layouts and empty on Vista. `value`
/// identifies the record and is either an encoded string or a `u32`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    pub kind: BlockKind,
    pub flags: u32,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub data: Vec<u8>,
    /// Opaque field carried by the modern layout.
    pub reserved: u32,
}

impl Record {
    /// Creates a record whose value is a string.
    #[must_use]
    pub fn new(kind: BlockKind, key: &str, value: &str, data: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            key: encode_string(key),
            value: encode_string(value),
            data: data.into(),
            ..Self::default()
        }
    }

    /// Creates a record whose value is an integer.
    #[must_use]
    pub fn with_int_value(kind: BlockKind, key: &str, value: u32, data: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            key: encode_string(key),
            value: value.to_le_bytes().to_vec(),
            data: data.into(),
            ..Self::default()
        }
    }

    /// Sets the flags word.
    #[must_use]
    pub fn flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn key_str(&self) -> String {
        decode_string(&self.key)
    }

    #[must_use]
    pub fn value_str(&self) -> String {
        decode_string(&self.value)
    }

    /// The value read as an integer, if it is at least four bytes long.
    #[must_use]
    pub fn value_u32(&self) -> Option<u32> {
        le_u32(&self.value)
    }

    #[must_use]
    pub fn data_str(&self) -> String {
        decode_string(&self.data)
    }

    /// The data read as an integer, if it is at least four bytes long.
    #[must_use]
    pub fn data_u32(&self) -> Option<u32> {
        le_u32(&self.data)
    }
}

pub(crate) fn le_u32(bytes: &[u8]) -> Option<u32> {
    bytes
        .get(..4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Selects records by their `value` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueQuery<'a> {
    Str(&'a str),
    Int(u32),
}

impl ValueQuery<'_> {
    /// Exact match, used by get/set/delete.
    #[must_use]
    pub fn matches(&self, value: &[u8]) -> bool {
        match *self {
            Self::Str(s) => decode_string(value) == s,
            Self::Int(n) => le_u32(value) == Some(n),
        }
    }

    /// Search match: substring for strings, equality for integers.
    #[must_use]
    pub fn matches_search(&self, value: &[u8]) -> bool {
        match *self {
            Self::Str(s) => decode_string(value).contains(s),
            Self::Int(n) => le_u32(value) == Some(n),
        }
    }
}

impl<'a> From<&'a str> for ValueQuery<'a> {
    fn from(s: &'a str) -> Self {
        Self::Str(s)
    }
}

impl From<u32> for ValueQuery<'_> {
    fn from(n: u32) -> Self {
        Self::Int(n)
    }
}

/// Payload of a timer record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timer {
    pub unknown: u64,
    pub time1: u64,
    pub time2: u64,
    pub expiry: u64,
}

impl Timer {
    pub const SIZE: usize = 0x20;

    pub fn from_bytes(data: &[u8]) -> StoreResult<Self> {
        if data.len() != Self::SIZE {
            return Err(StoreError::PayloadSize {
                what: "timer",
                expected: Self::SIZE,
                actual: data.len(),
            });
        }
        let mut r = ByteReader::new(data);
        Ok(Self {
            unknown: r.read_u64()?,
            time1: r.read_u64()?,
            time2: r.read_u64()?,
            expiry: r.read_u64()?,
        })
    }

    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::with_capacity(Self::SIZE);
        for field in [self.unknown, self.time1, self.time2, self.expiry] {
            w.write_u64(field);
        }
        w.into_inner()
    }
}

/// Payload of a timer record on Vista.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VistaTimer {
    pub time: u64,
    pub expiry: u64,
}

impl VistaTimer {
    pub const SIZE: usize = 0x10;

    pub fn from_bytes(data: &[u8]) -> StoreResult<Self> {
        if data.len() != Self::SIZE {
            return Err(StoreError::PayloadSize {
                what: "Vista timer",
                expected: Self::SIZE,
                actual: data.len(),
            });
        }
        let mut r = ByteReader::new(data);
        Ok(Self {
            time: r.read_u64()?,
            expiry: r.read_u64()?,
        })
    }

    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::with_capacity(Self::SIZE);
        w.write_u64(self.time);
        w.write_u64(self.expiry);
        w.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_kind_raw_values() {
        for raw in 0..6 {
            assert_eq!(u32::from(BlockKind::from(raw)), raw);
        }
        assert_eq!(BlockKind::from(3), BlockKind::Timer);
        assert_eq!(BlockKind::from(9), BlockKind::Unknown(9));
    }

    #[test]
    fn short_value_never_matches_int() {
        assert!(!ValueQuery::Int(0).matches(&[0, 0]));
        assert!(ValueQuery::Int(7).matches(&[7, 0, 0, 0, 0xFF]));
    }

    #[test]
    fn string_search_is_substring() {
        let value = encode_string("msft:sl/timer/a");
        assert!(ValueQuery::Str("timer").matches_search(&value));
        assert!(!ValueQuery::Str("timer").matches(&value));
    }

    #[test]
    fn timer_layout() {
        let t = Timer {
            unknown: 1,
            time1: 2,
            time2: 3,
            expiry: 4,
        };
        let bytes = t.to_bytes();
        assert_eq!(bytes.len(), 32);
        assert_eq!(bytes[24], 4);
        assert_eq!(Timer::from_bytes(&bytes).unwrap(), t);
        assert!(Timer::from_bytes(&bytes[..16]).is_err());
    }
}

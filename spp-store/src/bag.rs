//! Variable bags: flat lists of typed, individually checksummed entries.
//!
//! Current layout (8-byte aligned, relative to the start of the bag):
//!
//! ```text
//! u32 crc | u32 type | u32 key_len | u32 value_len | key | pad | value | pad
//! ```
//!
//! The CRC covers `0 | type | key_len | value_len | key | value`.
//!
//! Legacy layout (unpadded):
//!
//! ```text
//! u32 type | u32 reserved | u32 key_len | u32 value_len | u32 crc(value) | key | value
//! ```

use crate::error::{StoreError, StoreResult};
use crate::record::le_u32;
use spp_types::{BagLayout, ByteReader, ByteWriter, PsVersion, crc32, decode_string, encode_string};
use tracing::debug;

const MIN_ENTRY_SIZE: usize = 0x10;

/// Type tag of a bag entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BagKind {
    Uint,
    String,
    Binary,
    Unknown(u32),
}

impl From<u32> for BagKind {
    fn from(raw: u32) -> Self {
        match raw {
            1 => Self::Uint,
            2 => Self::String,
            4 => Self::Binary,
            other => Self::Unknown(other),
        }
    }
}

impl From<BagKind> for u32 {
    fn from(kind: BagKind) -> Self {
        match kind {
            BagKind::Uint => 1,
            BagKind::String => 2,
            BagKind::Binary => 4,
            BagKind::Unknown(other) => other,
        }
    }
}

/// One key/value entry of a variable bag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BagEntry {
    pub kind: BagKind,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    /// Second header word of the legacy layout; written as-is.
    pub reserved: u32,
}

impl BagEntry {
    #[must_use]
    pub fn new(kind: BagKind, key: &str, value: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            key: encode_string(key),
            value: value.into(),
            reserved: 0,
        }
    }

    #[must_use]
    pub fn string(key: &str, value: &str) -> Self {
        Self::new(BagKind::String, key, encode_string(value))
    }

    #[must_use]
    pub fn uint(key: &str, value: u32) -> Self {
        Self::new(BagKind::Uint, key, value.to_le_bytes())
    }

    #[must_use]
    pub fn binary(key: &str, value: impl Into<Vec<u8>>) -> Self {
        Self::new(BagKind::Binary, key, value)
    }

    #[must_use]
    pub fn key_str(&self) -> String {
        decode_string(&self.key)
    }

    #[must_use]
    pub fn value_str(&self) -> String {
        decode_string(&self.value)
    }

    #[must_use]
    pub fn value_u32(&self) -> Option<u32> {
        le_u32(&self.value)
    }

    /// The checksum this entry carries in the given layout.
    #[must_use]
    pub fn checksum(&self, layout: BagLayout) -> u32 {
        match layout {
            BagLayout::Legacy => crc32(&self.value),
            BagLayout::Current => {
                let mut w = ByteWriter::with_capacity(0x10 + self.key.len() + self.value.len());
                w.write_u32(0);
                w.write_u32(self.kind.into());
                w.write_len(self.key.len());
                w.write_len(self.value.len());
                w.write_bytes(&self.key);
                w.write_bytes(&self.value);
                crc32(w.as_slice())
            }
        }
    }

    fn encode(&self, w: &mut ByteWriter, layout: BagLayout) {
        let crc = self.checksum(layout);
        match layout {
            BagLayout::Legacy => {
                w.write_u32(self.kind.into());
                w.write_u32(self.reserved);
                w.write_len(self.key.len());
                w.write_len(self.value.len());
                w.write_u32(crc);
                w.write_bytes(&self.key);
                w.write_bytes(&self.value);
            }
            BagLayout::Current => {
                w.write_u32(crc);
                w.write_u32(self.kind.into());
                w.write_len(self.key.len());
                w.write_len(self.value.len());
                w.write_bytes(&self.key);
                w.align(8);
                w.write_bytes(&self.value);
                w.align(8);
            }
        }
    }

    fn decode(r: &mut ByteReader<'_>, layout: BagLayout) -> StoreResult<Self> {
        let (entry, stored) = match layout {
            BagLayout::Legacy => {
                let kind = BagKind::from(r.read_u32()?);
                let reserved = r.read_u32()?;
                let key_len = r.read_u32()? as usize;
                let value_len = r.read_u32()? as usize;
                let crc = r.read_u32()?;
                let key = r.read_bytes(key_len)?.to_vec();
                let value = r.read_bytes(value_len)?.to_vec();
                let entry = Self {
                    kind,
                    key,
                    value,
                    reserved,
                };
                (entry, crc)
            }
            BagLayout::Current => {
                let crc = r.read_u32()?;
                let kind = BagKind::from(r.read_u32()?);
                let key_len = r.read_u32()? as usize;
                let value_len = r.read_u32()? as usize;
                let key = r.read_bytes(key_len)?.to_vec();
                r.align(8);
                let value = r.read_bytes(value_len)?.to_vec();
                r.align(8);
                let entry = Self {
                    kind,
                    key,
                    value,
                    reserved: 0,
                };
                (entry, crc)
            }
        };

        let computed = entry.checksum(layout);
        if computed != stored {
            return Err(StoreError::BagChecksum {
                key: entry.key_str(),
                stored,
                computed,
            });
        }
        Ok(entry)
    }
}

/// An ordered list of bag entries in one of the two layouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableBag {
    layout: BagLayout,
    entries: Vec<BagEntry>,
}

impl VariableBag {
    /// Creates an empty bag.
    #[must_use]
    pub fn new(layout: BagLayout) -> Self {
        Self {
            layout,
            entries: Vec::new(),
        }
    }

    /// Creates an empty bag in the layout `version` uses.
    #[must_use]
    pub fn for_version(version: PsVersion) -> Self {
        Self::new(version.bag_layout())
    }

    /// Decodes a bag, failing on the first entry whose CRC does not match.
    pub fn decode(data: &[u8], layout: BagLayout) -> StoreResult<Self> {
        let mut r = ByteReader::new(data);
        let mut entries = Vec::new();
        while r.position() < data.len().saturating_sub(MIN_ENTRY_SIZE) {
            entries.push(BagEntry::decode(&mut r, layout)?);
        }
        // a final header-only entry is kept when its CRC holds, otherwise
        // the tail is padding
        if r.remaining() == MIN_ENTRY_SIZE
            && let Ok(entry) = BagEntry::decode(&mut r.clone(), layout)
        {
            entries.push(entry);
        }
        debug!(?layout, len = data.len(), entries = entries.len(), "variable bag decoded");
        Ok(Self { layout, entries })
    }

    #[must_use]
    pub fn layout(&self) -> BagLayout {
        self.layout
    }

    #[must_use]
    pub fn entries(&self) -> &[BagEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry whose key equals `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&BagEntry> {
        self.entries.iter().find(|e| e.key_str() == key)
    }

    /// Replaces the value of the first entry named `key`. Returns false when
    /// there is no such entry.
    pub fn set(&mut self, key: &str, value: impl Into<Vec<u8>>) -> bool {
        match self.entries.iter_mut().find(|e| e.key_str() == key) {
            Some(entry) => {
                entry.value = value.into();
                true
            }
            None => false,
        }
    }

    /// Removes the first entry named `key`.
    pub fn delete(&mut self, key: &str) -> bool {
        match self.entries.iter().position(|e| e.key_str() == key) {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn push(&mut self, entry: BagEntry) {
        self.entries.push(entry);
    }

    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        for entry in &self.entries {
            entry.encode(&mut w, self.layout);
        }
        w.into_inner()
    }
}

impl Extend<BagEntry> for VariableBag {
    fn extend<I: IntoIterator<Item = BagEntry>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

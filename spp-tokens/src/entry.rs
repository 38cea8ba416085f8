//! Token entries and the key/value metadata stored in "xml" entries.

use crate::error::TokenResult;
use spp_types::{ByteReader, ByteWriter, decode_string, encode_string};

/// One directory slot of the token store.
///
/// An unpopulated entry with a name is a tombstone: the slot is reserved
/// but carries no content.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenEntry {
    pub name: String,
    pub extension: String,
    pub data: Vec<u8>,
    pub populated: bool,
}

impl TokenEntry {
    /// Creates a populated entry.
    #[must_use]
    pub fn new(name: impl Into<String>, extension: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            extension: extension.into(),
            data: data.into(),
            populated: true,
        }
    }

    /// Creates an unpopulated, named entry.
    #[must_use]
    pub fn tombstone(name: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extension: extension.into(),
            data: Vec::new(),
            populated: false,
        }
    }

    /// True for the anonymous slots that fill a block to capacity.
    #[must_use]
    pub fn is_padding(&self) -> bool {
        !self.populated && self.name.is_empty() && self.extension.is_empty()
    }

    pub(crate) fn matches(&self, name: &str, extension: &str) -> bool {
        self.name == name && self.extension == extension
    }
}

const META_MARKER: i32 = 1;

/// Named string map serialized into the content of an "xml" entry.
///
/// Despite the extension the payload is binary:
///
/// ```text
/// i32 1 | i32 name_len | name | (i32 key_len | i32 value_len | key | value)*
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenMeta {
    pub name: String,
    data: Vec<(String, String)>,
}

impl TokenMeta {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: Vec::new(),
        }
    }

    pub fn decode(bytes: &[u8]) -> TokenResult<Self> {
        let mut r = ByteReader::new(bytes);
        let _marker = r.read_i32()?;
        let name = decode_string(r.read_len_prefixed()?);
        let mut meta = Self::new(name);

        while r.position() < bytes.len().saturating_sub(8) {
            let key_len = r.read_u32()? as usize;
            let value_len = r.read_u32()? as usize;
            let key = decode_string(r.read_bytes(key_len)?);
            let value = decode_string(r.read_bytes(value_len)?);
            meta.insert(key, value);
        }
        Ok(meta)
    }

    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.write_i32(META_MARKER);
        let name = encode_string(&self.name);
        w.write_len(name.len());
        w.write_bytes(&name);
        for (key, value) in &self.data {
            let key = encode_string(key);
            let value = encode_string(value);
            w.write_len(key.len());
            w.write_len(value.len());
            w.write_bytes(&key);
            w.write_bytes(&value);
        }
        w.into_inner()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Sets `key`, keeping its original position if it already exists.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.data.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.data.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let idx = self.data.iter().position(|(k, _)| k == key)?;
        Some(self.data.remove(idx).1)
    }

    /// Key/value pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.data.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

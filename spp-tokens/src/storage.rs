//! Named-entry operations over a token store.

use crate::codec;
use crate::entry::{TokenEntry, TokenMeta};
use crate::error::TokenResult;

/// Extension of entries holding a [`TokenMeta`].
pub const META_EXTENSION: &str = "xml";

/// Operations on the entries of a token store, matched by name and extension.
pub trait TokenStorage {
    /// Appends an entry.
    fn add_entry(&mut self, entry: TokenEntry);

    /// Appends several entries in order.
    fn add_entries(&mut self, entries: Vec<TokenEntry>) {
        for entry in entries {
            self.add_entry(entry);
        }
    }

    /// Removes the first entry with this name and extension, populated or not.
    fn delete_entry(&mut self, name: &str, extension: &str) -> bool;

    /// Removes every tombstone with this name and extension; returns how many.
    fn delete_unpopulated(&mut self, name: &str, extension: &str) -> usize;

    /// First populated entry with this name and extension.
    fn get_entry(&self, name: &str, extension: &str) -> Option<&TokenEntry>;

    /// Reads the metadata entry `name`, purging its tombstones first. A
    /// missing entry yields an empty map.
    fn get_meta(&mut self, name: &str) -> TokenResult<TokenMeta> {
        self.delete_unpopulated(name, META_EXTENSION);
        match self.get_entry(name, META_EXTENSION) {
            Some(entry) => TokenMeta::decode(&entry.data),
            None => Ok(TokenMeta::new(name)),
        }
    }

    /// Writes `meta` back as its "xml" entry.
    fn set_meta(&mut self, meta: &TokenMeta) {
        self.set_entry(&meta.name, META_EXTENSION, meta.serialize());
    }

    /// Replaces the data of the first populated match, or appends a new
    /// populated entry.
    fn set_entry(&mut self, name: &str, extension: &str, data: Vec<u8>);

    /// Encodes the complete token store file.
    fn serialize(&self) -> Vec<u8>;
}

/// In-memory list of token entries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tokens {
    entries: Vec<TokenEntry>,
}

impl Tokens {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a token store file.
    pub fn decode(bytes: &[u8]) -> TokenResult<Self> {
        Ok(Self {
            entries: codec::decode(bytes)?,
        })
    }

    #[must_use]
    pub fn entries(&self) -> &[TokenEntry] {
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
}

impl TokenStorage for Tokens {
    fn add_entry(&mut self, entry: TokenEntry) {
        self.entries.push(entry);
    }

    fn delete_entry(&mut self, name: &str, extension: &str) -> bool {
        match self.entries.iter().position(|e| e.matches(name, extension)) {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }

    fn delete_unpopulated(&mut self, name: &str, extension: &str) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|e| e.populated || !e.matches(name, extension));
        before - self.entries.len()
    }

    fn get_entry(&self, name: &str, extension: &str) -> Option<&TokenEntry> {
        self.entries
            .iter()
            .find(|e| e.populated && e.matches(name, extension))
    }

    fn set_entry(&mut self, name: &str, extension: &str, data: Vec<u8>) {
        match self
            .entries
            .iter_mut()
            .find(|e| e.populated && e.matches(name, extension))
        {
            Some(entry) => entry.data = data,
            None => self.entries.push(TokenEntry::new(name, extension, data)),
        }
    }

    fn serialize(&self) -> Vec<u8> {
        codec::encode(&self.entries)
    }
}

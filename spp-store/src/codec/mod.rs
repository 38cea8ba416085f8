//! Trusted-store record codecs, one per layout.
//!
//! Every layout starts with an 8-byte pre-header carried verbatim. Bytes
//! left over after the last record the layout knows how to read are kept as
//! an opaque trailer and written back unchanged.

mod modern;
mod vista;
mod win7;

pub use modern::ModernStore;
pub use vista::VistaStore;
pub use win7::Win7Store;

use crate::error::StoreResult;
use crate::record::{Record, ValueQuery};
use spp_types::{ByteReader, PsVersion, StoreLayout};

/// Size of the opaque prefix of every record payload.
pub const PRE_HEADER_SIZE: usize = 8;

/// Flat layouts stop reading records once this many bytes or fewer remain,
/// so new flat stores start with a zeroed trailer of this size.
pub const FLAT_TRAILER_SIZE: usize = 0x14;

/// Operations shared by every trusted-store layout.
///
/// `get`, `set` and `delete` act on the first record matching `key` and
/// `value`; layouts without keys ignore `key`. Absence is never an error.
pub trait PhysicalStore {
    /// Returns a copy of the first matching record.
    fn get(&self, key: &str, value: ValueQuery<'_>) -> Option<Record>;

    /// Replaces the data of the first matching record in place. Returns
    /// false if nothing matched.
    fn set(&mut self, key: &str, value: ValueQuery<'_>, data: Vec<u8>) -> bool;

    /// Removes the first matching record. Returns false if nothing matched.
    fn delete(&mut self, key: &str, value: ValueQuery<'_>) -> bool;

    /// Appends a record.
    fn add(&mut self, record: Record);

    /// Appends several records in order.
    fn add_all(&mut self, records: Vec<Record>) {
        for record in records {
            self.add(record);
        }
    }

    /// Returns every record whose value matches the search, across all keys.
    fn find(&self, value: ValueQuery<'_>) -> Vec<Record>;

    /// Returns every record in storage order.
    fn records(&self) -> Vec<Record>;

    /// Encodes the plaintext record payload.
    fn serialize(&self) -> Vec<u8>;
}

/// Reads the pre-header and the records of a flat layout.
pub(crate) fn decode_flat(
    data: &[u8],
    mut decode_record: impl FnMut(&mut ByteReader<'_>) -> StoreResult<Record>,
) -> StoreResult<([u8; PRE_HEADER_SIZE], Vec<Record>, Vec<u8>)> {
    let mut r = ByteReader::new(data);
    let pre_header = r.read_array()?;
    let mut records = Vec::new();
    while r.position() < data.len().saturating_sub(FLAT_TRAILER_SIZE) {
        records.push(decode_record(&mut r)?);
        r.align(4);
    }
    let trailer = r.read_rest().to_vec();
    Ok((pre_header, records, trailer))
}

/// A decoded trusted store of any layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Container {
    Vista(VistaStore),
    Win7(Win7Store),
    Modern(ModernStore),
}

impl Container {
    /// Creates an empty container in the layout `version` uses.
    #[must_use]
    pub fn new(version: PsVersion) -> Self {
        match version.store_layout() {
            StoreLayout::Vista => Self::Vista(VistaStore::default()),
            StoreLayout::Win7 => Self::Win7(Win7Store::default()),
            StoreLayout::Modern => Self::Modern(ModernStore::default()),
        }
    }

    /// Decodes a plaintext record payload in the layout `version` uses.
    pub fn decode(data: &[u8], version: PsVersion) -> StoreResult<Self> {
        Ok(match version.store_layout() {
            StoreLayout::Vista => Self::Vista(VistaStore::decode(data)?),
            StoreLayout::Win7 => Self::Win7(Win7Store::decode(data)?),
            StoreLayout::Modern => Self::Modern(ModernStore::decode(data)?),
        })
    }

    #[must_use]
    pub fn layout(&self) -> StoreLayout {
        match self {
            Self::Vista(_) => StoreLayout::Vista,
            Self::Win7(_) => StoreLayout::Win7,
            Self::Modern(_) => StoreLayout::Modern,
        }
    }

    fn inner(&self) -> &dyn PhysicalStore {
        match self {
            Self::Vista(s) => s,
            Self::Win7(s) => s,
            Self::Modern(s) => s,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn PhysicalStore {
        match self {
            Self::Vista(s) => s,
            Self::Win7(s) => s,
            Self::Modern(s) => s,
        }
    }
}

impl PhysicalStore for Container {
    fn get(&self, key: &str, value: ValueQuery<'_>) -> Option<Record> {
        self.inner().get(key, value)
    }

    fn set(&mut self, key: &str, value: ValueQuery<'_>, data: Vec<u8>) -> bool {
        self.inner_mut().set(key, value, data)
    }

    fn delete(&mut self, key: &str, value: ValueQuery<'_>) -> bool {
        self.inner_mut().delete(key, value)
    }

    fn add(&mut self, record: Record) {
        self.inner_mut().add(record);
    }

    fn find(&self, value: ValueQuery<'_>) -> Vec<Record> {
        self.inner().find(value)
    }

    fn records(&self) -> Vec<Record> {
        self.inner().records()
    }

    fn serialize(&self) -> Vec<u8> {
        self.inner().serialize()
    }
}

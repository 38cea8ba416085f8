//! Layout B: a flat record list where every record names its key.
//!
//! ```text
//! u32 kind | u32 flags | u32 key_len | u32 value_len | u32 data_len | key | value | data | pad4
//! ```

use super::{FLAT_TRAILER_SIZE, PRE_HEADER_SIZE, PhysicalStore, decode_flat};
use crate::error::StoreResult;
use crate::record::{Record, ValueQuery};
use spp_types::{ByteReader, ByteWriter, decode_string};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Win7Store {
    pub pre_header: [u8; PRE_HEADER_SIZE],
    records: Vec<Record>,
    /// Reserved tail. Records only round-trip while this stays
    /// [`FLAT_TRAILER_SIZE`] bytes or longer.
    pub trailer: Vec<u8>,
}

impl Default for Win7Store {
    fn default() -> Self {
        Self {
            pre_header: [0; PRE_HEADER_SIZE],
            records: Vec::new(),
            trailer: vec![0; FLAT_TRAILER_SIZE],
        }
    }
}

impl Win7Store {
    pub fn decode(data: &[u8]) -> StoreResult<Self> {
        let (pre_header, records, trailer) = decode_flat(data, decode_record)?;
        debug!(records = records.len(), trailer = trailer.len(), "win7 store decoded");
        Ok(Self {
            pre_header,
            records,
            trailer,
        })
    }

    fn position(&self, key: &str, value: ValueQuery<'_>) -> Option<usize> {
        self.records
            .iter()
            .position(|r| decode_string(&r.key) == key && value.matches(&r.value))
    }
}

fn decode_record(r: &mut ByteReader<'_>) -> StoreResult<Record> {
    let kind = r.read_u32()?.into();
    let flags = r.read_u32()?;
    let key_len = r.read_u32()? as usize;
    let value_len = r.read_u32()? as usize;
    let data_len = r.read_u32()? as usize;
    Ok(Record {
        kind,
        flags,
        key: r.read_bytes(key_len)?.to_vec(),
        value: r.read_bytes(value_len)?.to_vec(),
        data: r.read_bytes(data_len)?.to_vec(),
        reserved: 0,
    })
}

impl PhysicalStore for Win7Store {
    fn get(&self, key: &str, value: ValueQuery<'_>) -> Option<Record> {
        self.position(key, value).map(|i| self.records[i].clone())
    }

    fn set(&mut self, key: &str, value: ValueQuery<'_>, data: Vec<u8>) -> bool {
        match self.position(key, value) {
            Some(i) => {
                self.records[i].data = data;
                true
            }
            None => false,
        }
    }

    fn delete(&mut self, key: &str, value: ValueQuery<'_>) -> bool {
        match self.position(key, value) {
            Some(i) => {
                self.records.remove(i);
                true
            }
            None => false,
        }
    }

    fn add(&mut self, record: Record) {
        self.records.push(Record {
            reserved: 0,
            ..record
        });
    }

    fn find(&self, value: ValueQuery<'_>) -> Vec<Record> {
        self.records
            .iter()
            .filter(|r| value.matches_search(&r.value))
            .cloned()
            .collect()
    }

    fn records(&self) -> Vec<Record> {
        self.records.clone()
    }

    fn serialize(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.write_bytes(&self.pre_header);
        for record in &self.records {
            w.write_u32(record.kind.into());
            w.write_u32(record.flags);
            w.write_len(record.key.len());
            w.write_len(record.value.len());
            w.write_len(record.data.len());
            w.write_bytes(&record.key);
            w.write_bytes(&record.value);
            w.write_bytes(&record.data);
            w.align(4);
        }
        w.write_bytes(&self.trailer);
        w.into_inner()
    }
}

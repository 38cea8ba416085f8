//! Layout C: records grouped under string keys.
//!
//! ```text
//! u32 group_count
//! per group:  u32 key_len | key | u32 record_count | pad4
//! per record: u32 kind | u32 flags | u32 value_len | u32 data_len | u32 reserved
//!             | value | data | pad4
//! ```

use super::{PRE_HEADER_SIZE, PhysicalStore};
use crate::error::StoreResult;
use crate::record::{Record, ValueQuery};
use spp_types::{ByteReader, ByteWriter, decode_string};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Group {
    key: Vec<u8>,
    name: String,
    records: Vec<Record>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModernStore {
    pub pre_header: [u8; PRE_HEADER_SIZE],
    groups: Vec<Group>,
    pub trailer: Vec<u8>,
}

impl ModernStore {
    pub fn decode(data: &[u8]) -> StoreResult<Self> {
        let mut r = ByteReader::new(data);
        let pre_header = r.read_array()?;
        let mut groups = Vec::new();

        if r.remaining() >= 4 {
            let count = r.read_u32()?;
            for _ in 0..count {
                let key = r.read_len_prefixed()?.to_vec();
                let record_count = r.read_u32()?;
                r.align(4);

                let mut records = Vec::new();
                for _ in 0..record_count {
                    records.push(decode_record(&mut r, &key)?);
                    r.align(4);
                }
                groups.push(Group {
                    name: decode_string(&key),
                    key,
                    records,
                });
            }
        }

        let trailer = r.read_rest().to_vec();
        debug!(groups = groups.len(), trailer = trailer.len(), "modern store decoded");
        Ok(Self {
            pre_header,
            groups,
            trailer,
        })
    }

    /// Names of all groups in storage order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.groups.iter().map(|g| g.name.clone()).collect()
    }

    fn group(&self, key: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == key)
    }

    fn group_mut(&mut self, key: &str) -> Option<&mut Group> {
        self.groups.iter_mut().find(|g| g.name == key)
    }

    fn locate(&mut self, key: &str, value: ValueQuery<'_>) -> Option<(&mut Group, usize)> {
        let group = self.group_mut(key)?;
        let idx = group.records.iter().position(|r| value.matches(&r.value))?;
        Some((group, idx))
    }
}

fn decode_record(r: &mut ByteReader<'_>, key: &[u8]) -> StoreResult<Record> {
    let kind = r.read_u32()?.into();
    let flags = r.read_u32()?;
    let value_len = r.read_u32()? as usize;
    let data_len = r.read_u32()? as usize;
    let reserved = r.read_u32()?;
    Ok(Record {
        kind,
        flags,
        key: key.to_vec(),
        value: r.read_bytes(value_len)?.to_vec(),
        data: r.read_bytes(data_len)?.to_vec(),
        reserved,
    })
}

impl PhysicalStore for ModernStore {
    fn get(&self, key: &str, value: ValueQuery<'_>) -> Option<Record> {
        self.group(key)?
            .records
            .iter()
            .find(|r| value.matches(&r.value))
            .cloned()
    }

    fn set(&mut self, key: &str, value: ValueQuery<'_>, data: Vec<u8>) -> bool {
        match self.locate(key, value) {
            Some((group, idx)) => {
                group.records[idx].data = data;
                true
            }
            None => false,
        }
    }

    fn delete(&mut self, key: &str, value: ValueQuery<'_>) -> bool {
        match self.locate(key, value) {
            Some((group, idx)) => {
                group.records.remove(idx);
                true
            }
            None => false,
        }
    }

    fn add(&mut self, record: Record) {
        let name = record.key_str();
        match self.group_mut(&name) {
            Some(group) => {
                let key = group.key.clone();
                group.records.push(Record { key, ..record });
            }
            None => self.groups.push(Group {
                key: record.key.clone(),
                name,
                records: vec![record],
            }),
        }
    }

    fn find(&self, value: ValueQuery<'_>) -> Vec<Record> {
        self.groups
            .iter()
            .flat_map(|g| g.records.iter())
            .filter(|r| value.matches_search(&r.value))
            .cloned()
            .collect()
    }

    fn records(&self) -> Vec<Record> {
        self.groups
            .iter()
            .flat_map(|g| g.records.iter().cloned())
            .collect()
    }

    fn serialize(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.write_bytes(&self.pre_header);
        w.write_len(self.groups.len());
        for group in &self.groups {
            w.write_len(group.key.len());
            w.write_bytes(&group.key);
            w.write_len(group.records.len());
            w.align(4);
            for record in &group.records {
                w.write_u32(record.kind.into());
                w.write_u32(record.flags);
                w.write_len(record.value.len());
                w.write_len(record.data.len());
                w.write_u32(record.reserved);
                w.write_bytes(&record.value);
                w.write_bytes(&record.data);
                w.align(4);
            }
        }
        w.write_bytes(&self.trailer);
        w.into_inner()
    }
}

//! Token store file format.
//!
//! ```text
//! 0x00  u32       version (3)
//! 0x04  [u8; 32]  SHA-256 over bytes[0..4] ++ bytes[0x24..]
//! 0x24  block, contents, block, contents, ...
//! ```
//!
//! A block is 0x4020 bytes: `u32 self | u32 next`, 103 directory slots,
//! zero padding, then the SHA-256 of its first 0x4000 bytes. The contents
//! of a block's populated slots follow it directly; the next block starts
//! after the last content. `next` is zero in the final block.

use crate::entry::TokenEntry;
use crate::error::{TokenError, TokenResult};
use spp_crypto::digest::{SHA256_SIZE, sha256, sha256_concat};
use spp_types::{ByteReader, ByteWriter, decode_fixed_utf16, encode_fixed_utf16};
use tracing::debug;

pub const VERSION: u32 = 3;

pub const BLOCK_SIZE: usize = 0x4020;
pub const ENTRY_SIZE: usize = 0x9E;
pub const ENTRIES_PER_BLOCK: usize = BLOCK_SIZE / ENTRY_SIZE;

const FIRST_BLOCK: usize = 0x24;
const BLOCK_HEADER_SIZE: usize = 8;
const BLOCK_PAD_SIZE: usize = 0x66;
const BLOCK_HASHED_SIZE: usize = BLOCK_SIZE - SHA256_SIZE;

const SLOT_HEADER_SIZE: usize = 0x14;
const NAME_SIZE: usize = 0x82;
const EXTENSION_SIZE: usize = 0x8;

const CONTENT_HEADER: [u8; 0x20] = [0x55; 0x20];
const CONTENT_FOOTER: [u8; 0x20] = [0xAA; 0x20];

/// Encodes entries into a complete token store file.
///
/// Slots are written in order and the last block is filled with padding
/// slots, so the output always holds `(n / 103 + 1) * 103` slots.
#[must_use]
pub fn encode(entries: &[TokenEntry]) -> Vec<u8> {
    let mut w = ByteWriter::new();
    w.write_u32(VERSION);
    w.write_bytes(&CONTENT_HEADER);

    let padding = TokenEntry::default();
    let total = (entries.len() / ENTRIES_PER_BLOCK + 1) * ENTRIES_PER_BLOCK;

    let mut block = FIRST_BLOCK;
    let mut slot = block + BLOCK_HEADER_SIZE;
    let mut content = block + BLOCK_SIZE;

    for i in 0..total {
        let entry = entries.get(i).unwrap_or(&padding);

        if i % ENTRIES_PER_BLOCK == 0 {
            w.seek(block);
            w.write_len(block);
            w.write_u32(0);
        }

        w.seek(slot);
        w.write_len(slot);
        if entry.populated {
            w.write_u32(1);
            w.write_len(content);
            w.write_len(entry.data.len());
            w.write_len(entry.data.len());
        } else {
            w.write_u32(0);
            w.write_u32(0);
            w.write_i32(-1);
            w.write_i32(-1);
        }
        w.write_bytes(&encode_fixed_utf16(&entry.name, NAME_SIZE));
        w.write_bytes(&encode_fixed_utf16(&entry.extension, EXTENSION_SIZE));
        slot = w.position();

        if entry.populated {
            w.seek(content);
            w.write_bytes(&CONTENT_HEADER);
            w.write_len(entry.data.len());
            w.write_bytes(&sha256(&entry.data));
            w.write_bytes(&entry.data);
            w.write_bytes(&CONTENT_FOOTER);
            content = w.position();
        }

        if (i + 1) % ENTRIES_PER_BLOCK == 0 {
            if i < entries.len() {
                w.seek(block + 4);
                w.write_len(content);
            }
            w.seek(slot);
            w.write_zeros(BLOCK_PAD_SIZE);

            w.seek(block + BLOCK_HASHED_SIZE);
            w.write_zeros(SHA256_SIZE);
            let hash = sha256(&w.as_slice()[block..block + BLOCK_HASHED_SIZE]);
            w.seek(block + BLOCK_HASHED_SIZE);
            w.write_bytes(&hash);

            block = content;
            slot = block + BLOCK_HEADER_SIZE;
            content = block + BLOCK_SIZE;
        }
    }

    w.truncate(block);
    let mut bytes = w.into_inner();
    let digest = sha256_concat(&[&bytes[..4], &bytes[FIRST_BLOCK..]]);
    bytes[4..FIRST_BLOCK].copy_from_slice(&digest);

    debug!(entries = entries.len(), slots = total, len = bytes.len(), "token store encoded");
    bytes
}

/// Decodes every entry of a token store, following the block chain.
///
/// Files shorter than one block decode as empty. Padding slots are dropped;
/// tombstones are kept.
pub fn decode(bytes: &[u8]) -> TokenResult<Vec<TokenEntry>> {
    let mut entries = Vec::new();
    if bytes.len() < BLOCK_SIZE {
        return Ok(entries);
    }

    let mut r = ByteReader::new(bytes);
    let mut block = FIRST_BLOCK;
    loop {
        r.seek(block)?;
        let _self_offset = r.read_u32()?;
        let next = r.read_u32()? as usize;

        for _ in 0..ENTRIES_PER_BLOCK {
            let slot = r.read_u32()? as usize;
            let populated = r.read_u32()? == 1;
            let content = r.read_u32()? as usize;
            let declared = r.read_u32()?;
            let _allocated = r.read_u32()?;

            let mut data = Vec::new();
            if populated {
                let offset = content + CONTENT_HEADER.len();
                r.seek(offset)?;
                let stored = r.read_u32()?;
                if stored != declared {
                    return Err(TokenError::LengthMismatch {
                        offset,
                        declared,
                        content: stored,
                    });
                }
                r.skip(SHA256_SIZE)?;
                data = r.read_bytes(declared as usize)?.to_vec();
            }

            r.seek(slot + SLOT_HEADER_SIZE)?;
            let entry = TokenEntry {
                name: decode_fixed_utf16(r.read_bytes(NAME_SIZE)?),
                extension: decode_fixed_utf16(r.read_bytes(EXTENSION_SIZE)?),
                data,
                populated,
            };
            if !entry.is_padding() {
                entries.push(entry);
            }
        }

        if next == 0 {
            break;
        }
        if next <= block {
            return Err(TokenError::BrokenChain { block, next });
        }
        block = next;
    }

    debug!(entries = entries.len(), len = bytes.len(), "token store decoded");
    Ok(entries)
}

/// Checks the whole-file digest and the hash of every block in the chain.
pub fn verify(bytes: &[u8]) -> TokenResult<()> {
    let mut r = ByteReader::new(bytes);
    r.seek(FIRST_BLOCK)?;
    let expected = sha256_concat(&[&bytes[..4], &bytes[FIRST_BLOCK..]]);
    if bytes[4..FIRST_BLOCK] != expected {
        return Err(TokenError::DigestMismatch);
    }

    let mut block = FIRST_BLOCK;
    loop {
        r.seek(block)?;
        let hashed = r.read_bytes(BLOCK_HASHED_SIZE)?;
        let stored = r.read_bytes(SHA256_SIZE)?;
        if sha256(hashed) != stored {
            return Err(TokenError::BlockHashMismatch { offset: block });
        }

        r.seek(block + 4)?;
        let next = r.read_u32()? as usize;
        if next == 0 {
            return Ok(());
        }
        if next <= block {
            return Err(TokenError::BrokenChain { block, next });
        }
        block = next;
    }
}

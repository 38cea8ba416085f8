//! CRC-32 as computed by the licensing service.
//!
//! This is the non-reflected variant (polynomial 0x04C11DB7, initial value
//! and final XOR 0xFFFFFFFF), not the zlib one.

use crc::{CRC_32_BZIP2, Crc};

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_BZIP2);

/// Computes the CRC-32 of `data`.
#[must_use]
pub fn crc32(data: &[u8]) -> u32 {
    CRC32.checksum(data)
}

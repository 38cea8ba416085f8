//! Shared primitives for the licensing store codecs.
//!
//! This crate defines the plumbing every on-disk format in the workspace
//! relies on:
//! - Product-version families (`PsVersion`) and the layout each one selects
//! - A bounds-checked little-endian reader and a seekable writer
//! - UTF-16LE string encodings (NUL-terminated and fixed-width)
//! - The MSB-first CRC-32 used by variable bags and product keys
//! - GUIDs in Windows mixed-endian byte order

mod binary;
mod checksum;
mod guid;
mod strings;
mod version;

pub use binary::{ByteReader, ByteWriter};
pub use checksum::crc32;
pub use guid::Guid;
pub use strings::{
    decode_fixed_utf16, decode_string, encode_fixed_ascii, encode_fixed_utf16, encode_string,
};
pub use version::{BagLayout, PsVersion, StoreLayout};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while reading or writing binary layouts.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A read ran past the end of the buffer.
    #[error("unexpected end of data: needed {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A seek targeted a position beyond the buffer.
    #[error("offset {offset} is outside of a {len}-byte buffer")]
    OutOfBounds { offset: usize, len: usize },

    /// A GUID string did not parse.
    #[error("invalid GUID: {0}")]
    InvalidGuid(#[from] uuid::Error),

    /// A version name matched no known product release.
    #[error("unknown product version: {0}")]
    UnknownVersion(String),
}

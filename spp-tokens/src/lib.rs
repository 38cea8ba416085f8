//! Token store: a hash-chained block file of named entries.
//!
//! Entries are addressed by name and extension. Entries with the "xml"
//! extension conventionally hold a [`TokenMeta`] string map. Every block
//! carries its own SHA-256 and the file carries a digest over everything
//! but the digest itself; see [`codec`] for the layout.

pub mod codec;
mod entry;
mod error;
mod file;
mod storage;

pub use codec::{decode, encode, verify};
pub use entry::{TokenEntry, TokenMeta};
pub use error::{TokenError, TokenResult};
pub use file::TokenStore;
pub use storage::{META_EXTENSION, TokenStorage, Tokens};

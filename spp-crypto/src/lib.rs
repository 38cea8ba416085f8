//! Envelope cryptography for licensing trusted stores.
//!
//! A trusted store is sealed in three layers:
//! 1. RSA-1024: a signature over, and encryption of, the symmetric key
//! 2. AES-128-CBC (zero IV, PKCS#7) over the whole inner blob
//! 3. An integrity tag over the record payload, keyed by a random
//!    per-write key stored alongside it (HMAC-SHA1, or salted SHA-1 on Vista)
//!
//! The hash primitives here are shared with the token store.

mod cipher;
pub mod digest;
mod envelope;
mod error;
mod key;

pub use cipher::{AES_KEY_SIZE, decrypt, encrypt};
pub use envelope::{
    ENVELOPE_PREFIX_SIZE, HEADER_SIZE, IntegrityPolicy, STORE_MAGIC, envelope_tag,
    integrity_tag, unwrap, wrap,
};
pub use error::{CryptoError, CryptoResult};
pub use key::{
    INTEGRITY_KEY_SIZE, IntegrityKey, KeyRing, KeyRingConfig, KeySet, RSA_BLOCK_SIZE, StoreKey,
};

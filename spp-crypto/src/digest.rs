//! Hash and MAC primitives shared by the store formats.

use crate::error::{CryptoError, CryptoResult};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Digest, Sha256};

/// Size of an HMAC-SHA1 or salted SHA-1 tag.
pub const SHA1_TAG_SIZE: usize = 0x14;

/// Size of a SHA-256 digest.
pub const SHA256_SIZE: usize = 0x20;

type HmacSha1 = Hmac<Sha1>;

/// Computes HMAC-SHA1 of `data` under `key`.
pub fn hmac_sha1(key: &[u8], data: &[u8]) -> CryptoResult<[u8; SHA1_TAG_SIZE]> {
    let mut mac = HmacSha1::new_from_slice(key)
        .map_err(|e| CryptoError::Encryption(format!("invalid HMAC key: {e}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().into())
}

/// Checks an HMAC-SHA1 tag in constant time.
pub fn hmac_sha1_verify(key: &[u8], data: &[u8], tag: &[u8]) -> CryptoResult<bool> {
    let mut mac = HmacSha1::new_from_slice(key)
        .map_err(|e| CryptoError::Decryption(format!("invalid HMAC key: {e}")))?;
    mac.update(data);
    Ok(mac.verify_slice(tag).is_ok())
}

/// Computes SHA-1 over `salt || data`.
#[must_use]
pub fn salted_sha1(salt: &[u8], data: &[u8]) -> [u8; SHA1_TAG_SIZE] {
    let mut hasher = Sha1::new();
    hasher.update(salt);
    hasher.update(data);
    hasher.finalize().into()
}

/// Computes SHA-1 of `data`.
#[must_use]
pub fn sha1(data: &[u8]) -> [u8; SHA1_TAG_SIZE] {
    Sha1::digest(data).into()
}

/// Computes SHA-256 of `data`.
#[must_use]
pub fn sha256(data: &[u8]) -> [u8; SHA256_SIZE] {
    Sha256::digest(data).into()
}

/// Computes SHA-256 over several slices as if they were concatenated.
#[must_use]
pub fn sha256_concat(parts: &[&[u8]]) -> [u8; SHA256_SIZE] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

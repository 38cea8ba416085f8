//! The outer envelope of a trusted-store file.
//!
//! ```text
//! 0x000  u32        version tag
//! 0x004  [u8; 12]   "UNTRUSTSTORE"
//! 0x010  [u8; 0x80] RSA signature over the wrapped AES key
//! 0x090  [u8; 0x80] RSA-wrapped AES key
//! 0x110  ...        AES-128-CBC(integrity key | tag | reserved | payload)
//! ```
//!
//! The AES key is a constant; only the integrity key changes per write.

use crate::cipher::{self, AES_KEY_SIZE};
use crate::digest::{SHA1_TAG_SIZE, hmac_sha1, hmac_sha1_verify, salted_sha1};
use crate::error::{CryptoError, CryptoResult};
use crate::key::{INTEGRITY_KEY_SIZE, IntegrityKey, RSA_BLOCK_SIZE, StoreKey};
use serde::{Deserialize, Serialize};
use spp_types::{ByteWriter, PsVersion};
use tracing::{debug, warn};

/// Literal following the version tag.
pub const STORE_MAGIC: &[u8; 12] = b"UNTRUSTSTORE";

/// Size of the version tag plus magic.
pub const HEADER_SIZE: usize = 0x10;

/// Bytes before the symmetric blob begins.
pub const ENVELOPE_PREFIX_SIZE: usize = HEADER_SIZE + 2 * RSA_BLOCK_SIZE;

const SYMMETRIC_KEY: [u8; AES_KEY_SIZE] = *b"spp-store shared";

const TAG_OFFSET: usize = INTEGRITY_KEY_SIZE;
const RESERVED_OFFSET: usize = TAG_OFFSET + SHA1_TAG_SIZE;
const PAYLOAD_OFFSET: usize = RESERVED_OFFSET + 4;

/// What to do when the payload integrity tag does not match.
///
/// A bad RSA signature is always fatal; this only governs the inner tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrityPolicy {
    /// Fail with [`CryptoError::IntegrityMismatch`].
    #[default]
    Strict,
    /// Log a warning and return the payload anyway.
    Warn,
}

/// Computes the payload tag the given version expects: salted SHA-1 on
/// Vista, HMAC-SHA1 everywhere else.
pub fn integrity_tag(
    version: PsVersion,
    key: &IntegrityKey,
    payload: &[u8],
) -> CryptoResult<[u8; SHA1_TAG_SIZE]> {
    match version {
        PsVersion::Vista => Ok(salted_sha1(key.as_bytes(), payload)),
        _ => hmac_sha1(key.as_bytes(), payload),
    }
}

fn tag_matches(version: PsVersion, key: &[u8], payload: &[u8], tag: &[u8]) -> CryptoResult<bool> {
    match version {
        PsVersion::Vista => Ok(salted_sha1(key, payload).as_slice() == tag),
        _ => hmac_sha1_verify(key, payload, tag),
    }
}

fn algorithm_name(version: PsVersion) -> &'static str {
    match version {
        PsVersion::Vista => "salted SHA-1",
        _ => "HMAC-SHA1",
    }
}

/// Reads the version tag of an encrypted store without decrypting it.
#[must_use]
pub fn envelope_tag(file: &[u8]) -> Option<u32> {
    file.get(..4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Opens an encrypted store and returns the plaintext record payload.
pub fn unwrap(
    file: &[u8],
    key: &StoreKey,
    version: PsVersion,
    policy: IntegrityPolicy,
) -> CryptoResult<Vec<u8>> {
    if file.len() < ENVELOPE_PREFIX_SIZE {
        return Err(CryptoError::Truncated {
            expected: ENVELOPE_PREFIX_SIZE,
            actual: file.len(),
        });
    }

    let signature = &file[HEADER_SIZE..HEADER_SIZE + RSA_BLOCK_SIZE];
    let wrapped_key = &file[HEADER_SIZE + RSA_BLOCK_SIZE..ENVELOPE_PREFIX_SIZE];

    if !key.verify(wrapped_key, signature) {
        return Err(CryptoError::SignatureInvalid);
    }

    let aes_key = key.decrypt(wrapped_key)?;
    let blob = cipher::decrypt(&aes_key, &file[ENVELOPE_PREFIX_SIZE..])?;
    if blob.len() < PAYLOAD_OFFSET {
        return Err(CryptoError::Truncated {
            expected: PAYLOAD_OFFSET,
            actual: blob.len(),
        });
    }

    let integrity_key = &blob[..TAG_OFFSET];
    let tag = &blob[TAG_OFFSET..RESERVED_OFFSET];
    let payload = &blob[PAYLOAD_OFFSET..];

    if !tag_matches(version, integrity_key, payload, tag)? {
        let algorithm = algorithm_name(version);
        match policy {
            IntegrityPolicy::Strict => return Err(CryptoError::IntegrityMismatch { algorithm }),
            IntegrityPolicy::Warn => {
                warn!(%version, algorithm, "store payload failed integrity check, continuing");
            }
        }
    }

    debug!(%version, file_len = file.len(), payload_len = payload.len(), "store envelope opened");
    Ok(payload.to_vec())
}

/// Seals a plaintext record payload into an encrypted store.
pub fn wrap(payload: &[u8], key: &StoreKey, version: PsVersion) -> CryptoResult<Vec<u8>> {
    let integrity_key = IntegrityKey::random();
    let tag = integrity_tag(version, &integrity_key, payload)?;

    let mut plain = ByteWriter::with_capacity(PAYLOAD_OFFSET + payload.len());
    plain.write_bytes(integrity_key.as_bytes());
    plain.write_bytes(&tag);
    plain.write_u32(0);
    plain.write_bytes(payload);
    let blob = cipher::encrypt(&SYMMETRIC_KEY, plain.as_slice())?;

    let wrapped_key = key.encrypt(&SYMMETRIC_KEY)?;
    let signature = key.sign(&wrapped_key)?;

    let mut out = ByteWriter::with_capacity(ENVELOPE_PREFIX_SIZE + blob.len());
    out.write_u32(version.envelope_tag());
    out.write_bytes(STORE_MAGIC);
    out.write_bytes(&signature);
    out.write_bytes(&wrapped_key);
    out.write_bytes(&blob);

    debug!(%version, payload_len = payload.len(), file_len = out.len(), "store envelope sealed");
    Ok(out.into_inner())
}

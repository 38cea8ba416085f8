//! Error types for the envelope layer.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur while wrapping or unwrapping a store.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The file is too short to hold the fixed envelope header.
    #[error("envelope truncated: {actual} bytes, need at least {expected}")]
    Truncated { expected: usize, actual: usize },

    /// The RSA signature over the wrapped key did not verify.
    #[error("failed to decrypt store: key signature invalid")]
    SignatureInvalid,

    /// Symmetric or asymmetric decryption failed.
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Symmetric or asymmetric encryption failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// The integrity tag over the payload did not match.
    #[error("payload integrity check failed ({algorithm} mismatch)")]
    IntegrityMismatch { algorithm: &'static str },

    /// A CryptoAPI key blob could not be parsed.
    #[error("invalid key blob: {0}")]
    InvalidKeyBlob(String),

    /// The RSA modulus is not the 1024 bits the envelope layout requires.
    #[error("unsupported RSA key size: {bits} bits (expected 1024)")]
    UnsupportedKeySize { bits: usize },

    /// Reading key material from disk failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

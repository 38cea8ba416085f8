//! Error types for the store layer.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while decoding, encoding or persisting a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record payload is structurally malformed.
    #[error("malformed store data: {0}")]
    Format(#[from] spp_types::Error),

    /// The envelope could not be opened or sealed.
    #[error("store envelope error: {0}")]
    Crypto(#[from] spp_crypto::CryptoError),

    /// A variable-bag entry failed its CRC check.
    #[error("invalid CRC in variable bag entry {key:?}: stored {stored:#010x}, computed {computed:#010x}")]
    BagChecksum {
        key: String,
        stored: u32,
        computed: u32,
    },

    /// A fixed-size record payload had the wrong length.
    #[error("{what} payload must be {expected} bytes, got {actual}")]
    PayloadSize {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Another handle already holds the store file.
    #[error("store file is locked by another process: {}", path.display())]
    Locked { path: PathBuf },

    /// A mirrored layout was opened on a path with no `-0.` segment.
    #[error("cannot derive mirror path from {}", path.display())]
    MirrorPath { path: PathBuf },

    /// IO error (file system).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

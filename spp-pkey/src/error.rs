//! Error types for product keys and product configuration.

use spp_types::{Guid, PsVersion};
use thiserror::Error;

/// Result type for product key operations.
pub type PKeyResult<T> = Result<T, PKeyError>;

/// Errors that can occur while encoding, parsing or generating product keys.
#[derive(Debug, Error)]
pub enum PKeyError {
    /// Invalid GUID or other primitive value.
    #[error(transparent)]
    Format(#[from] spp_types::Error),

    /// The key string is not a well-formed product key.
    #[error("invalid product key: {0}")]
    InvalidKey(String),

    /// The embedded checksum does not match the key contents.
    #[error("product key checksum mismatch: key carries {stored:#x}, computed {computed:#x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    /// Phone activation data has no layout for this version.
    #[error("phone activation data is not defined for {0}")]
    UnsupportedVersion(PsVersion),

    /// The product has no key ranges at all.
    #[error("product {0} has no key ranges")]
    NoRanges(Guid),

    /// Every key range of the product is reserved for Anytime Upgrade.
    #[error("product {0} is only usable for Windows Anytime Upgrade")]
    UpgradeOnly(Guid),

    /// No loaded product owns the given group and serial.
    #[error("no product matches group {group} serial {serial}")]
    ProductNotFound { group: u32, serial: u32 },

    /// Unknown product key algorithm identifier.
    #[error("unknown product key algorithm: {0}")]
    UnknownAlgorithm(String),

    /// Malformed product configuration.
    #[error("invalid product configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// License contents that are not well-formed XML.
    #[error("invalid license XML: {0}")]
    Xml(#[from] roxmltree::Error),

    /// A well-formed license without a usable product key configuration.
    #[error("invalid product key license: {0}")]
    License(String),

    /// IO error (file system).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

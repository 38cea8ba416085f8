//! Error types for the token store.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for token store operations.
pub type TokenResult<T> = Result<T, TokenError>;

/// Errors that can occur while reading or writing a token store.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The file ended early or an offset pointed outside it.
    #[error("malformed token store: {0}")]
    Format(#[from] spp_types::Error),

    /// A slot's declared length disagrees with its content block.
    #[error("content length at {offset:#x} is {content}, slot declares {declared}")]
    LengthMismatch {
        offset: usize,
        declared: u32,
        content: u32,
    },

    /// A next-block offset does not move forward through the file.
    #[error("block chain points backwards to {next:#x} from {block:#x}")]
    BrokenChain { block: usize, next: usize },

    /// The whole-file digest does not match the file contents.
    #[error("token store digest mismatch")]
    DigestMismatch,

    /// A block's trailing hash does not match the block contents.
    #[error("hash mismatch in block at {offset:#x}")]
    BlockHashMismatch { offset: usize },

    /// Another handle already holds the token file.
    #[error("token store is locked by another process: {}", path.display())]
    Locked { path: PathBuf },

    /// IO error (file system).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

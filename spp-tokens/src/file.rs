//! File-backed token store scope.

use crate::entry::TokenEntry;
use crate::error::{TokenError, TokenResult};
use crate::storage::{TokenStorage, Tokens};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// An open token store. The file is locked until the scope is closed or
/// dropped; both rewrite it from the in-memory entries.
#[derive(Debug)]
pub struct TokenStore {
    path: PathBuf,
    file: File,
    tokens: Tokens,
    closed: bool,
}

impl TokenStore {
    /// Opens (or creates) the token store at `path`.
    pub fn open(path: impl AsRef<Path>) -> TokenResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                return Err(TokenError::Locked { path });
            }
            Err(e) => return Err(e.into()),
        }

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        let tokens = Tokens::decode(&bytes)?;

        info!(path = %path.display(), entries = tokens.len(), "opened token store");
        Ok(Self {
            path,
            file,
            tokens,
            closed: false,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn tokens(&self) -> &Tokens {
        &self.tokens
    }

    /// Encodes and writes the store, then releases the file.
    pub fn close(mut self) -> TokenResult<()> {
        self.closed = true;
        self.flush()
    }

    fn flush(&mut self) -> TokenResult<()> {
        let bytes = self.tokens.serialize();
        self.file.set_len(bytes.len() as u64)?;
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&bytes)?;
        self.file.flush()?;
        info!(path = %self.path.display(), entries = self.tokens.len(), len = bytes.len(), "wrote token store");
        Ok(())
    }
}

impl Drop for TokenStore {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.flush() {
                warn!(path = %self.path.display(), error = %e, "failed to flush token store on drop");
            }
        }
        if let Err(e) = FileExt::unlock(&self.file) {
            debug!(path = %self.path.display(), error = %e, "failed to release token store lock");
        }
    }
}

impl TokenStorage for TokenStore {
    fn add_entry(&mut self, entry: TokenEntry) {
        self.tokens.add_entry(entry);
    }

    fn delete_entry(&mut self, name: &str, extension: &str) -> bool {
        self.tokens.delete_entry(name, extension)
    }

    fn delete_unpopulated(&mut self, name: &str, extension: &str) -> usize {
        self.tokens.delete_unpopulated(name, extension)
    }

    fn get_entry(&self, name: &str, extension: &str) -> Option<&TokenEntry> {
        self.tokens.get_entry(name, extension)
    }

    fn set_entry(&mut self, name: &str, extension: &str, data: Vec<u8>) {
        self.tokens.set_entry(name, extension, data);
    }

    fn serialize(&self) -> Vec<u8> {
        self.tokens.serialize()
    }
}

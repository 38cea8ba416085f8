//! File-backed trusted-store scope.
//!
//! Opening locks the store file (and its mirror on layouts that keep one)
//! for the lifetime of the scope. Nothing touches the disk again until the
//! scope is closed or dropped, at which point the container is re-encoded,
//! re-sealed and written over the old contents. There is no write-ahead
//! copy; an interrupted close leaves the file truncated.

use crate::codec::{Container, PhysicalStore};
use crate::error::{StoreError, StoreResult};
use crate::options::StoreOptions;
use crate::record::{Record, ValueQuery};
use fs2::FileExt;
use spp_crypto::{KeyRing, StoreKey};
use spp_types::PsVersion;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Derives the secondary path of a mirrored store: `...-0.dat` becomes `...-1.dat`.
pub fn mirror_path(primary: &Path) -> StoreResult<PathBuf> {
    let name = primary
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| n.contains("-0."))
        .ok_or_else(|| StoreError::MirrorPath {
            path: primary.to_path_buf(),
        })?;
    Ok(primary.with_file_name(name.replacen("-0.", "-1.", 1)))
}

#[derive(Debug)]
struct LockedFile {
    path: PathBuf,
    file: File,
}

impl LockedFile {
    fn open(path: &Path, create: bool) -> StoreResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(create)
            .truncate(false)
            .open(path)?;
        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                return Err(StoreError::Locked {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => return Err(e.into()),
        }
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    fn read_all(&mut self) -> StoreResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.file.seek(SeekFrom::Start(0))?;
        self.file.read_to_end(&mut buf)?;
        self.file.seek(SeekFrom::Start(0))?;
        Ok(buf)
    }

    fn overwrite(&mut self, data: &[u8]) -> StoreResult<()> {
        self.file.set_len(data.len() as u64)?;
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(data)?;
        self.file.flush()?;
        Ok(())
    }
}

impl Drop for LockedFile {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            debug!(path = %self.path.display(), error = %e, "failed to release store lock");
        }
    }
}

/// An open trusted store.
///
/// Implements [`PhysicalStore`] over the decoded container; mutations are
/// in memory until [`TrustedStore::close`].
#[derive(Debug)]
pub struct TrustedStore {
    primary: LockedFile,
    mirror: Option<LockedFile>,
    key: StoreKey,
    options: StoreOptions,
    container: Container,
    closed: bool,
}

impl TrustedStore {
    /// Opens and decrypts an existing store.
    pub fn open(path: impl AsRef<Path>, key: &StoreKey, options: StoreOptions) -> StoreResult<Self> {
        let path = path.as_ref();
        let (mut primary, mirror) = Self::lock_files(path, options.version, false)?;
        let payload = spp_crypto::unwrap(&primary.read_all()?, key, options.version, options.integrity)?;
        let container = Container::decode(&payload, options.version)?;

        info!(
            path = %path.display(),
            version = %options.version,
            key_set = ?options.key_set,
            records = container.records().len(),
            "opened trusted store"
        );
        Ok(Self {
            primary,
            mirror,
            key: key.clone(),
            options,
            container,
            closed: false,
        })
    }

    /// Opens a store with the key pair named in `options`.
    pub fn open_with_keyring(
        path: impl AsRef<Path>,
        ring: &KeyRing,
        options: StoreOptions,
    ) -> StoreResult<Self> {
        Self::open(path, ring.select(options.key_set), options)
    }

    /// Starts a new, empty store at `path`, replacing whatever is there when
    /// the scope closes.
    pub fn create(path: impl AsRef<Path>, key: &StoreKey, options: StoreOptions) -> StoreResult<Self> {
        let path = path.as_ref();
        let (primary, mirror) = Self::lock_files(path, options.version, true)?;
        info!(path = %path.display(), version = %options.version, "created trusted store");
        Ok(Self {
            primary,
            mirror,
            key: key.clone(),
            options,
            container: Container::new(options.version),
            closed: false,
        })
    }

    fn lock_files(
        path: &Path,
        version: PsVersion,
        create: bool,
    ) -> StoreResult<(LockedFile, Option<LockedFile>)> {
        let mirror_path = if version.is_mirrored() {
            Some(mirror_path(path)?)
        } else {
            None
        };
        let primary = LockedFile::open(path, create)?;
        let mirror = match mirror_path {
            Some(p) => Some(LockedFile::open(&p, true)?),
            None => None,
        };
        Ok((primary, mirror))
    }

    #[must_use]
    pub fn version(&self) -> PsVersion {
        self.options.version
    }

    #[must_use]
    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.primary.path
    }

    /// Path of the secondary file, for mirrored layouts.
    #[must_use]
    pub fn mirror(&self) -> Option<&Path> {
        self.mirror.as_ref().map(|m| m.path.as_path())
    }

    #[must_use]
    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn container_mut(&mut self) -> &mut Container {
        &mut self.container
    }

    /// Decrypts the primary file as it currently is on disk, ignoring any
    /// in-memory changes.
    pub fn read_raw(&mut self) -> StoreResult<Vec<u8>> {
        let file = self.primary.read_all()?;
        Ok(spp_crypto::unwrap(
            &file,
            &self.key,
            self.options.version,
            self.options.integrity,
        )?)
    }

    /// Seals `payload` as-is, writes it and ends the scope. The decoded
    /// container is discarded.
    pub fn write_raw(mut self, payload: &[u8]) -> StoreResult<()> {
        self.closed = true;
        self.write_sealed(payload)
    }

    /// Re-encodes, seals and writes the store, then releases the files.
    pub fn close(mut self) -> StoreResult<()> {
        self.closed = true;
        self.flush()
    }

    fn flush(&mut self) -> StoreResult<()> {
        let payload = self.container.serialize();
        self.write_sealed(&payload)
    }

    fn write_sealed(&mut self, payload: &[u8]) -> StoreResult<()> {
        let sealed = spp_crypto::wrap(payload, &self.key, self.options.version)?;
        self.primary.overwrite(&sealed)?;
        if let Some(mirror) = self.mirror.as_mut() {
            mirror.overwrite(&sealed)?;
        }
        info!(
            path = %self.primary.path.display(),
            mirrored = self.mirror.is_some(),
            len = sealed.len(),
            "wrote trusted store"
        );
        Ok(())
    }
}

impl Drop for TrustedStore {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.flush() {
            warn!(path = %self.primary.path.display(), error = %e, "failed to flush trusted store on drop");
        }
    }
}

impl PhysicalStore for TrustedStore {
    fn get(&self, key: &str, value: ValueQuery<'_>) -> Option<Record> {
        self.container.get(key, value)
    }

    fn set(&mut self, key: &str, value: ValueQuery<'_>, data: Vec<u8>) -> bool {
        self.container.set(key, value, data)
    }

    fn delete(&mut self, key: &str, value: ValueQuery<'_>) -> bool {
        self.container.delete(key, value)
    }

    fn add(&mut self, record: Record) {
        self.container.add(record);
    }

    fn find(&self, value: ValueQuery<'_>) -> Vec<Record> {
        self.container.find(value)
    }

    fn records(&self) -> Vec<Record> {
        self.container.records()
    }

    fn serialize(&self) -> Vec<u8> {
        self.container.serialize()
    }
}

//! # File-backed Progress Storage
//!
//! A `ProgressStore` that keeps the tables in memory and mirrors them to a
//! JSON snapshot file.
//!
//! A unit of work runs against a staged copy of the tables. On `Ok` the
//! staged copy is written to disk (temp file, fsync, rename) and only then
//! replaces the live tables, so a failed save discards the whole unit.
//!
//! The store holds an exclusive advisory lock on `<database>.lock` from
//! `open` until drop. A second store on the same path, in this process or
//! another, fails to open instead of racing on the snapshot.

use crate::formats::snapshot::Snapshot;
use crate::memory::Tables;
use crate::primitives::MAX_DOCUMENT_SIZE;
use crate::store::{ProgressReader, ProgressStore, UnitOfWork};
use crate::StagegateError;
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

fn io_err(action: &str, path: &Path, e: impl std::fmt::Display) -> StagegateError {
    StagegateError::StoreFailure(format!("{} '{}': {}", action, path.display(), e))
}

fn poisoned(e: &dyn std::fmt::Display) -> StagegateError {
    StagegateError::StoreFailure(format!("file store lock poisoned: {}", e))
}

/// Sidecar lock file for a snapshot path.
///
/// The snapshot itself is replaced by rename on every save, so the lock
/// lives on a file whose inode never changes.
#[must_use]
pub fn lock_path(path: &Path) -> PathBuf {
    let mut lock = path.as_os_str().to_owned();
    lock.push(".lock");
    PathBuf::from(lock)
}

// =============================================================================
// STORE
// =============================================================================

/// A snapshot-file progress store.
pub struct FileStore {
    path: PathBuf,
    tables: RwLock<Tables>,
    /// Held for the lifetime of the store; closing it releases the lock.
    _lock: File,
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl FileStore {
    /// Lock, then load the snapshot at `path`.
    ///
    /// A missing file is created holding an empty snapshot. Fails with
    /// `StoreFailure` when another store holds the lock.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StagegateError> {
        let path = path.as_ref().to_path_buf();
        let lock = acquire_lock(&path)?;

        let tables = if path.exists() {
            Tables::from(read_snapshot(&path)?)
        } else {
            let tables = Tables::default();
            write_snapshot(&path, &Snapshot::from(&tables))?;
            tables
        };

        tracing::debug!(path = %path.display(), "opened file store");
        Ok(Self {
            path,
            tables: RwLock::new(tables),
            _lock: lock,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy the current contents into a serializable snapshot.
    pub fn snapshot(&self) -> Result<Snapshot, StagegateError> {
        let tables = self.tables.read().map_err(|e| poisoned(&e))?;
        Ok(Snapshot::from(&*tables))
    }
}

fn acquire_lock(path: &Path) -> Result<File, StagegateError> {
    let lock_path = lock_path(path);
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(|e| io_err("Cannot open lock", &lock_path, e))?;

    match file.try_lock_exclusive() {
        Ok(true) => Ok(file),
        Ok(false) => Err(locked(path)),
        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Err(locked(path)),
        Err(e) => Err(io_err("Cannot lock", &lock_path, e)),
    }
}

fn locked(path: &Path) -> StagegateError {
    StagegateError::StoreFailure(format!(
        "database '{}' is in use by another process",
        path.display()
    ))
}

fn read_snapshot(path: &Path) -> Result<Snapshot, StagegateError> {
    let metadata = std::fs::metadata(path).map_err(|e| io_err("Cannot read", path, e))?;
    if metadata.len() > MAX_DOCUMENT_SIZE as u64 {
        return Err(StagegateError::SerializationError(format!(
            "Snapshot size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            MAX_DOCUMENT_SIZE
        )));
    }
    let data = std::fs::read(path).map_err(|e| io_err("Cannot read", path, e))?;
    Snapshot::from_json(&data)
}

/// Replace `path` with `snapshot`: temp file, fsync, rename.
fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), StagegateError> {
    let data = snapshot.to_json()?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut file = File::create(&tmp).map_err(|e| io_err("Cannot write", &tmp, e))?;
    file.write_all(&data)
        .and_then(|()| file.sync_all())
        .map_err(|e| io_err("Cannot write", &tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| io_err("Cannot rename to", path, e))
}

impl ProgressStore for FileStore {
    fn read<T, F>(&self, f: F) -> Result<T, StagegateError>
    where
        F: FnOnce(&dyn ProgressReader) -> Result<T, StagegateError>,
    {
        let tables = self.tables.read().map_err(|e| poisoned(&e))?;
        f(&*tables)
    }

    fn write<T, F>(&self, f: F) -> Result<T, StagegateError>
    where
        F: FnOnce(&mut dyn UnitOfWork) -> Result<T, StagegateError>,
    {
        let mut tables = self.tables.write().map_err(|e| poisoned(&e))?;
        let mut staged = tables.clone();
        let result = f(&mut staged)?;

        if let Err(e) = write_snapshot(&self.path, &Snapshot::from(&staged)) {
            tracing::warn!(path = %self.path.display(), error = %e, "snapshot save failed, unit discarded");
            return Err(e);
        }
        *tables = staged;
        Ok(result)
    }
}

// =============================================================================
// TESTS
// =============================================================================

//! File-based blob store for persistent state.

use crate::error::{StorageError, StorageResult};
use crate::store::StateStore;
use fs2::FileExt;
use parking_lot::Mutex;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// A file-based blob store.
///
/// The blob lives in a single file. Next to it the store keeps:
///
/// ```text
/// <dir>/
/// ├─ pack_state.json        # the blob
/// ├─ pack_state.json.tmp    # staging file for atomic replacement
/// └─ pack_state.json.lock   # advisory lock held while the store is open
/// ```
///
/// # Durability
///
/// `store` uses write-then-rename:
/// 1. Write to the staging file
/// 2. Sync the staging file to disk
/// 3. Rename it over the blob
/// 4. Fsync the directory so the rename itself is durable
///
/// # Single instance
///
/// Opening the store takes an exclusive advisory lock. A second process
/// opening the same path gets [`StorageError::Locked`].
///
/// # Example
///
/// ```no_run
/// use hoover_storage::{FileStore, StateStore};
/// use std::path::Path;
///
/// let store = FileStore::open(Path::new("pack_state.json")).unwrap();
/// store.store(b"{}").unwrap();
/// ```
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    temp_path: PathBuf,
    /// Serializes writers; also held for the lifetime of the lock.
    lock_file: Mutex<File>,
}

impl FileStore {
    /// Opens a file store at `path`, creating parent directories if needed.
    ///
    /// The blob file itself is not created until the first `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The path has no file name
    /// - Another process holds the lock (returns `Locked`)
    /// - I/O errors occur
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file_name = path
            .file_name()
            .ok_or_else(|| StorageError::InvalidPath(path.to_path_buf()))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let lock_path = sibling(path, file_name, ".lock");
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked { path: lock_path });
        }

        Ok(Self {
            path: path.to_path_buf(),
            temp_path: sibling(path, file_name, ".tmp"),
            lock_file: Mutex::new(lock_file),
        })
    }

    /// Returns the path to the blob file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(unix)]
    fn sync_directory(&self) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            let parent = if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            };
            File::open(parent)?.sync_all()?;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> StorageResult<()> {
        // NTFS journals metadata; directory handles cannot be fsynced.
        Ok(())
    }
}

impl StateStore for FileStore {
    fn load(&self) -> StorageResult<Option<Vec<u8>>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let mut file = File::open(&self.path)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;

        if data.is_empty() {
            return Ok(None);
        }

        Ok(Some(data))
    }

    fn store(&self, data: &[u8]) -> StorageResult<()> {
        let _guard = self.lock_file.lock();

        let mut file = File::create(&self.temp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&self.temp_path, &self.path)?;
        self.sync_directory()?;

        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

impl Drop for FileStore {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&*self.lock_file.lock());
    }
}

fn sibling(path: &Path, file_name: &std::ffi::OsStr, suffix: &str) -> PathBuf {
    let mut name = OsString::from(file_name);
    name.push(suffix);
    path.with_file_name(name)
}

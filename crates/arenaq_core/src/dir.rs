//! Queue directory management.
//!
//! This module handles the file system layout for a queue:
//!
//! ```text
//! <queue_path>/
//! ├─ LOCK              # Advisory lock for single-writer
//! ├─ index.dat         # Head and tail positions
//! ├─ arena_0.dat       # Arena files, one per arena id
//! ├─ arena_1.dat
//! └─ ...
//! ```
//!
//! Arena files are created lazily and never removed.

use crate::error::{CoreError, CoreResult};
use crate::types::ArenaId;
use arenaq_storage::arena_file_name;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const INDEX_FILE: &str = "index.dat";

/// Manages the queue directory and its exclusive lock.
///
/// Only one `QueueDir` can hold a given directory at a time; the lock is
/// released when the value is dropped.
#[derive(Debug)]
pub struct QueueDir {
    path: PathBuf,
    _lock_file: File,
}

impl QueueDir {
    /// Opens or creates a queue directory and takes its lock.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory doesn't exist and `create_if_missing` is false
    /// - The path is not a directory
    /// - Another process holds the lock (returns `QueueLocked`)
    /// - I/O errors occur
    pub fn open(path: &Path, create_if_missing: bool) -> CoreResult<Self> {
        if !path.exists() {
            if create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(CoreError::invalid_format(format!(
                    "queue directory does not exist: {}",
                    path.display()
                )));
            }
        }

        if !path.is_dir() {
            return Err(CoreError::invalid_format(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(CoreError::QueueLocked);
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the path to the queue directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path to the index file.
    #[must_use]
    pub fn index_path(&self) -> PathBuf {
        self.path.join(INDEX_FILE)
    }

    /// Returns the path to the file of arena `aid`.
    #[must_use]
    pub fn arena_path(&self, aid: ArenaId) -> PathBuf {
        self.path.join(arena_file_name(aid.as_u64()))
    }

    /// Lists the ids of all arena files present, in ascending order.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub fn arena_ids(&self) -> CoreResult<Vec<ArenaId>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let name = entry?.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let id = name
                .strip_prefix("arena_")
                .and_then(|rest| rest.strip_suffix(".dat"))
                .and_then(|digits| digits.parse::<u64>().ok());
            if let Some(id) = id {
                ids.push(ArenaId::new(id));
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    /// Syncs the directory so newly created arena files are durable.
    #[cfg(unix)]
    pub fn sync(&self) -> CoreResult<()> {
        File::open(&self.path)?.sync_all()?;
        Ok(())
    }

    /// Syncs the directory so newly created arena files are durable.
    #[cfg(not(unix))]
    pub fn sync(&self) -> CoreResult<()> {
        // NTFS journals metadata; directory handles cannot be fsynced
        Ok(())
    }
}

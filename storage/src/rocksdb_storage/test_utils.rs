//! Useful utilities for testing.

use std::{ops::Deref, path::PathBuf, sync::Arc};

use tempfile::TempDir;

use super::*;

/// RocksDb storage with self-cleanup
pub struct TempStorage {
    dir: TempDir,
    path: PathBuf,
    storage: Arc<RocksDbStorage>,
}

impl TempStorage {
    /// Create new `TempStorage`
    pub fn new() -> Self {
        let dir = TempDir::new().expect("cannot create tempdir");
        let path = dir.path().to_path_buf();
        let storage =
            RocksDbStorage::default_rocksdb_with_path(&path).expect("cannot open RocksDB storage");
        TempStorage {
            dir,
            path,
            storage: Arc::new(storage),
        }
    }

    /// Shared handle to the storage, for code that needs `Arc<S>`.
    pub fn shared(&self) -> Arc<RocksDbStorage> {
        Arc::clone(&self.storage)
    }

    /// Close the database and open it again from the same directory.
    ///
    /// Every handle obtained through [`TempStorage::shared`] must be dropped
    /// first.
    pub fn reopen(self) -> Self {
        let TempStorage { dir, path, storage } = self;
        drop(Arc::into_inner(storage).expect("shared storage handles still alive"));
        let storage =
            RocksDbStorage::default_rocksdb_with_path(&path).expect("cannot reopen RocksDB storage");
        TempStorage {
            dir,
            path,
            storage: Arc::new(storage),
        }
    }
}

impl Default for TempStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for TempStorage {
    type Target = RocksDbStorage;

    fn deref(&self) -> &Self::Target {
        &self.storage
    }
}

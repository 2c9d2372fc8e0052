//! Storage errors

/// Storage and underlying errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Rocks DB error
    #[cfg(feature = "rocksdb_storage")]
    #[error("rocksDB error: {0}")]
    RocksDBError(#[from] rocksdb::Error),
    /// A batch could not be applied; nothing from it is visible.
    #[error("batch commit failed: {0}")]
    CommitFailed(String),
    /// The storage was closed.
    #[error("storage is closed")]
    Closed,
}

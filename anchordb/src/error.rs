//! anchordb errors

use anchordb_accumulator::Hash;

/// Alias for `core::result::Result<T, Error>`.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors returned by index reads and receipt construction.
///
/// [`Error::Corrupted`] is the unrecoverable category: the index contradicts
/// itself and no receipt must be produced from it. Check with
/// [`Error::is_fatal`] rather than matching on message text.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The anchor height is below the object height.
    #[error("invalid range: anchor height {anchor_height} is below object height {object_height}")]
    InvalidRange {
        /// Height the object was asserted at.
        object_height: u64,
        /// Requested anchor height.
        anchor_height: u64,
    },
    /// A caller-supplied value could not be parsed.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The requested height is beyond the committed head.
    #[error("height {requested} not yet available (head {head:?})")]
    NotYetAvailable {
        /// Height asked for.
        requested: u64,
        /// Committed head at the time of the request.
        head: Option<u64>,
    },
    /// The object was never indexed.
    #[error("object {0} not found")]
    ObjectNotFound(Hash),
    /// The index contradicts itself. Not retryable.
    #[error("corrupted index: {0}")]
    Corrupted(String),
    /// Storage backend failure.
    #[error("storage error: {0}")]
    Storage(#[from] anchordb_storage::Error),
    /// Stored or supplied bytes could not be decoded.
    #[error("codec error: {0}")]
    Codec(String),
}

impl Error {
    /// Whether this error means the index must not be trusted.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Corrupted(_))
    }

    /// Whether the same request may succeed later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::NotYetAvailable { .. })
    }
}

impl From<anchordb_accumulator::Error> for Error {
    fn from(e: anchordb_accumulator::Error) -> Self {
        match e {
            anchordb_accumulator::Error::InconsistentPath(reason) => Error::Corrupted(reason),
            anchordb_accumulator::Error::InvalidHash(reason) => Error::InvalidInput(reason),
            anchordb_accumulator::Error::InvalidData(reason) => Error::Codec(reason),
        }
    }
}

/// Errors that stop the sync engine.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The feed returned a block that cannot be ingested.
    #[error("fatal feed error at height {height}: {reason}")]
    Fatal {
        /// Height being ingested.
        height: u64,
        /// What was wrong with it.
        reason: String,
    },
    /// Committed state contradicts itself.
    #[error("corrupted index: {0}")]
    Corrupted(String),
    /// Storage backend failure.
    #[error("storage error: {0}")]
    Storage(#[from] anchordb_storage::Error),
    /// Stored bytes could not be decoded.
    #[error("codec error: {0}")]
    Codec(String),
    /// The engine task did not finish normally.
    #[error("sync task failed: {0}")]
    Join(String),
}

impl From<Error> for SyncError {
    fn from(e: Error) -> Self {
        match e {
            Error::Storage(e) => SyncError::Storage(e),
            Error::Codec(reason) => SyncError::Codec(reason),
            other => SyncError::Corrupted(other.to_string()),
        }
    }
}

impl From<anchordb_accumulator::Error> for SyncError {
    fn from(e: anchordb_accumulator::Error) -> Self {
        Error::from(e).into()
    }
}

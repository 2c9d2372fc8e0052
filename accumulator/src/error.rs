//! Accumulator errors

/// Alias for `core::result::Result<T, Error>`.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors raised while decoding accumulator state or following a proof path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Serialized accumulator bytes are malformed.
    #[error("invalid accumulator data: {0}")]
    InvalidData(String),
    /// A hash was not 32 bytes or not valid hex.
    #[error("invalid hash: {0}")]
    InvalidHash(String),
    /// The tracked derivative is not where the pending array says it must be.
    #[error("inconsistent proof path: {0}")]
    InconsistentPath(String),
}

//! anchordb storage layer implemented over RocksDB backend.
mod storage;
pub mod test_utils;

pub use self::storage::RocksDbStorage;

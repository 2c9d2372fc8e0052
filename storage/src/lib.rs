#![deny(missing_docs)]

//! Storage abstraction for anchordb.
//!
//! Every value lives in a [`Bucket`]: the effective key is the bucket's
//! 32-byte prefix followed by the caller's key, so buckets never collide.
//! Writes are either immediate ([`Storage::put`]) or deferred into a
//! [`StorageBatch`] and applied all-or-nothing by [`Storage::commit_batch`].

pub mod error;
#[cfg(feature = "mem_storage")]
pub mod mem_storage;
#[cfg(feature = "rocksdb_storage")]
pub mod rocksdb_storage;
mod storage;

pub use crate::{
    error::Error,
    storage::{Bucket, Storage, StorageBatch, build_prefix, make_prefixed_key},
};

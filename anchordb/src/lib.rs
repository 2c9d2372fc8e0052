//! anchordb indexes an append-only ledger into local storage while keeping
//! a binary-counter Merkle accumulator over every hash it sees, and serves
//! receipts proving a hash is committed by a later anchor height.
//!
//! - [`SyncEngine`] pulls [`BlockRecord`]s from a [`BlockFeed`], appends
//!   their leaves and commits per-height snapshots, marks and lookups in
//!   atomic batches.
//! - [`ReceiptBuilder`] reads only committed state and produces
//!   [`Receipt`]s, which [`validate_receipt`] checks with SHA-256 alone.

#![deny(missing_docs)]

pub mod checkpoint;
mod error;
pub mod feed;
pub mod identity;
pub mod index;
pub mod keys;
pub mod receipt;
pub mod sync;

pub use anchordb_accumulator as accumulator;
pub use anchordb_accumulator::{ApplyStep, Hash, HashAccumulator, Side};
pub use anchordb_storage as storage;

pub use crate::{
    error::{Error, Result, SyncError},
    feed::{BlockFeed, BlockRecord, ChainFirstEntry, FeedError, MemFeed},
    identity::{AdminRecord, AuthoritySet},
    receipt::{Receipt, ReceiptBuilder, validate_receipt},
    sync::{SyncEngine, SyncHandle, SyncOptions, SyncState},
};

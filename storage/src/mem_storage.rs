//! In-memory storage.
//!
//! Batches are applied under a single write lock, so readers observe either
//! none or all of a batch. Commit failures can be injected to exercise
//! callers' recovery paths.

use std::{
    collections::BTreeMap,
    sync::{
        PoisonError, RwLock,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use crate::{Bucket, Error, Storage, StorageBatch};

/// Storage kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemStorage {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    fail_commits: AtomicUsize,
    closed: AtomicBool,
    commits: AtomicUsize,
}

impl MemStorage {
    /// Empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` batch commits fail without applying anything.
    pub fn fail_next_commits(&self, n: usize) {
        self.fail_commits.store(n, Ordering::SeqCst);
    }

    /// Reject every further operation with [`Error::Closed`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Number of stored keys across all buckets.
    pub fn len(&self) -> usize {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of batches committed successfully.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Delete `key` from `bucket` outside of any batch, returning the old
    /// value. Indexes never delete; this exists to damage a store in tests.
    pub fn remove(&self, bucket: &Bucket, key: &[u8]) -> Option<Vec<u8>> {
        self.data
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&bucket.key(key))
    }

    /// Copy of every stored entry, keyed by prefixed key.
    pub fn dump(&self) -> BTreeMap<Vec<u8>, Vec<u8>> {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn check_open(&self) -> Result<(), Error> {
        if self.closed.load(Ordering::SeqCst) {
            Err(Error::Closed)
        } else {
            Ok(())
        }
    }
}

impl Storage for MemStorage {
    fn get(&self, bucket: &Bucket, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        self.check_open()?;
        Ok(self
            .data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&bucket.key(key))
            .cloned())
    }

    fn put(&self, bucket: &Bucket, key: &[u8], value: &[u8]) -> Result<(), Error> {
        self.check_open()?;
        self.data
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(bucket.key(key), value.to_vec());
        Ok(())
    }

    fn commit_batch(&self, batch: &mut StorageBatch) -> Result<(), Error> {
        self.check_open()?;
        let injected = self
            .fail_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(Error::CommitFailed(format!(
                "injected failure for batch of {} operations",
                batch.len()
            )));
        }

        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        for (key, value) in batch.iter() {
            data.insert(key.to_vec(), value.to_vec());
        }
        drop(data);

        self.commits.fetch_add(1, Ordering::SeqCst);
        batch.clear();
        Ok(())
    }

    fn flush(&self) -> Result<(), Error> {
        self.check_open()
    }
}

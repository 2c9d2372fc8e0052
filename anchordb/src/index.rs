//! Typed access to the committed index.

use std::sync::Arc;

use anchordb_accumulator::{Hash, HashAccumulator};
use anchordb_storage::{Storage, StorageBatch};

use crate::{
    Error, Result,
    checkpoint::CheckpointStore,
    identity::AuthoritySet,
    keys::{
        AUTHORITIES_KEY, CHAIN_HEAD, FIRST_SEEN, HEAD_KEY, HEIGHT_SNAPSHOTS, IDENTITY, SYNC,
        decode_hash, decode_height, height_key,
    },
};

/// The index over a shared storage handle.
///
/// Reads only see committed data. The `stage_*` methods buffer writes into
/// a caller-owned batch; write-once entries consult the batch first so a
/// batch never overwrites itself.
pub struct IndexStore<S> {
    storage: Arc<S>,
}

impl<S> Clone for IndexStore<S> {
    fn clone(&self) -> Self {
        IndexStore {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<S: Storage> IndexStore<S> {
    /// Index over `storage`.
    pub fn new(storage: Arc<S>) -> Self {
        IndexStore { storage }
    }

    /// The underlying storage.
    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Marks.
    pub fn checkpoints(&self) -> CheckpointStore<'_, S> {
        CheckpointStore::new(&self.storage)
    }

    /// Highest fully committed height, `None` before the first commit.
    pub fn head(&self) -> Result<Option<u64>> {
        self.storage
            .get(&SYNC, HEAD_KEY)?
            .map(|bytes| decode_height(&bytes))
            .transpose()
    }

    /// Accumulator after `height`, leaf log included.
    pub fn height_snapshot(&self, height: u64) -> Result<Option<HashAccumulator>> {
        self.storage
            .get(&HEIGHT_SNAPSHOTS, &height_key(height))?
            .map(|bytes| HashAccumulator::unmarshal(&bytes).map_err(Error::from))
            .transpose()
    }

    /// Height snapshot that must exist because `height` is committed.
    pub fn committed_snapshot(&self, height: u64) -> Result<HashAccumulator> {
        self.height_snapshot(height)?.ok_or_else(|| {
            Error::Corrupted(format!("missing snapshot for committed height {}", height))
        })
    }

    /// First height `object` was seen at.
    pub fn first_seen(&self, object: &Hash) -> Result<Option<u64>> {
        self.storage
            .get(&FIRST_SEEN, object.as_bytes())?
            .map(|bytes| decode_height(&bytes))
            .transpose()
    }

    /// First entry of `chain_id`.
    pub fn chain_head(&self, chain_id: &Hash) -> Result<Option<Hash>> {
        self.storage
            .get(&CHAIN_HEAD, chain_id.as_bytes())?
            .map(|bytes| decode_hash(&bytes))
            .transpose()
    }

    /// Committed authority set.
    pub fn authorities(&self) -> Result<AuthoritySet> {
        match self.storage.get(&IDENTITY, AUTHORITIES_KEY)? {
            Some(bytes) => AuthoritySet::from_bytes(&bytes),
            None => Ok(AuthoritySet::new()),
        }
    }

    /// Buffer the head record.
    pub fn stage_head(&self, batch: &mut StorageBatch, height: u64) {
        batch.put(&SYNC, HEAD_KEY, height_key(height).to_vec());
    }

    /// Buffer a height snapshot.
    pub fn stage_height_snapshot(&self, batch: &mut StorageBatch, height: u64, bytes: Vec<u8>) {
        batch.put(&HEIGHT_SNAPSHOTS, &height_key(height), bytes);
    }

    /// Buffer `object → height` unless `object` was already seen.
    ///
    /// Returns whether the entry was buffered.
    pub fn stage_first_seen(
        &self,
        batch: &mut StorageBatch,
        object: &Hash,
        height: u64,
    ) -> Result<bool> {
        if self
            .storage
            .get_batched(batch, &FIRST_SEEN, object.as_bytes())?
            .is_some()
        {
            return Ok(false);
        }
        batch.put(&FIRST_SEEN, object.as_bytes(), height_key(height).to_vec());
        Ok(true)
    }

    /// Buffer `chain_id → entry` unless the chain already has a first entry.
    pub fn stage_chain_head(
        &self,
        batch: &mut StorageBatch,
        chain_id: &Hash,
        entry: &Hash,
    ) -> Result<bool> {
        if self
            .storage
            .get_batched(batch, &CHAIN_HEAD, chain_id.as_bytes())?
            .is_some()
        {
            return Ok(false);
        }
        batch.put(&CHAIN_HEAD, chain_id.as_bytes(), entry.to_bytes().to_vec());
        Ok(true)
    }

    /// Buffer the authority set.
    pub fn stage_authorities(&self, batch: &mut StorageBatch, set: &AuthoritySet) {
        batch.put(&IDENTITY, AUTHORITIES_KEY, set.to_bytes());
    }

    /// Commit `batch` atomically.
    pub fn commit(&self, batch: &mut StorageBatch) -> Result<()> {
        Ok(self.storage.commit_batch(batch)?)
    }
}

//! The block feed collaborator.
//!
//! The feed hides the remote ledger's protocol and block decoding. It hands
//! the sync engine one [`BlockRecord`] per height: the hashes to append, in
//! their fixed order, plus the chain and admin facts the index records.

use std::{
    future::Future,
    sync::{Arc, Mutex, PoisonError},
};

use anchordb_accumulator::Hash;

use crate::identity::AdminRecord;

/// Errors reported by a [`BlockFeed`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
    /// The remote could not be reached. Retried indefinitely.
    #[error("feed unavailable: {0}")]
    Unavailable(String),
    /// The remote answered with something that cannot be ingested. Fatal.
    #[error("malformed block at height {height}: {reason}")]
    Malformed {
        /// Requested height.
        height: u64,
        /// What was wrong.
        reason: String,
    },
}

/// First entry of a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainFirstEntry {
    /// Chain id.
    pub chain_id: Hash,
    /// Hash of the chain's first entry.
    pub entry_hash: Hash,
}

/// Everything the index needs from one height.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockRecord {
    /// Ledger height.
    pub height: u64,
    /// Hash of the block itself.
    pub self_hash: Hash,
    /// Referenced sub-block hashes, in block order.
    pub sub_block_hashes: Vec<Hash>,
    /// Entry hashes per sub-block; `entry_hashes_by_sub_block[i]` belongs to
    /// `sub_block_hashes[i]`. Missing or empty for non-entry sub-blocks.
    pub entry_hashes_by_sub_block: Vec<Vec<Hash>>,
    /// Transaction hashes from the value-transfer sub-block.
    pub transaction_hashes: Vec<Hash>,
    /// Chains whose first entry appears at this height.
    pub chain_first_entries: Vec<ChainFirstEntry>,
    /// Admin records relevant to authority membership.
    pub admin_records: Vec<AdminRecord>,
}

impl BlockRecord {
    /// Leaves in append order: the block hash, each sub-block hash followed
    /// by its entries, then the transactions.
    pub fn leaves(&self) -> impl Iterator<Item = Hash> + '_ {
        let sub_blocks = self.sub_block_hashes.iter().enumerate().flat_map(|(i, sub)| {
            std::iter::once(*sub).chain(
                self.entry_hashes_by_sub_block
                    .get(i)
                    .into_iter()
                    .flatten()
                    .copied(),
            )
        });
        std::iter::once(self.self_hash)
            .chain(sub_blocks)
            .chain(self.transaction_hashes.iter().copied())
    }

    /// Number of leaves this record appends.
    pub fn leaf_count(&self) -> usize {
        1 + self.sub_block_hashes.len()
            + self
                .entry_hashes_by_sub_block
                .iter()
                .take(self.sub_block_hashes.len())
                .map(Vec::len)
                .sum::<usize>()
            + self.transaction_hashes.len()
    }

    /// Check the record is the one asked for and internally consistent.
    pub fn check(&self, expected_height: u64) -> Result<(), FeedError> {
        if self.height != expected_height {
            return Err(FeedError::Malformed {
                height: expected_height,
                reason: format!("record is for height {}", self.height),
            });
        }
        if self.entry_hashes_by_sub_block.len() > self.sub_block_hashes.len() {
            return Err(FeedError::Malformed {
                height: expected_height,
                reason: format!(
                    "{} entry lists for {} sub-blocks",
                    self.entry_hashes_by_sub_block.len(),
                    self.sub_block_hashes.len()
                ),
            });
        }
        Ok(())
    }
}

/// Source of block records.
pub trait BlockFeed: Send + Sync + 'static {
    /// Height of the newest block the remote has.
    fn tip_height(&self) -> impl Future<Output = Result<u64, FeedError>> + Send;

    /// The record for `height`.
    fn block_record(&self, height: u64)
    -> impl Future<Output = Result<BlockRecord, FeedError>> + Send;
}

#[derive(Debug, Default)]
struct MemFeedState {
    blocks: Vec<BlockRecord>,
    unavailable_calls: usize,
    calls: usize,
    advertised_tip: Option<u64>,
    stalled: bool,
}

/// In-memory feed over a growing list of blocks.
///
/// Clones share the same blocks, so a test can keep one handle to extend
/// the chain while the engine owns another.
#[derive(Debug, Clone, Default)]
pub struct MemFeed {
    state: Arc<Mutex<MemFeedState>>,
}

impl MemFeed {
    /// Feed with no blocks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed over `blocks`, which must be at heights `0..blocks.len()`.
    pub fn with_blocks(blocks: Vec<BlockRecord>) -> Self {
        let feed = Self::new();
        feed.lock().blocks = blocks;
        feed
    }

    /// Add the next block.
    pub fn push(&self, block: BlockRecord) {
        self.lock().blocks.push(block);
    }

    /// Make the next `n` calls fail with [`FeedError::Unavailable`].
    pub fn fail_next_calls(&self, n: usize) {
        self.lock().unavailable_calls = n;
    }

    /// Report `tip` as the tip height whatever blocks are held, so heights
    /// past the last block stay unavailable.
    pub fn advertise_tip(&self, tip: u64) {
        self.lock().advertised_tip = Some(tip);
    }

    /// While set, calls never complete.
    pub fn stall(&self, stalled: bool) {
        self.lock().stalled = stalled;
    }

    /// Total calls made, failed ones included.
    pub fn calls(&self) -> usize {
        self.lock().calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemFeedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn begin_call(&self) -> Result<std::sync::MutexGuard<'_, MemFeedState>, FeedError> {
        let stalled = {
            let mut state = self.lock();
            state.calls += 1;
            state.stalled
        };
        if stalled {
            std::future::pending::<()>().await;
        }
        let mut state = self.lock();
        if state.unavailable_calls > 0 {
            state.unavailable_calls -= 1;
            return Err(FeedError::Unavailable("injected outage".into()));
        }
        Ok(state)
    }
}

impl BlockFeed for MemFeed {
    async fn tip_height(&self) -> Result<u64, FeedError> {
        let state = self.begin_call().await?;
        if let Some(tip) = state.advertised_tip {
            return Ok(tip);
        }
        (state.blocks.len() as u64)
            .checked_sub(1)
            .ok_or_else(|| FeedError::Unavailable("no blocks yet".into()))
    }

    async fn block_record(&self, height: u64) -> Result<BlockRecord, FeedError> {
        let state = self.begin_call().await?;
        usize::try_from(height)
            .ok()
            .and_then(|i| state.blocks.get(i))
            .cloned()
            .ok_or_else(|| FeedError::Unavailable(format!("height {} not published", height)))
    }
}

#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use anchordb::{
    BlockRecord, ChainFirstEntry, Hash, MemFeed, SyncEngine, SyncOptions, SyncState,
    storage::Storage,
};
use tracing_subscriber::EnvFilter;

/// Log to the test output, filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Deterministic leaf hash for `(height, index)`.
pub fn leaf(height: u64, index: u64) -> Hash {
    let mut bytes = [0u8; 16];
    bytes[..8].copy_from_slice(&height.to_be_bytes());
    bytes[8..].copy_from_slice(&index.to_be_bytes());
    Hash::digest(&bytes)
}

/// Block at `height` with `entries` entry hashes in its first sub-block.
///
/// Leaves: block hash, entry sub-block, its entries, a second sub-block,
/// one transaction. `entries + 4` leaves in total.
pub fn block(height: u64, entries: u64) -> BlockRecord {
    BlockRecord {
        height,
        self_hash: leaf(height, 0),
        sub_block_hashes: vec![leaf(height, 1), leaf(height, 2)],
        entry_hashes_by_sub_block: vec![(0..entries).map(|i| leaf(height, 100 + i)).collect()],
        transaction_hashes: vec![leaf(height, 3)],
        chain_first_entries: vec![ChainFirstEntry {
            chain_id: Hash::digest(&height.to_be_bytes()),
            entry_hash: leaf(height, 100),
        }],
        admin_records: Vec::new(),
    }
}

/// `count` blocks with entry counts cycling through `sizes`.
pub fn chain(count: u64, sizes: &[u64]) -> Vec<BlockRecord> {
    (0..count)
        .map(|height| block(height, sizes[height as usize % sizes.len()]))
        .collect()
}

/// Options that poll and retry quickly.
pub fn fast_options() -> SyncOptions {
    SyncOptions {
        poll_interval: Duration::from_millis(5),
        retry_delay: Duration::from_millis(5),
        ..SyncOptions::default()
    }
}

/// Sync `feed` into `storage` until caught up, then stop gracefully.
pub async fn sync_until_idle<S: Storage + 'static>(
    storage: Arc<S>,
    feed: MemFeed,
    options: SyncOptions,
) -> Option<u64> {
    init_tracing();
    let handle = SyncEngine::new(storage, feed, options)
        .expect("open engine")
        .spawn();
    assert!(handle.wait_for(SyncState::Idle).await, "engine never went idle");
    handle.stop();
    handle.join().await.expect("sync failed")
}

/// Blocking version of [`sync_until_idle`] on a private runtime.
pub fn index_blocks<S: Storage + 'static>(storage: Arc<S>, blocks: Vec<BlockRecord>) -> Option<u64> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("build runtime");
    runtime.block_on(sync_until_idle(
        storage,
        MemFeed::with_blocks(blocks),
        fast_options(),
    ))
}

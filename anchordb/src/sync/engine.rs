//! The ingestion loop.

use std::{future::Future, sync::Arc, time::Duration};

use anchordb_accumulator::{HashAccumulator, mark};
use anchordb_storage::{Storage, StorageBatch};
use tokio::{sync::watch, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{SyncHandle, SyncOptions, SyncState};
use crate::{
    SyncError,
    checkpoint::stage_mark,
    feed::{BlockFeed, BlockRecord, FeedError},
    identity::AuthoritySet,
    index::IndexStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    Graceful,
    Forced,
}

enum Wait<T> {
    Ready(T),
    Interrupted(Interrupt),
}

/// Single writer of the index.
///
/// `head` is the last committed height. `staged` is the last height whose
/// writes sit in `batch`; the head record for it is added only when the
/// batch is committed.
pub struct SyncEngine<S, F> {
    index: IndexStore<S>,
    feed: F,
    options: SyncOptions,
    accumulator: HashAccumulator,
    authorities: AuthoritySet,
    head: Option<u64>,
    staged: Option<u64>,
    batch: StorageBatch,
    state: watch::Sender<SyncState>,
    objects: u64,
}

impl<S, F> SyncEngine<S, F>
where
    S: Storage + 'static,
    F: BlockFeed,
{
    /// Resume from the committed head in `storage`.
    pub fn new(storage: Arc<S>, feed: F, options: SyncOptions) -> Result<Self, SyncError> {
        let index = IndexStore::new(storage);
        let head = index.head()?;
        let accumulator = match head {
            Some(height) => index.committed_snapshot(height)?.without_hash_list(),
            None => HashAccumulator::new(),
        };
        let authorities = index.authorities()?;
        let (state, _) = watch::channel(SyncState::CatchingUp);
        info!(head = ?head, leaves = accumulator.count(), "sync engine resuming");
        Ok(SyncEngine {
            batch: index.storage().new_batch(),
            index,
            feed,
            options,
            accumulator,
            authorities,
            head,
            staged: head,
            state,
            objects: 0,
        })
    }

    /// Last committed height.
    pub fn head(&self) -> Option<u64> {
        self.head
    }

    /// The in-memory accumulator.
    pub fn accumulator(&self) -> &HashAccumulator {
        &self.accumulator
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Run on the current tokio runtime.
    pub fn spawn(self) -> SyncHandle {
        let graceful = CancellationToken::new();
        let forced = CancellationToken::new();
        let state = self.subscribe();
        let task = tokio::spawn(self.run(graceful.clone(), forced.clone()));
        SyncHandle::new(graceful, forced, state, task)
    }

    /// Ingest until stopped, returning the final committed head.
    ///
    /// Cancelling `graceful` commits the staged heights before returning.
    /// Cancelling `forced` returns as soon as possible and drops them; they
    /// are ingested again by the next engine.
    pub async fn run(
        mut self,
        graceful: CancellationToken,
        forced: CancellationToken,
    ) -> Result<Option<u64>, SyncError> {
        let outcome = self.sync_loop(&graceful, &forced).await;
        let result = match outcome {
            Ok(Interrupt::Graceful) => self.shutdown(),
            Ok(Interrupt::Forced) => {
                warn!(
                    head = ?self.head,
                    abandoned = self.batch.len(),
                    "forced stop, uncommitted heights dropped"
                );
                Ok(())
            }
            Err(e @ SyncError::Fatal { .. }) => {
                error!(error = %e, "sync halted");
                // Heights before the bad one are complete.
                if let Err(flush_error) = self.shutdown() {
                    error!(error = %flush_error, "could not commit heights before the failure");
                }
                Err(e)
            }
            Err(e) => {
                error!(error = %e, "sync halted");
                Err(e)
            }
        };
        self.set_state(SyncState::Stopped);
        result.map(|()| self.head)
    }

    async fn sync_loop(
        &mut self,
        graceful: &CancellationToken,
        forced: &CancellationToken,
    ) -> Result<Interrupt, SyncError> {
        loop {
            if let Some(interrupt) = interrupted(graceful, forced) {
                return Ok(interrupt);
            }
            let feed = &self.feed;
            let tip = match retrying(self.options.retry_delay, graceful, forced, || {
                feed.tip_height()
            })
            .await?
            {
                Wait::Ready(tip) => tip,
                Wait::Interrupted(interrupt) => return Ok(interrupt),
            };

            let next = self.next_height();
            if next > tip {
                // Idle means the committed head is the tip.
                self.flush()?;
                if self.set_state(SyncState::Idle) {
                    info!(head = ?self.head, "caught up");
                }
                if let Some(interrupt) = pause(self.options.poll_interval, graceful, forced).await
                {
                    return Ok(interrupt);
                }
                continue;
            }

            if self.set_state(SyncState::CatchingUp) {
                info!(from = next, tip, "catching up");
            } else {
                debug!(from = next, tip, "ingesting new heights");
            }
            let started = Instant::now();
            for height in next..=tip {
                if let Some(interrupt) = interrupted(graceful, forced) {
                    return Ok(interrupt);
                }
                let feed = &self.feed;
                let record = match retrying(self.options.retry_delay, graceful, forced, || {
                    feed.block_record(height)
                })
                .await?
                {
                    Wait::Ready(record) => record,
                    Wait::Interrupted(interrupt) => return Ok(interrupt),
                };
                self.ingest(&record, height)?;
                if self
                    .options
                    .should_flush(self.batch.len(), height, tip)
                {
                    self.flush()?;
                }
                self.log_progress(height, next, tip, started);
            }
        }
    }

    fn next_height(&self) -> u64 {
        self.staged.map_or(0, |height| height + 1)
    }

    /// Append one height's leaves and stage everything it writes.
    fn ingest(&mut self, record: &BlockRecord, height: u64) -> Result<(), SyncError> {
        record.check(height).map_err(|e| match e {
            FeedError::Malformed { height, reason } => SyncError::Fatal { height, reason },
            FeedError::Unavailable(reason) => SyncError::Fatal { height, reason },
        })?;

        for leaf in record.leaves() {
            if let Some(boundary) = mark::crossing_boundary(self.accumulator.count()) {
                stage_mark(&mut self.batch, boundary, &self.accumulator, leaf);
                debug!(boundary, height, "mark staged");
            }
            self.accumulator.append(leaf);
            self.index.stage_first_seen(&mut self.batch, &leaf, height)?;
        }
        for entry in &record.chain_first_entries {
            self.index
                .stage_chain_head(&mut self.batch, &entry.chain_id, &entry.entry_hash)?;
        }
        if self.authorities.apply(&record.admin_records) {
            info!(height, authorities = self.authorities.len(), "authority set changed");
            self.index
                .stage_authorities(&mut self.batch, &self.authorities);
        }

        let (bytes, digest) = self.accumulator.snapshot();
        self.index
            .stage_height_snapshot(&mut self.batch, height, bytes);
        self.staged = Some(height);
        self.objects += record.leaf_count() as u64;
        debug!(height, leaves = record.leaf_count(), snapshot = %digest, "height staged");
        Ok(())
    }

    /// Commit the batch together with the head record for the last staged
    /// height.
    fn flush(&mut self) -> Result<(), SyncError> {
        let Some(height) = self.staged.filter(|staged| Some(*staged) != self.head) else {
            return Ok(());
        };
        self.index.stage_head(&mut self.batch, height);
        let entries = self.batch.len();
        self.index.commit(&mut self.batch)?;
        self.head = Some(height);
        debug!(height, entries, "batch committed");
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), SyncError> {
        self.flush()?;
        self.index.storage().flush()?;
        info!(head = ?self.head, "sync stopped");
        Ok(())
    }

    fn set_state(&self, new: SyncState) -> bool {
        self.state.send_if_modified(|state| {
            let changed = *state != new;
            *state = new;
            changed
        })
    }

    fn log_progress(&self, height: u64, from: u64, tip: u64, started: Instant) {
        let interval = self.options.progress_interval;
        if interval == 0 || height % interval != 0 || height == from {
            return;
        }
        let done = height - from + 1;
        let remaining = tip - height;
        let per_height = started.elapsed().as_secs_f64() / done as f64;
        info!(
            height,
            objects = self.objects,
            remaining,
            eta_secs = (per_height * remaining as f64) as u64,
            "sync progress"
        );
    }
}

fn interrupted(graceful: &CancellationToken, forced: &CancellationToken) -> Option<Interrupt> {
    if forced.is_cancelled() {
        Some(Interrupt::Forced)
    } else if graceful.is_cancelled() {
        Some(Interrupt::Graceful)
    } else {
        None
    }
}

/// Sleep for `delay` unless a stop arrives first.
async fn pause(
    delay: Duration,
    graceful: &CancellationToken,
    forced: &CancellationToken,
) -> Option<Interrupt> {
    tokio::select! {
        biased;
        _ = forced.cancelled() => Some(Interrupt::Forced),
        _ = graceful.cancelled() => Some(Interrupt::Graceful),
        _ = tokio::time::sleep(delay) => None,
    }
}

/// Call the feed until it answers, sleeping `delay` after each outage.
///
/// Either stop abandons an in-flight call or the sleep between attempts.
async fn retrying<T, Fut>(
    delay: Duration,
    graceful: &CancellationToken,
    forced: &CancellationToken,
    mut call: impl FnMut() -> Fut,
) -> Result<Wait<T>, SyncError>
where
    Fut: Future<Output = Result<T, FeedError>>,
{
    loop {
        let result = tokio::select! {
            biased;
            _ = forced.cancelled() => return Ok(Wait::Interrupted(Interrupt::Forced)),
            _ = graceful.cancelled() => return Ok(Wait::Interrupted(Interrupt::Graceful)),
            result = call() => result,
        };
        match result {
            Ok(value) => return Ok(Wait::Ready(value)),
            Err(FeedError::Unavailable(reason)) => {
                warn!(%reason, retry_in = ?delay, "feed unavailable, retrying");
                if let Some(interrupt) = pause(delay, graceful, forced).await {
                    return Ok(Wait::Interrupted(interrupt));
                }
            }
            Err(FeedError::Malformed { height, reason }) => {
                return Err(SyncError::Fatal { height, reason });
            }
        }
    }
}

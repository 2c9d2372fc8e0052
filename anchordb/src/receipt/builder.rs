//! Receipt construction from committed snapshots and marks.
//!
//! Construction runs in two phases. The object's height is replayed leaf by
//! leaf from the state just before it, crossing into later heights, until
//! either the anchor's leaf count or a mark boundary is reached. From a mark
//! boundary the derivative rests at a level of at least `MARK_POWER`, and
//! each mark restores the state just before that level next carries, so one
//! append of the mark-next moves the derivative up. When the next carry lies
//! beyond the anchor, the derivative's slot is untouched up to the anchor
//! and the anchor's pending array is folded directly.

use std::sync::Arc;

use anchordb_accumulator::{Hash, HashAccumulator, PathTracker, mark};
use anchordb_storage::Storage;
use tracing::{debug, error};

use super::Receipt;
use crate::{Error, Result, index::IndexStore};

/// Builds receipts from committed index state. Never writes.
pub struct ReceiptBuilder<S> {
    index: IndexStore<S>,
}

impl<S> Clone for ReceiptBuilder<S> {
    fn clone(&self) -> Self {
        ReceiptBuilder {
            index: self.index.clone(),
        }
    }
}

impl<S: Storage> ReceiptBuilder<S> {
    /// Builder over `storage`.
    pub fn new(storage: Arc<S>) -> Self {
        ReceiptBuilder {
            index: IndexStore::new(storage),
        }
    }

    /// Highest committed height.
    pub fn head(&self) -> Result<Option<u64>> {
        self.index.head()
    }

    /// First height `object` was seen at.
    pub fn first_seen_height(&self, object: &Hash) -> Result<Option<u64>> {
        self.index.first_seen(object)
    }

    /// First entry hash of `chain_id`.
    pub fn chain_head(&self, chain_id: &Hash) -> Result<Option<Hash>> {
        self.index.chain_head(chain_id)
    }

    /// Receipt for `object`, located by its first-seen height.
    pub fn get_receipt_for_object(&self, object: Hash, anchor_height: u64) -> Result<Receipt> {
        let object_height = self
            .first_seen_height(&object)?
            .ok_or(Error::ObjectNotFound(object))?;
        self.get_receipt(object, object_height, anchor_height)
    }

    /// Receipt proving `object`, appended at `object_height`, is committed
    /// by the root at `anchor_height`.
    pub fn get_receipt(
        &self,
        object: Hash,
        object_height: u64,
        anchor_height: u64,
    ) -> Result<Receipt> {
        if anchor_height < object_height {
            return Err(Error::InvalidRange {
                object_height,
                anchor_height,
            });
        }
        let head = self.index.head()?;
        if head.is_none_or(|head| anchor_height > head) {
            return Err(Error::NotYetAvailable {
                requested: anchor_height,
                head,
            });
        }

        let result = self.build(object, object_height, anchor_height);
        if let Err(e) = &result {
            if e.is_fatal() {
                error!(%object, object_height, anchor_height, error = %e, "receipt construction hit corrupted index");
            }
        }
        result
    }

    fn build(&self, object: Hash, object_height: u64, anchor_height: u64) -> Result<Receipt> {
        let anchor_state = self.index.committed_snapshot(anchor_height)?;
        let anchor_count = anchor_state.count();

        let (mut working, mut snapshot) = self.state_before(object_height)?;
        let log = snapshot.hash_list();
        let position = log.iter().position(|leaf| *leaf == object).ok_or_else(|| {
            Error::Corrupted(format!(
                "object {} is not in the leaf log of height {}",
                object, object_height
            ))
        })?;
        for leaf in &log[..position] {
            working.append(*leaf);
        }

        let mut tracker = PathTracker::new(object);
        let mut height = object_height;
        let mut next = position;
        loop {
            if next == snapshot.hash_list().len() {
                if working.pending() != snapshot.pending() {
                    return Err(Error::Corrupted(format!(
                        "replay of height {} does not reproduce its snapshot",
                        height
                    )));
                }
                if height >= anchor_height {
                    return Err(Error::Corrupted(format!(
                        "replay passed anchor height {} at {} of {} leaves",
                        anchor_height,
                        working.count(),
                        anchor_count
                    )));
                }
                height += 1;
                snapshot = self.index.committed_snapshot(height)?;
                check_continuity(height, working.count(), &snapshot)?;
                next = 0;
                continue;
            }

            working.append_tracking(snapshot.hash_list()[next], &mut tracker);
            next += 1;
            if working.count() == anchor_count || mark::is_boundary(working.count()) {
                break;
            }
        }
        debug!(%object, height, count = working.count(), level = tracker.level(), "replay finished");

        let mut count = working.count();
        let checkpoints = self.index.checkpoints();
        while count < anchor_count {
            let level = tracker.level();
            let boundary = mark::next_carry_boundary(count, level).ok_or_else(|| {
                Error::Corrupted(format!("no carry boundary above {} at level {}", count, level))
            })?;
            if boundary > anchor_count {
                break;
            }
            let mark = checkpoints.get_mark(boundary)?.ok_or_else(|| {
                Error::Corrupted(format!("missing mark {} below anchor count {}", boundary, anchor_count))
            })?;
            if mark.state.pending_at(level) != Some(tracker.derivative()) {
                return Err(Error::Corrupted(format!(
                    "mark {} does not hold the derivative at level {}",
                    boundary, level
                )));
            }
            let mut jumped = mark.state;
            jumped.append_tracking(mark.next, &mut tracker);
            count = jumped.count();
        }

        let anchor = anchor_state.fold_tracking(&mut tracker)?;
        Ok(Receipt {
            object,
            object_height,
            anchor_height,
            steps: tracker.into_steps(),
            anchor,
        })
    }

    /// State just before `height`'s first leaf, and `height`'s snapshot.
    fn state_before(&self, height: u64) -> Result<(HashAccumulator, HashAccumulator)> {
        let snapshot = self.index.committed_snapshot(height)?;
        let prior = match height.checked_sub(1) {
            Some(previous) => self.index.committed_snapshot(previous)?.without_hash_list(),
            None => HashAccumulator::new(),
        };
        check_continuity(height, prior.count(), &snapshot)?;
        Ok((prior, snapshot))
    }
}

/// A height's snapshot must account for exactly its leaf log on top of the
/// previous height.
fn check_continuity(height: u64, prior_count: u64, snapshot: &HashAccumulator) -> Result<()> {
    let logged = snapshot.hash_list().len() as u64;
    if prior_count.checked_add(logged) != Some(snapshot.count()) {
        return Err(Error::Corrupted(format!(
            "height {} holds {} leaves but starts at {} and logs {}",
            height,
            snapshot.count(),
            prior_count,
            logged
        )));
    }
    Ok(())
}

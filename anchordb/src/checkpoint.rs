//! Checkpoint (mark) store.
//!
//! When the accumulator holds `B - 1` leaves for a multiple `B` of
//! [`MARK_INTERVAL`](anchordb_accumulator::MARK_INTERVAL), its state is
//! written under `mark:B` and the leaf about to be appended under
//! `markNext:B`. Both are written once, in the same batch as the height
//! that crosses `B`.

use anchordb_accumulator::{Hash, HashAccumulator};
use anchordb_storage::{Storage, StorageBatch};

use crate::{
    Error, Result,
    keys::{MARK_NEXT, MARKS, decode_hash, height_key},
};

/// A restored mark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mark {
    /// The multiple of the mark interval this mark precedes.
    pub boundary: u64,
    /// Accumulator at `boundary - 1` leaves, without a leaf log.
    pub state: HashAccumulator,
    /// Leaf number `boundary - 1`.
    pub next: Hash,
}

/// Read access to marks.
pub struct CheckpointStore<'a, S> {
    storage: &'a S,
}

impl<'a, S: Storage> CheckpointStore<'a, S> {
    /// Marks stored in `storage`.
    pub fn new(storage: &'a S) -> Self {
        CheckpointStore { storage }
    }

    /// The mark at `boundary`, if committed.
    ///
    /// A mark state without its mark-next (or the reverse) is corruption:
    /// both are written in one batch.
    pub fn get_mark(&self, boundary: u64) -> Result<Option<Mark>> {
        let key = height_key(boundary);
        let state = self.storage.get(&MARKS, &key)?;
        let next = self.storage.get(&MARK_NEXT, &key)?;
        let (state, next) = match (state, next) {
            (None, None) => return Ok(None),
            (Some(state), Some(next)) => (state, next),
            (state, _) => {
                return Err(Error::Corrupted(format!(
                    "mark {} has {} but not {}",
                    boundary,
                    if state.is_some() { "a state" } else { "a next leaf" },
                    if state.is_some() { "a next leaf" } else { "a state" },
                )));
            }
        };
        let state = HashAccumulator::unmarshal(&state)?;
        if boundary.checked_sub(1) != Some(state.count()) {
            return Err(Error::Corrupted(format!(
                "mark {} holds an accumulator of {} leaves",
                boundary,
                state.count()
            )));
        }
        Ok(Some(Mark {
            boundary,
            state,
            next: decode_hash(&next)?,
        }))
    }
}

/// Buffer a mark into `batch`.
///
/// `state` must hold exactly `boundary - 1` leaves; its leaf log is not
/// written.
pub fn stage_mark(batch: &mut StorageBatch, boundary: u64, state: &HashAccumulator, next: Hash) {
    let key = height_key(boundary);
    batch.put(&MARKS, &key, state.marshal_state());
    batch.put(&MARK_NEXT, &key, next.to_bytes().to_vec());
}

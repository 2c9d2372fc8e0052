//! The binary-counter accumulator.
//!
//! `pending[i]` is non-empty iff bit `i` of `count` is set, and then holds
//! the root of the maximal run of `2^i` leaves it covers. Appending a leaf
//! is a binary increment: carries combine `H(slot || incoming)` upward until
//! they reach an empty slot.

use crate::{Error, Hash, PathTracker, Result, Side};

/// Incremental Merkle commitment over every appended leaf.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashAccumulator {
    pub(crate) count: u64,
    pub(crate) pending: Vec<Option<Hash>>,
    pub(crate) hash_list: Vec<Hash>,
}

impl HashAccumulator {
    /// An empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total leaves ever appended.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Pending slots, lowest level first. Never has a trailing empty slot.
    pub fn pending(&self) -> &[Option<Hash>] {
        &self.pending
    }

    /// The slot at `level`, if occupied.
    pub fn pending_at(&self, level: usize) -> Option<Hash> {
        self.pending.get(level).copied().flatten()
    }

    /// Leaves appended since the last snapshot boundary.
    pub fn hash_list(&self) -> &[Hash] {
        &self.hash_list
    }

    /// Number of occupied pending slots.
    pub fn occupied_slots(&self) -> usize {
        self.pending.iter().filter(|slot| slot.is_some()).count()
    }

    /// Append one leaf.
    pub fn append(&mut self, leaf: Hash) {
        self.carry(leaf, None);
    }

    /// Append one leaf while following a tracked derivative.
    ///
    /// Starting a path: create the tracker with `PathTracker::new(object)`
    /// and append `object` itself through this method.
    pub fn append_tracking(&mut self, leaf: Hash, tracker: &mut PathTracker) {
        self.carry(leaf, Some(tracker));
    }

    fn carry(&mut self, leaf: Hash, mut tracker: Option<&mut PathTracker>) {
        let mut incoming = leaf;
        let mut level = 0usize;
        loop {
            if level == self.pending.len() {
                self.pending.push(None);
            }
            match self.pending[level].take() {
                None => {
                    self.pending[level] = Some(incoming);
                    if let Some(t) = tracker.as_deref_mut() {
                        if !t.resting && t.level == level {
                            t.resting = true;
                        }
                    }
                    break;
                }
                Some(slot) => {
                    if let Some(t) = tracker.as_deref_mut() {
                        if t.level == level {
                            if t.resting {
                                // derivative is the slot, sibling arrives from the right
                                t.push(Side::Right, incoming);
                                t.resting = false;
                            } else {
                                t.push(Side::Left, slot);
                            }
                            t.level += 1;
                        }
                    }
                    incoming = Hash::combine(&slot, &incoming);
                    level += 1;
                }
            }
        }
        self.hash_list.push(leaf);
        self.count += 1;
    }

    /// Fold the pending slots into a single root, lowest level first.
    ///
    /// `None` for an empty accumulator.
    pub fn root(&self) -> Option<Hash> {
        self.pending
            .iter()
            .flatten()
            .copied()
            .reduce(|acc, slot| Hash::combine(&slot, &acc))
    }

    /// Fold the pending slots into a root, recording the tracked
    /// derivative's steps along the way.
    ///
    /// The derivative must rest at `tracker.level()` with exactly the value
    /// the tracker holds.
    pub fn fold_tracking(&self, tracker: &mut PathTracker) -> Result<Hash> {
        if !tracker.resting {
            return Err(Error::InconsistentPath(
                "derivative is not resting in a pending slot".into(),
            ));
        }
        let target = tracker.level;
        match self.pending_at(target) {
            Some(slot) if slot == tracker.current => {}
            Some(slot) => {
                return Err(Error::InconsistentPath(format!(
                    "level {} holds {}, derivative is {}",
                    target, slot, tracker.current
                )));
            }
            None => {
                return Err(Error::InconsistentPath(format!(
                    "level {} is empty, derivative is {}",
                    target, tracker.current
                )));
            }
        }

        let mut acc: Option<Hash> = None;
        let mut derivative_in_acc = false;
        for (level, slot) in self.pending.iter().enumerate() {
            let Some(value) = slot else { continue };
            acc = Some(match acc {
                None => {
                    derivative_in_acc = level == target;
                    *value
                }
                Some(running) => {
                    if level == target {
                        tracker.push(Side::Right, running);
                        derivative_in_acc = true;
                    } else if derivative_in_acc {
                        tracker.push(Side::Left, *value);
                    }
                    Hash::combine(value, &running)
                }
            });
        }
        let root = acc.ok_or_else(|| {
            Error::InconsistentPath("fold over an accumulator with no occupied slot".into())
        })?;
        tracker.resting = false;
        tracker.level = self.pending.len();
        Ok(root)
    }

    /// Serialize the current state and close the per-height leaf log.
    ///
    /// Returns the serialized bytes (leaf log included) and their SHA-256.
    pub fn snapshot(&mut self) -> (Vec<u8>, Hash) {
        let bytes = self.marshal();
        let digest = Hash::digest(&bytes);
        self.hash_list.clear();
        (bytes, digest)
    }

    /// Drop the leaf log, keeping `count` and `pending`.
    pub fn clear_hash_list(&mut self) {
        self.hash_list.clear();
    }

    /// A copy of the state without its leaf log.
    pub fn without_hash_list(&self) -> Self {
        HashAccumulator {
            count: self.count,
            pending: self.pending.clone(),
            hash_list: Vec::new(),
        }
    }
}

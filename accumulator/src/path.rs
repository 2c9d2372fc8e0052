//! Inclusion paths.
//!
//! A path is the ordered list of siblings that carry one leaf (the "object")
//! up to a root. The object's running value is its *derivative*; every
//! [`ApplyStep`] combines the derivative with one sibling.

use std::fmt;

use bincode::{Decode, Encode};

use crate::Hash;

/// Which side the sibling sits on when it meets the derivative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode)]
pub enum Side {
    /// Sibling on the right: `H(derivative || sibling)`.
    Right,
    /// Sibling on the left: `H(sibling || derivative)`.
    Left,
}

/// One combination on an inclusion path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode)]
pub struct ApplyStep {
    /// Where the sibling sits.
    pub side: Side,
    /// The sibling hash.
    pub hash: Hash,
}

impl ApplyStep {
    /// Combine `derivative` with this step's sibling.
    pub fn apply(&self, derivative: &Hash) -> Hash {
        match self.side {
            Side::Right => Hash::combine(derivative, &self.hash),
            Side::Left => Hash::combine(&self.hash, derivative),
        }
    }
}

impl fmt::Display for ApplyStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.side {
            Side::Right => write!(f, "R {}", self.hash),
            Side::Left => write!(f, "L {}", self.hash),
        }
    }
}

/// Fold `start` through `steps` in order.
pub fn apply_steps<'a>(start: Hash, steps: impl IntoIterator<Item = &'a ApplyStep>) -> Hash {
    steps.into_iter().fold(start, |acc, step| step.apply(&acc))
}

/// Follows one object's derivative through appends and the final root fold.
///
/// `level` is the pending level the derivative occupies (or is travelling
/// through as a carry). `resting` is true once the derivative has been
/// placed into an empty slot; a resting derivative only moves again when a
/// carry arrives at its level from below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTracker {
    pub(crate) object: Hash,
    pub(crate) current: Hash,
    pub(crate) level: usize,
    pub(crate) resting: bool,
    pub(crate) steps: Vec<ApplyStep>,
}

impl PathTracker {
    /// Start tracking `object`, which is about to be appended.
    pub fn new(object: Hash) -> Self {
        PathTracker {
            object,
            current: object,
            level: 0,
            resting: false,
            steps: Vec::new(),
        }
    }

    /// The tracked object.
    pub fn object(&self) -> Hash {
        self.object
    }

    /// Current derivative value.
    pub fn derivative(&self) -> Hash {
        self.current
    }

    /// Pending level holding the derivative.
    pub fn level(&self) -> usize {
        self.level
    }

    /// Whether the derivative sits in a pending slot.
    pub fn is_resting(&self) -> bool {
        self.resting
    }

    /// Steps recorded so far.
    pub fn steps(&self) -> &[ApplyStep] {
        &self.steps
    }

    /// Consume the tracker, returning its steps.
    pub fn into_steps(self) -> Vec<ApplyStep> {
        self.steps
    }

    pub(crate) fn push(&mut self, side: Side, hash: Hash) {
        let step = ApplyStep { side, hash };
        self.current = step.apply(&self.current);
        self.steps.push(step);
    }
}

//! Binary-counter Merkle accumulator (a Merkle Mountain Range encoded as a
//! binary counter) used by anchordb to commit to every indexed hash.
//!
//! # Core types
//!
//! - [`Hash`]: a 32-byte SHA-256 digest and the `H(left || right)` combine.
//! - [`HashAccumulator`]: the pending array, leaf count and per-height leaf
//!   log, with its exact binary wire format.
//! - [`PathTracker`]: follows one leaf's derivative through appends and the
//!   final root fold, recording the [`ApplyStep`]s of an inclusion path.
//!
//! Mark policy (`MARK_POWER`, `MARK_INTERVAL`) lives in [`mark`].

#![warn(missing_docs)]

mod accumulator;
mod encoding;
mod error;
mod hash;
pub mod mark;
mod path;
#[cfg(test)]
mod tests;

pub use accumulator::HashAccumulator;
pub use error::{Error, Result};
pub use hash::{HASH_LENGTH, Hash};
pub use mark::{MARK_INTERVAL, MARK_POWER};
pub use path::{ApplyStep, PathTracker, Side, apply_steps};

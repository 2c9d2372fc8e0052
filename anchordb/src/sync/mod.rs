//! Block ingestion.
//!
//! One [`SyncEngine`] owns the accumulator and is the only writer of the
//! index. It runs as a spawned task and talks to the rest of the system
//! only through committed storage, its [`SyncState`] channel and the stop
//! tokens held by its [`SyncHandle`].

mod engine;
mod handle;
mod options;

pub use self::{engine::SyncEngine, handle::SyncHandle, options::SyncOptions};

/// What the engine is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Ingesting heights between the head and the tip.
    CatchingUp,
    /// At the tip, polling for new blocks.
    Idle,
    /// Finished; the engine will not write again.
    Stopped,
}

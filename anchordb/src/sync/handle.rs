//! Control of a spawned engine.

use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::SyncState;
use crate::SyncError;

/// Returned by [`SyncEngine::spawn`](super::SyncEngine::spawn).
pub struct SyncHandle {
    graceful: CancellationToken,
    forced: CancellationToken,
    state: watch::Receiver<SyncState>,
    task: JoinHandle<Result<Option<u64>, SyncError>>,
}

impl SyncHandle {
    pub(super) fn new(
        graceful: CancellationToken,
        forced: CancellationToken,
        state: watch::Receiver<SyncState>,
        task: JoinHandle<Result<Option<u64>, SyncError>>,
    ) -> Self {
        SyncHandle {
            graceful,
            forced,
            state,
            task,
        }
    }

    /// Request a stop. The first request lets the engine commit its staged
    /// heights; a second one makes it drop them and return at once.
    pub fn stop(&self) {
        if self.graceful.is_cancelled() {
            info!("forced stop requested");
            self.forced.cancel();
        } else {
            info!("stop requested");
            self.graceful.cancel();
        }
    }

    /// Stop without committing staged heights.
    pub fn force_stop(&self) {
        self.graceful.cancel();
        self.forced.cancel();
    }

    /// Latest published state.
    pub fn state(&self) -> SyncState {
        *self.state.borrow()
    }

    /// A receiver for state changes.
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.clone()
    }

    /// Wait until the engine publishes `state`.
    pub async fn wait_for(&self, state: SyncState) -> bool {
        let mut receiver = self.state.clone();
        receiver.wait_for(|current| *current == state).await.is_ok()
    }

    /// Wait for the engine to finish, returning its final committed head.
    pub async fn join(self) -> Result<Option<u64>, SyncError> {
        self.task
            .await
            .map_err(|e| SyncError::Join(e.to_string()))?
    }
}

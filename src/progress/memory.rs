//! In-memory progress store for tests.

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::error::StoreError;
use super::state::RunState;
use super::ProgressStore;

/// Progress store that keeps the checkpoint in memory.
///
/// Implements the same interface as the file-backed store so engine behavior
/// can be exercised without touching disk. The checkpoint counter lets tests
/// assert on checkpoint cadence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    state: Option<RunState>,
    checkpoints: usize,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-seeded with a checkpoint, as if a prior run saved it.
    #[must_use]
    pub fn with_state(state: RunState) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: Some(state),
                checkpoints: 0,
            }),
        }
    }

    /// Returns a copy of the last checkpointed state.
    pub async fn snapshot(&self) -> Option<RunState> {
        self.inner.lock().await.state.clone()
    }

    /// Returns how many times `checkpoint` has been called.
    pub async fn checkpoint_count(&self) -> usize {
        self.inner.lock().await.checkpoints
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn load(&self) -> Result<Option<RunState>, StoreError> {
        Ok(self.inner.lock().await.state.clone())
    }

    async fn checkpoint(&self, state: &RunState) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.state = Some(state.clone());
        inner.checkpoints += 1;
        Ok(())
    }
}

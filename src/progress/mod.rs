//! Progress persistence for resumable runs.
//!
//! The progress store is the single source of truth for resumability: it
//! records which queries have completed and what they returned, so a
//! restarted process dispatches only what remains. Two guarantees matter:
//!
//! - After `checkpoint` returns, a fresh `load` reproduces a state whose
//!   completed set is a superset of everything checkpointed.
//! - A corrupt or partial checkpoint is "no checkpoint", never a fatal error.
//!
//! # Example
//!
//! ```ignore
//! use harvester_core::progress::{FileStore, ProgressStore, RunState};
//! use harvester_core::spec::ApiVersion;
//!
//! let spec = ApiVersion::V1.spec();
//! let store = FileStore::new("v1_progress.json");
//! let state = match store.load().await? {
//!     Some(saved) => saved.reconciled(&spec),
//!     None => RunState::fresh(&spec),
//! };
//! // ... dispatch state.pending() ...
//! store.checkpoint(&state).await?;
//! ```

mod error;
mod file;
mod memory;
mod state;

pub use error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use state::{QueryOutcome, QueryResult, RunState};

pub(crate) use file::write_atomic;

use async_trait::async_trait;

/// Durable storage for run progress.
///
/// Implementations must make `checkpoint` atomic: a crash during the write
/// leaves either the previous state or the new one readable, never a torn
/// artifact. The medium is the implementation's business; the engine only
/// sees this interface.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Loads the last checkpointed state, or `None` if there is no usable
    /// checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] only for failures of the medium itself that a
    /// retry might fix; absence and corruption are `Ok(None)`.
    async fn load(&self) -> Result<Option<RunState>, StoreError>;

    /// Durably and atomically replaces the checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the state cannot be persisted at all. This
    /// is run-terminating for the caller: an engine that cannot checkpoint
    /// cannot promise resumability.
    async fn checkpoint(&self, state: &RunState) -> Result<(), StoreError>;
}

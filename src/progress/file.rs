//! File-backed progress store with atomic checkpoint writes.
//!
//! The checkpoint is a single JSON document. Writes go to a sibling temp
//! file, are flushed to disk, and then renamed over the real path, so a kill
//! at any instant leaves either the previous checkpoint or the new one,
//! never a torn file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};

use super::error::StoreError;
use super::state::RunState;
use super::ProgressStore;

/// Suffix appended to the checkpoint path for the in-flight temp file.
const TEMP_SUFFIX: &str = ".tmp";

/// Progress store backed by a JSON file on local disk.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Creates a store that persists to the given path.
    ///
    /// The file does not need to exist yet; the first checkpoint creates it.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the checkpoint path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(TEMP_SUFFIX);
        PathBuf::from(name)
    }
}

#[async_trait]
impl ProgressStore for FileStore {
    /// Loads the last checkpointed state.
    ///
    /// Returns `Ok(None)` when the file is missing, unreadable, or fails to
    /// parse. Losing a checkpoint degrades to redoing work; it never halts
    /// the run.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(&self) -> Result<Option<RunState>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no checkpoint file, starting fresh");
                return Ok(None);
            }
            Err(e) => {
                warn!(error = %e, "checkpoint unreadable, discarding it");
                return Ok(None);
            }
        };

        match serde_json::from_slice::<RunState>(&bytes) {
            Ok(state) => {
                debug!(
                    completed = state.completed().len(),
                    pending = state.pending().len(),
                    "loaded checkpoint"
                );
                Ok(Some(state))
            }
            Err(e) => {
                warn!(error = %e, "checkpoint corrupt, discarding it");
                Ok(None)
            }
        }
    }

    /// Atomically replaces the checkpoint with the given state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Write`] if the temp file cannot be written,
    /// flushed, or renamed into place, and [`StoreError::Encode`] if the
    /// state cannot be serialized.
    #[instrument(skip(self, state), fields(path = %self.path.display(), completed = state.completed().len()))]
    async fn checkpoint(&self, state: &RunState) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(state)?;
        write_atomic(&self.path, &self.temp_path(), &bytes).await
    }
}

/// Writes `bytes` to `path` with write-temp, fsync, rename semantics.
///
/// Shared by the checkpoint and the output artifact so both survive a kill
/// mid-write.
pub(crate) async fn write_atomic(
    path: &Path,
    temp: &Path,
    bytes: &[u8],
) -> Result<(), StoreError> {
    let mut file = tokio::fs::File::create(temp)
        .await
        .map_err(|e| StoreError::write(temp, e))?;
    file.write_all(bytes)
        .await
        .map_err(|e| StoreError::write(temp, e))?;
    file.sync_all()
        .await
        .map_err(|e| StoreError::write(temp, e))?;
    drop(file);

    tokio::fs::rename(temp, path)
        .await
        .map_err(|e| StoreError::write(path, e))?;
    debug!(path = %path.display(), bytes = bytes.len(), "artifact written");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::progress::state::QueryResult;
    use crate::spec::QuerySpec;

    fn test_spec() -> QuerySpec {
        QuerySpec::new("ab".chars(), 2, Duration::ZERO, 10).unwrap()
    }

    #[tokio::test]
    async fn test_load_missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("progress.json"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_checkpoint_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("progress.json"));

        let mut state = RunState::fresh(&test_spec());
        state.record_completion(QueryResult::fetched("a", vec!["ann".to_string()], 10, 1));
        store.checkpoint(&state).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded, state);
    }

    #[tokio::test]
    async fn test_load_corrupt_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let store = FileStore::new(&path);
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_checkpoint_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("progress.json"));

        store
            .checkpoint(&RunState::fresh(&test_spec()))
            .await
            .unwrap();

        assert!(!store.temp_path().exists());
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn test_checkpoint_overwrites_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("progress.json"));

        let mut state = RunState::fresh(&test_spec());
        store.checkpoint(&state).await.unwrap();

        state.record_completion(QueryResult::fetched("a", vec![], 10, 1));
        store.checkpoint(&state).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.completed().len(), 1);
    }

    #[tokio::test]
    async fn test_checkpoint_write_failure_is_surfaced() {
        let dir = tempfile::tempdir().unwrap();
        // The parent directory does not exist, so the temp file create fails.
        let store = FileStore::new(dir.path().join("missing").join("progress.json"));

        let result = store.checkpoint(&RunState::fresh(&test_spec())).await;
        assert!(matches!(result, Err(StoreError::Write { .. })));
    }
}

//! Error types for progress persistence.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while persisting run progress.
///
/// Note that a checkpoint that cannot be *read* is not an error: an absent or
/// corrupt checkpoint degrades to redoing work, so `load` reports it as "no
/// checkpoint". Only a checkpoint that cannot be *written* terminates the run.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to write or replace the checkpoint artifact.
    #[error("failed to write {path}: {source}")]
    Write {
        /// The path that could not be written.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to encode state for persistence.
    #[error("failed to encode state: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StoreError {
    /// Creates a write error with path context.
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}

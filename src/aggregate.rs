//! Global result aggregation with provenance.
//!
//! The aggregate maps each discovered name to the set of queries that
//! produced it. It is derived entirely from completed query results, so it
//! can be recomputed from a loaded checkpoint at any time; the engine also
//! updates it incrementally as results land. Merging is idempotent, which
//! makes replaying a result after a crash harmless.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::progress::{QueryResult, RunState, StoreError, write_atomic};

/// Deduplicated name set with per-name provenance.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateResult {
    names: BTreeMap<String, BTreeSet<String>>,
}

/// Shape of the exported output artifact.
#[derive(Serialize)]
struct OutputDocument<'a> {
    total: usize,
    names: &'a BTreeMap<String, BTreeSet<String>>,
}

impl AggregateResult {
    /// Creates an empty aggregate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the aggregate from every completed result in a run state.
    #[must_use]
    pub fn from_state(state: &RunState) -> Self {
        let mut aggregate = Self::new();
        for result in state.completed().values() {
            aggregate.merge(result);
        }
        aggregate
    }

    /// Folds one query's names into the aggregate.
    ///
    /// Idempotent: merging the same result twice leaves the aggregate
    /// unchanged.
    pub fn merge(&mut self, result: &QueryResult) {
        for name in &result.names {
            self.names
                .entry(name.clone())
                .or_default()
                .insert(result.query.clone());
        }
    }

    /// Returns the number of distinct names discovered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true when no names have been discovered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Returns the discovered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }

    /// Returns the queries that produced a name, if it was discovered.
    #[must_use]
    pub fn provenance(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.names.get(name)
    }

    /// Atomically writes the output artifact.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the artifact cannot be encoded or written.
    #[instrument(skip(self), fields(path = %path.display(), names = self.len()))]
    pub async fn write(&self, path: &Path) -> Result<(), StoreError> {
        let document = OutputDocument {
            total: self.names.len(),
            names: &self.names,
        };
        let bytes = serde_json::to_vec_pretty(&document)?;

        let mut temp = path.as_os_str().to_owned();
        temp.push(".tmp");
        write_atomic(path, Path::new(&temp), &bytes).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::spec::QuerySpec;

    fn result_for(query: &str, names: &[&str]) -> QueryResult {
        QueryResult::fetched(
            query,
            names.iter().map(ToString::to_string).collect(),
            10,
            1,
        )
    }

    #[test]
    fn test_merge_scenario() {
        let mut aggregate = AggregateResult::new();
        aggregate.merge(&result_for("a", &["ann", "al"]));
        aggregate.merge(&result_for("b", &["bob"]));

        assert_eq!(aggregate.len(), 3);
        let names: Vec<&str> = aggregate.names().collect();
        assert_eq!(names, ["al", "ann", "bob"]);

        assert_eq!(
            aggregate.provenance("ann").unwrap().iter().next().unwrap(),
            "a"
        );
        assert_eq!(
            aggregate.provenance("bob").unwrap().iter().next().unwrap(),
            "b"
        );
    }

    #[test]
    fn test_merge_is_idempotent() {
        let result = result_for("a", &["ann", "al"]);

        let mut once = AggregateResult::new();
        once.merge(&result);

        let mut twice = once.clone();
        twice.merge(&result);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_tracks_multiple_provenance() {
        let mut aggregate = AggregateResult::new();
        aggregate.merge(&result_for("a", &["anna"]));
        aggregate.merge(&result_for("an", &["anna"]));

        assert_eq!(aggregate.len(), 1);
        let provenance = aggregate.provenance("anna").unwrap();
        assert_eq!(provenance.len(), 2);
        assert!(provenance.contains("a"));
        assert!(provenance.contains("an"));
    }

    #[test]
    fn test_from_state_matches_incremental_merges() {
        let spec = QuerySpec::new("ab".chars(), 2, Duration::ZERO, 10).unwrap();
        let mut state = RunState::fresh(&spec);
        let mut incremental = AggregateResult::new();

        for (query, names) in [("a", vec!["ann", "al"]), ("b", vec!["bob", "al"])] {
            let result = result_for(query, &names);
            incremental.merge(&result);
            state.record_completion(result);
        }

        assert_eq!(AggregateResult::from_state(&state), incremental);
    }

    #[test]
    fn test_empty_result_adds_nothing() {
        let mut aggregate = AggregateResult::new();
        aggregate.merge(&result_for("zz", &[]));
        assert!(aggregate.is_empty());
    }

    #[tokio::test]
    async fn test_write_produces_readable_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("names.json");

        let mut aggregate = AggregateResult::new();
        aggregate.merge(&result_for("a", &["ann"]));
        aggregate.write(&path).await.unwrap();

        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(doc["total"], 1);
        assert_eq!(doc["names"]["ann"][0], "a");
    }
}

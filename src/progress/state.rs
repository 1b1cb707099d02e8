//! Run state and per-query result types.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::enumerator::enumerate;
use crate::spec::QuerySpec;

/// How a query's processing ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryOutcome {
    /// The response was well-formed and below the truncation threshold.
    Complete,
    /// The response hit the per-query result threshold. More names may exist
    /// behind this query; they are recorded as truncated, not chased.
    Truncated,
    /// The retry budget for transient failures was exhausted.
    Failed,
}

impl QueryOutcome {
    /// Returns the checkpoint string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Truncated => "truncated",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for QueryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The recorded result of one query, successful or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    /// The query string that was issued.
    pub query: String,
    /// Names returned by the API, possibly empty.
    pub names: Vec<String>,
    /// How processing ended.
    pub outcome: QueryOutcome,
    /// Unix timestamp (seconds) of the final fetch.
    pub fetched_at: u64,
    /// Total fetch invocations made for this query, including retries.
    pub attempts: u32,
}

impl QueryResult {
    /// Builds a result from a well-formed response.
    ///
    /// A response whose name count reaches `max_results` is truncated to that
    /// threshold and marked [`QueryOutcome::Truncated`].
    #[must_use]
    pub fn fetched(query: &str, mut names: Vec<String>, max_results: usize, attempts: u32) -> Self {
        let outcome = if names.len() >= max_results {
            names.truncate(max_results);
            QueryOutcome::Truncated
        } else {
            QueryOutcome::Complete
        };
        Self {
            query: query.to_string(),
            names,
            outcome,
            fetched_at: unix_now(),
            attempts,
        }
    }

    /// Builds the empty result recorded when the retry budget is exhausted.
    #[must_use]
    pub fn failed(query: &str, attempts: u32) -> Self {
        Self {
            query: query.to_string(),
            names: Vec::new(),
            outcome: QueryOutcome::Failed,
            fetched_at: unix_now(),
            attempts,
        }
    }

    /// Returns true when the query failed rather than returning zero matches.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.outcome == QueryOutcome::Failed
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Durable record of run progress.
///
/// `completed` and `pending` partition the enumerated query set: every
/// enumerated query is in exactly one of the two. The state is the only thing
/// that survives a crash; [`RunState::reconciled`] re-establishes the
/// partition for a state loaded from disk, whatever shape it arrived in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    completed: BTreeMap<String, QueryResult>,
    pending: Vec<String>,
    last_saved: u64,
}

impl RunState {
    /// Creates a fresh state with the full enumeration pending.
    #[must_use]
    pub fn fresh(spec: &QuerySpec) -> Self {
        Self {
            completed: BTreeMap::new(),
            pending: enumerate(spec).collect(),
            last_saved: 0,
        }
    }

    /// Rebuilds the completed/pending partition against the current spec.
    ///
    /// Completed entries for queries outside the enumeration are dropped, and
    /// every enumerated query that is not completed becomes pending, in
    /// enumerator order. This makes a loaded checkpoint safe regardless of
    /// what the file contained: the partition invariant holds on return.
    #[must_use]
    pub fn reconciled(self, spec: &QuerySpec) -> Self {
        let mut completed = self.completed;
        let known: Vec<String> = enumerate(spec).collect();
        completed.retain(|query, _| known.contains(query));

        let pending = known
            .into_iter()
            .filter(|query| !completed.contains_key(query))
            .collect();

        Self {
            completed,
            pending,
            last_saved: self.last_saved,
        }
    }

    /// Moves a query from pending to completed, recording its result.
    ///
    /// Recording the same query twice replaces the earlier result, so a
    /// replayed completion after a crash is harmless.
    pub fn record_completion(&mut self, result: QueryResult) {
        self.pending.retain(|query| query != &result.query);
        self.completed.insert(result.query.clone(), result);
    }

    /// Returns the next query to dispatch, if any remain.
    #[must_use]
    pub fn next_pending(&self) -> Option<String> {
        self.pending.first().cloned()
    }

    /// Returns the pending queries in dispatch order.
    #[must_use]
    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    /// Returns the completed query results.
    #[must_use]
    pub fn completed(&self) -> &BTreeMap<String, QueryResult> {
        &self.completed
    }

    /// Returns true when nothing remains to dispatch.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.pending.is_empty()
    }

    /// Returns the unix timestamp of the last checkpoint, zero if never saved.
    #[must_use]
    pub fn last_saved(&self) -> u64 {
        self.last_saved
    }

    /// Stamps the state as saved now. Called just before a checkpoint write.
    pub fn touch_saved(&mut self) {
        self.last_saved = unix_now();
    }
}

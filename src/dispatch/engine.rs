//! The harvest engine: the run loop over the pending query sequence.
//!
//! The engine loads (or starts) a run state, dispatches the pending queries
//! one at a time in enumerator order, folds each result into the aggregate,
//! and checkpoints on a configurable cadence plus always on interrupt and at
//! the end. Per-query failures never escape the loop; only configuration
//! problems, checkpoint-write failures, and an explicit throttle-ceiling
//! abort do.
//!
//! # Example
//!
//! ```no_run
//! use harvester_core::{ApiVersion, BackoffPolicy, FileStore, HarvestEngine, HttpFetcher};
//! use tokio::sync::watch;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let spec = ApiVersion::V1.spec();
//! let fetcher = HttpFetcher::new("http://127.0.0.1:8000", ApiVersion::V1)?;
//! let store = FileStore::new("v1_progress.json");
//! let (_shutdown_tx, shutdown_rx) = watch::channel(false);
//!
//! let engine = HarvestEngine::new(BackoffPolicy::new(spec.min_delay()), shutdown_rx);
//! let report = engine.run(&spec, &fetcher, &store, None).await?;
//! println!("{} names discovered", report.stats.names_discovered());
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use tokio::sync::watch;
use tracing::{info, instrument, warn};

use super::dispatcher::{DispatchOutcome, dispatch_query};
use super::pacer::RequestPacer;
use super::retry::BackoffPolicy;
use crate::aggregate::AggregateResult;
use crate::fetch::NameFetcher;
use crate::progress::{ProgressStore, QueryResult, RunState, StoreError};
use crate::spec::QuerySpec;

/// Error type for engine runs.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Progress could not be persisted; resumability cannot be promised.
    #[error("cannot persist progress: {0}")]
    Store(#[from] StoreError),

    /// A query stayed throttled past the configured ceiling.
    #[error("query {query:?} still throttled after {attempts} attempts")]
    ThrottleExhausted {
        /// The query that could not get through.
        query: String,
        /// Fetch invocations made before aborting.
        attempts: u32,
    },
}

/// Counters for one engine run.
///
/// Counts cover this run only; results restored from a checkpoint are not
/// re-counted.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HarvestStats {
    completed: usize,
    failed: usize,
    retried: usize,
    names_discovered: usize,
    interrupted: bool,
}

impl HarvestStats {
    /// Queries that produced a usable result this run.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Queries recorded as failed after exhausting their retry budget.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Retry fetches beyond each query's first attempt.
    #[must_use]
    pub fn retried(&self) -> usize {
        self.retried
    }

    /// Distinct names in the aggregate when the run ended.
    #[must_use]
    pub fn names_discovered(&self) -> usize {
        self.names_discovered
    }

    /// True when the run stopped on the shutdown signal rather than
    /// exhausting the enumeration.
    #[must_use]
    pub fn interrupted(&self) -> bool {
        self.interrupted
    }

    /// Queries processed this run.
    #[must_use]
    pub fn total(&self) -> usize {
        self.completed + self.failed
    }

    fn record(&mut self, result: &QueryResult) {
        if result.is_failed() {
            self.failed += 1;
        } else {
            self.completed += 1;
        }
        self.retried += result.attempts.saturating_sub(1) as usize;
    }
}

/// What a finished run hands back to the caller.
#[derive(Debug)]
pub struct HarvestReport {
    /// Counters for this run.
    pub stats: HarvestStats,
    /// The aggregate over everything completed, this run and prior ones.
    pub aggregate: AggregateResult,
}

/// Observer for per-query progress, kept abstract so the core stays free of
/// presentation concerns.
pub trait ProgressReporter: Send + Sync {
    /// Called after each query completes.
    ///
    /// `done` counts completed queries out of `total` enumerated, and
    /// `names` is the current aggregate size.
    fn on_query(&self, done: usize, total: usize, query: &str, names: usize);
}

/// Reporter that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn on_query(&self, _done: usize, _total: usize, _query: &str, _names: usize) {}
}

/// Drives a whole run: load, dispatch pending, aggregate, checkpoint.
pub struct HarvestEngine {
    policy: BackoffPolicy,
    checkpoint_every: u32,
    shutdown: watch::Receiver<bool>,
    reporter: Box<dyn ProgressReporter>,
}

impl HarvestEngine {
    /// Creates an engine that checkpoints after every query.
    ///
    /// `shutdown` flips to true when the operator requests a stop; the
    /// engine observes it at its suspension points, checkpoints, and exits.
    #[must_use]
    pub fn new(policy: BackoffPolicy, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            policy,
            checkpoint_every: 1,
            shutdown,
            reporter: Box::new(NullReporter),
        }
    }

    /// Checkpoints after every `n` completed queries instead (minimum 1).
    #[must_use]
    pub fn with_checkpoint_every(mut self, n: u32) -> Self {
        self.checkpoint_every = n.max(1);
        self
    }

    /// Installs a progress observer.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Box<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Runs until the enumeration is exhausted or shutdown is requested.
    ///
    /// When `output` is given, the aggregate artifact is rewritten at each
    /// checkpoint, so a killed run still leaves a readable export behind.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Store`] when a checkpoint cannot be written
    /// and [`EngineError::ThrottleExhausted`] when a configured throttle
    /// ceiling is hit. In both cases the last good state was checkpointed
    /// if at all possible.
    #[instrument(skip_all, fields(checkpoint_every = self.checkpoint_every))]
    pub async fn run(
        &self,
        spec: &QuerySpec,
        fetcher: &dyn NameFetcher,
        store: &dyn ProgressStore,
        output: Option<&Path>,
    ) -> Result<HarvestReport, EngineError> {
        let mut state = match store.load().await? {
            Some(saved) => {
                let saved = saved.reconciled(spec);
                info!(
                    completed = saved.completed().len(),
                    pending = saved.pending().len(),
                    "resuming from checkpoint"
                );
                saved
            }
            None => {
                let fresh = RunState::fresh(spec);
                info!(pending = fresh.pending().len(), "starting fresh run");
                fresh
            }
        };

        let total = state.completed().len() + state.pending().len();
        let mut aggregate = AggregateResult::from_state(&state);
        let mut pacer = RequestPacer::new(spec.min_delay());
        let mut shutdown = self.shutdown.clone();
        let mut stats = HarvestStats::default();
        let mut since_checkpoint: u32 = 0;

        while let Some(query) = state.next_pending() {
            if *shutdown.borrow() {
                stats.interrupted = true;
                break;
            }

            match dispatch_query(
                &query,
                spec,
                fetcher,
                &mut pacer,
                &self.policy,
                &mut shutdown,
            )
            .await
            {
                DispatchOutcome::Completed(result) => {
                    stats.record(&result);
                    aggregate.merge(&result);
                    state.record_completion(result);
                    self.reporter
                        .on_query(state.completed().len(), total, &query, aggregate.len());

                    since_checkpoint += 1;
                    if since_checkpoint >= self.checkpoint_every {
                        self.persist(store, &mut state, &aggregate, output).await?;
                        since_checkpoint = 0;
                    }
                }
                DispatchOutcome::Interrupted => {
                    info!(query, "interrupted, checkpointing before exit");
                    stats.interrupted = true;
                    break;
                }
                DispatchOutcome::ThrottleExhausted { attempts } => {
                    // Persist what we have before surfacing the abort.
                    self.persist(store, &mut state, &aggregate, output).await?;
                    return Err(EngineError::ThrottleExhausted { query, attempts });
                }
            }
        }

        self.persist(store, &mut state, &aggregate, output).await?;
        stats.names_discovered = aggregate.len();

        info!(
            completed = stats.completed(),
            failed = stats.failed(),
            retried = stats.retried(),
            names = stats.names_discovered(),
            interrupted = stats.interrupted(),
            remaining = state.pending().len(),
            "run finished"
        );

        Ok(HarvestReport { stats, aggregate })
    }

    async fn persist(
        &self,
        store: &dyn ProgressStore,
        state: &mut RunState,
        aggregate: &AggregateResult,
        output: Option<&Path>,
    ) -> Result<(), StoreError> {
        state.touch_saved();
        store.checkpoint(state).await?;
        if let Some(path) = output {
            if let Err(e) = aggregate.write(path).await {
                // The checkpoint is the source of truth; a failed export is
                // recoverable on the next cadence tick.
                warn!(error = %e, "could not write output artifact");
            }
        }
        Ok(())
    }
}

//! Rate-limited dispatch: pacing, backoff, and the run loop.
//!
//! # Overview
//!
//! The dispatch system consists of:
//! - [`RequestPacer`] - minimum interval between request dispatches
//! - [`BackoffPolicy`] - exponential backoff and retry ceilings
//! - [`DispatchOutcome`] - how one query's dispatch ended
//! - [`HarvestEngine`] - the run loop over the pending query sequence
//! - [`HarvestStats`] / [`HarvestReport`] - what a run hands back
//!
//! Exactly one request is in flight at a time. The rate limit is per API
//! version, and concurrency above one would need coordinated rate accounting
//! across workers; that is deliberately out of scope.

mod dispatcher;
mod engine;
mod pacer;
mod retry;

pub use dispatcher::DispatchOutcome;
pub use engine::{
    EngineError, HarvestEngine, HarvestReport, HarvestStats, NullReporter, ProgressReporter,
};
pub use pacer::RequestPacer;
pub use retry::{BackoffPolicy, DEFAULT_TRANSIENT_ATTEMPTS};

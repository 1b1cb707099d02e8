//! Per-query dispatch state machine.
//!
//! One query moves through `IDLE -> WAITING -> IN_FLIGHT` and ends in
//! success, throttled, or failed. Throttled and failed loop back through a
//! backoff sleep into another waiting/in-flight round. The suspension points
//! (the pacing wait and the backoff sleep) observe the shutdown signal; the
//! in-flight fetch itself is never abandoned, so a response that arrives is
//! always recorded.

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::pacer::RequestPacer;
use super::retry::BackoffPolicy;
use crate::fetch::NameFetcher;
use crate::progress::QueryResult;
use crate::spec::QuerySpec;

/// How a single query's dispatch ended.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// A result was produced, successful or failed-and-skipped. The query
    /// leaves the pending set either way.
    Completed(QueryResult),
    /// Shutdown was observed before a response arrived. The query stays
    /// pending and is re-attempted on the next run.
    Interrupted,
    /// The throttle retry ceiling was reached. Surfaced to the caller as an
    /// explicit abort rather than a silent drop.
    ThrottleExhausted {
        /// Fetch invocations made before giving up.
        attempts: u32,
    },
}

/// Resolves when the shutdown flag becomes true; pends forever if the
/// sender is gone (no shutdown can arrive then).
async fn shutdown_signalled(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Dispatches one query with pacing, backoff, and retry.
///
/// Transient failures consume the bounded attempt budget; throttling does
/// not. A retried query retains its position; the retry loop lives here, not
/// in the queue.
pub(crate) async fn dispatch_query(
    query: &str,
    spec: &QuerySpec,
    fetcher: &dyn NameFetcher,
    pacer: &mut RequestPacer,
    policy: &BackoffPolicy,
    shutdown: &mut watch::Receiver<bool>,
) -> DispatchOutcome {
    let mut attempts: u32 = 0;
    let mut throttle_failures: u32 = 0;
    let mut transient_failures: u32 = 0;

    loop {
        // WAITING: pace by issue time, shutdown-aware.
        tokio::select! {
            () = shutdown_signalled(shutdown) => return DispatchOutcome::Interrupted,
            () = pacer.wait_turn() => {}
        }

        // IN_FLIGHT: the fetch is not raced against shutdown so a received
        // response is never left unrecorded.
        attempts += 1;
        match fetcher.fetch(query).await {
            Ok(names) => {
                debug!(query, attempts, names = names.len(), "query succeeded");
                return DispatchOutcome::Completed(QueryResult::fetched(
                    query,
                    names,
                    spec.max_results(),
                    attempts,
                ));
            }
            Err(error) if error.is_throttle() => {
                throttle_failures += 1;
                if let Some(ceiling) = policy.throttle_attempts() {
                    if throttle_failures >= ceiling {
                        warn!(query, attempts, "throttle ceiling reached");
                        return DispatchOutcome::ThrottleExhausted { attempts };
                    }
                }
                // Server-requested waits floor the computed backoff.
                let backoff = policy
                    .delay_for(throttle_failures - 1)
                    .max(error.retry_after().unwrap_or_default());
                warn!(
                    query,
                    attempt = attempts,
                    backoff_ms = backoff.as_millis(),
                    "throttled, backing off"
                );
                tokio::select! {
                    () = shutdown_signalled(shutdown) => return DispatchOutcome::Interrupted,
                    () = sleep(backoff) => {}
                }
            }
            Err(error) => {
                transient_failures += 1;
                if transient_failures >= policy.transient_attempts() {
                    warn!(
                        query,
                        attempts,
                        error = %error,
                        "retry budget exhausted, recording failure and moving on"
                    );
                    return DispatchOutcome::Completed(QueryResult::failed(query, attempts));
                }
                let backoff = policy.delay_for(transient_failures - 1);
                warn!(
                    query,
                    attempt = attempts,
                    error = %error,
                    backoff_ms = backoff.as_millis(),
                    "fetch failed, backing off"
                );
                tokio::select! {
                    () = shutdown_signalled(shutdown) => return DispatchOutcome::Interrupted,
                    () = sleep(backoff) => {}
                }
            }
        }
    }
}

//! The fetch collaborator: one query in, a list of names out.
//!
//! The engine is transport-agnostic. It sees a [`NameFetcher`] trait object
//! and a [`FetchError`] that distinguishes exactly what the dispatcher needs
//! to distinguish: throttling (always retried with backoff, never counted
//! against the failure budget) versus everything else (transient, retried a
//! bounded number of times). HTTP details live in [`http::HttpFetcher`].

mod http;

pub use http::HttpFetcher;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by a fetch attempt.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The API signalled that the caller exceeded its permitted request rate.
    #[error("throttled on query {query:?}")]
    Throttled {
        /// The query that was throttled.
        query: String,
        /// Server-requested wait before retrying, when supplied.
        retry_after: Option<Duration>,
    },

    /// The API returned a non-success, non-throttle status.
    #[error("HTTP {status} on query {query:?}")]
    HttpStatus {
        /// The query that failed.
        query: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Network-level failure (DNS, connection refused, reset, TLS).
    #[error("network error on query {query:?}: {source}")]
    Network {
        /// The query that failed.
        query: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The request timed out before a response arrived.
    #[error("timeout on query {query:?}")]
    Timeout {
        /// The query that timed out.
        query: String,
    },

    /// The response arrived but its body could not be decoded.
    #[error("malformed response on query {query:?}: {source}")]
    Decode {
        /// The query whose response was malformed.
        query: String,
        /// The underlying decode error.
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// Creates a throttle signal.
    pub fn throttled(query: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self::Throttled {
            query: query.into(),
            retry_after,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(query: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            query: query.into(),
            status,
        }
    }

    /// Creates a network error.
    pub fn network(query: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            query: query.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(query: impl Into<String>) -> Self {
        Self::Timeout {
            query: query.into(),
        }
    }

    /// Creates a decode error.
    pub fn decode(query: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Decode {
            query: query.into(),
            source,
        }
    }

    /// Returns true for the throttle signal, which retries without bound.
    #[must_use]
    pub fn is_throttle(&self) -> bool {
        matches!(self, Self::Throttled { .. })
    }

    /// Returns the server-requested wait, if the error carries one.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Throttled { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// An opaque capability that resolves a query to matching names.
///
/// Implementations must not retry internally; retry and pacing belong to the
/// dispatcher so attempt counting and backoff stay observable.
#[async_trait]
pub trait NameFetcher: Send + Sync {
    /// Fetches the names matching a query.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Throttled`] on a 429-equivalent signal and
    /// another variant for any other transport or decode failure.
    async fn fetch(&self, query: &str) -> Result<Vec<String>, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttled_is_throttle_and_carries_retry_after() {
        let error = FetchError::throttled("aa", Some(Duration::from_secs(7)));
        assert!(error.is_throttle());
        assert_eq!(error.retry_after(), Some(Duration::from_secs(7)));
    }

    #[test]
    fn test_http_status_is_not_throttle() {
        let error = FetchError::http_status("aa", 503);
        assert!(!error.is_throttle());
        assert_eq!(error.retry_after(), None);
    }

    #[test]
    fn test_error_display_includes_query() {
        let error = FetchError::timeout("ab");
        assert!(error.to_string().contains("ab"));

        let error = FetchError::http_status("ba", 500);
        let msg = error.to_string();
        assert!(msg.contains("500"), "expected status in: {msg}");
        assert!(msg.contains("ba"), "expected query in: {msg}");
    }
}

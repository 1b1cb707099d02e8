//! HTTP implementation of the fetch collaborator.
//!
//! A thin reqwest client for the autocomplete endpoint. Queries are
//! percent-encoded (the v3 alphabet contains a space), the JSON envelope's
//! `results` field is tolerated when absent, and a 429 response is converted
//! into the throttle signal with its Retry-After header parsed when present.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;

use super::{FetchError, NameFetcher};
use crate::spec::{ApiVersion, ConfigError};

/// Connection establishment timeout.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Whole-request timeout; responses are small JSON bodies.
const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Maximum honored Retry-After value. Anything above this is capped so a
/// misbehaving server cannot park the run for hours.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(120);

/// Response envelope returned by the autocomplete endpoint.
///
/// A missing `results` field decodes as an empty list rather than an error.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    results: Vec<String>,
}

/// Fetcher that issues GET requests against one version of the endpoint.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    endpoint: Url,
}

impl HttpFetcher {
    /// Creates a fetcher for `base_url` and the given API version.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] if the base URL does not parse.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static timeout
    /// configuration. This should never happen in practice.
    #[allow(clippy::expect_used)]
    #[instrument(skip_all, fields(base_url = %base_url, version = %version))]
    pub fn new(base_url: &str, version: ApiVersion) -> Result<Self, ConfigError> {
        let base = Url::parse(base_url).map_err(|source| ConfigError::InvalidBaseUrl {
            url: base_url.to_string(),
            source,
        })?;
        let endpoint = base
            .join(&format!("{}/autocomplete", version.as_str()))
            .map_err(|source| ConfigError::InvalidBaseUrl {
                url: base_url.to_string(),
                source,
            })?;

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .gzip(true)
            .build()
            .expect("failed to build HTTP client with static configuration");

        debug!(endpoint = %endpoint, "created fetcher");
        Ok(Self { client, endpoint })
    }

    fn request_url(&self, query: &str) -> String {
        format!("{}?query={}", self.endpoint, urlencoding::encode(query))
    }
}

#[async_trait]
impl NameFetcher for HttpFetcher {
    #[instrument(skip(self), fields(query = %query))]
    async fn fetch(&self, query: &str) -> Result<Vec<String>, FetchError> {
        let url = self.request_url(query);

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::timeout(query)
            } else {
                FetchError::network(query, e)
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(parse_retry_after);
            warn!(?retry_after, "throttled by server");
            return Err(FetchError::throttled(query, retry_after));
        }
        if !status.is_success() {
            return Err(FetchError::http_status(query, status.as_u16()));
        }

        let envelope: Envelope = response
            .json()
            .await
            .map_err(|e| FetchError::decode(query, e))?;

        debug!(names = envelope.results.len(), "fetched");
        Ok(envelope.results)
    }
}

/// Parses a Retry-After header value into a Duration.
///
/// Supports both RFC 7231 forms, integer seconds and HTTP-date. Returns
/// `None` if the value cannot be parsed; caps excessive values at
/// [`MAX_RETRY_AFTER`].
#[must_use]
pub fn parse_retry_after(header_value: &str) -> Option<Duration> {
    let header_value = header_value.trim();

    if let Ok(seconds) = header_value.parse::<i64>() {
        if seconds < 0 {
            debug!(seconds, "negative Retry-After value, ignoring");
            return None;
        }
        #[allow(clippy::cast_sign_loss)]
        let duration = Duration::from_secs(seconds as u64);
        return Some(duration.min(MAX_RETRY_AFTER));
    }

    if let Ok(datetime) = httpdate::parse_http_date(header_value) {
        let now = std::time::SystemTime::now();
        match datetime.duration_since(now) {
            Ok(duration) => Some(duration.min(MAX_RETRY_AFTER)),
            // Date is in the past
            Err(_) => Some(Duration::ZERO),
        }
    } else {
        debug!(header_value, "unparseable Retry-After value");
        None
    }
}

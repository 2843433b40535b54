//! Remote document retrieval
//!
//! One `SiteClient` is built per run and shared by every fetch task.

use crate::error::FetchError;
use crate::fetch::decode::decode_payload;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde_json::Value;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};
use url::Url;

/// Default `User-Agent` sent with every request
pub const DEFAULT_USER_AGENT: &str = "okhttp/3.15";

/// Default per-request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Anything that can turn a URL into a parsed site document.
///
/// The aggregator and pipeline only talk to this trait, so tests can swap
/// in canned documents and controlled delays.
pub trait DocumentSource: Send + Sync {
    /// Fetch and decode the document at `url` (fragment already stripped)
    fn fetch_document(&self, url: &str) -> impl Future<Output = Result<Value, FetchError>> + Send;
}

/// Options for the HTTP client
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Per-request timeout in milliseconds (default: 15000)
    pub timeout_ms: u64,
    /// User agent string (default: okhttp/3.15)
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_SECS * 1000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// HTTP client for site documents
#[derive(Clone)]
pub struct SiteClient {
    client: reqwest::Client,
    timeout_ms: u64,
}

impl SiteClient {
    /// Create a client with the fixed identifying header set
    pub fn new(options: &FetchOptions) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        let ua = HeaderValue::from_str(&options.user_agent)
            .map_err(|e| FetchError::Transport(format!("invalid user agent: {}", e)))?;
        headers.insert(USER_AGENT, ua);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(options.timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            timeout_ms: options.timeout_ms,
        })
    }

    /// Per-request timeout in milliseconds
    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    /// GET `url` and decode the body. Failures are logged and returned.
    #[instrument(skip(self))]
    pub async fn get_document(&self, url: &str) -> Result<Value, FetchError> {
        let started = Instant::now();
        let result = self.get_inner(url).await;

        match &result {
            Ok(_) => debug!("Fetched {} in {}ms", url, started.elapsed().as_millis()),
            Err(e) => warn!("Fetch failed for {}: {}", url, e),
        }

        result
    }

    async fn get_inner(&self, url: &str) -> Result<Value, FetchError> {
        let parsed = validate_url(url)?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await.map_err(|e| self.classify(e))?;
        decode_payload(&body)
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout_ms)
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

impl DocumentSource for SiteClient {
    async fn fetch_document(&self, url: &str) -> Result<Value, FetchError> {
        self.get_document(url).await
    }
}

/// Check that `url` is an absolute http(s) URL
pub fn validate_url(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(FetchError::InvalidUrl(format!(
            "{}: unsupported scheme '{}'",
            url, other
        ))),
    }
}

/// Whether a configured location points at a remote document
pub fn is_remote(location: &str) -> bool {
    let lower = location.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

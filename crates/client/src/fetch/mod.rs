//! HTTP transport to the catalog.
//!
//! ### Transport Seam
//! - The engine talks to the catalog only through [`CatalogTransport`], so the
//!   session and retry logic can be driven by canned responses in tests.
//! - [`FetchClient`] is the production implementation on top of reqwest.
//!
//! ### Cookies
//! - The session cookie is attached explicitly per request; the client keeps
//!   no cookie jar of its own.
//! - `Set-Cookie` values of a response are reduced to their `name=value` part.
//!
//! ### Limits
//! - Per-request timeout (default: 20s)
//! - Max body bytes (default: 2MB)
//! - Max redirects: 5

pub mod url;

use bytes::Bytes;
use reqwest::{Client, header};
use std::time::{Duration, Instant};

pub use url::{CatalogUrls, UrlError, canonicalize};

use shelfcheck_core::Error;

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "shelfcheck/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 2MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "shelfcheck/0.1".to_string(),
            max_bytes: 2 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

/// Transport-level failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("status {0}")]
    Status(u16),

    #[error("{size} bytes exceeds {limit}")]
    TooLarge { size: usize, limit: usize },
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::TooLarge { .. } => Error::FetchTooLarge(err.to_string()),
            other => Error::TransportError(other.to_string()),
        }
    }
}

/// Response from a catalog request.
#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    /// The final URL after redirects
    pub final_url: String,
    /// HTTP status code
    pub status: u16,
    /// `name=value` pairs from every `Set-Cookie` header
    pub set_cookies: Vec<String>,
    /// Response body, lossily decoded as UTF-8
    pub body: String,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl FetchResponse {
    /// All response cookies joined into a single `Cookie` header value.
    pub fn cookie_header(&self) -> Option<String> {
        if self.set_cookies.is_empty() { None } else { Some(self.set_cookies.join("; ")) }
    }
}

/// Reduce a `Set-Cookie` header value to its `name=value` pair.
pub fn cookie_pair(set_cookie: &str) -> Option<String> {
    let pair = set_cookie.split(';').next()?.trim();
    if pair.is_empty() || !pair.contains('=') { None } else { Some(pair.to_string()) }
}

/// Outbound GET requests against the catalog.
///
/// Non-2xx responses are reported as [`TransportError::Status`].
#[async_trait::async_trait]
pub trait CatalogTransport: Send + Sync {
    async fn get(&self, url: &str, cookie: Option<&str>) -> Result<FetchResponse, TransportError>;
}

/// reqwest-backed catalog transport.
#[derive(Debug, Clone)]
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::TransportError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl CatalogTransport for FetchClient {
    async fn get(&self, url: &str, cookie: Option<&str>) -> Result<FetchResponse, TransportError> {
        let start = Instant::now();

        let mut request = self
            .http
            .get(url)
            .header(header::ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8");
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() { TransportError::Timeout(e.to_string()) } else { TransportError::Network(e.to_string()) }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(TransportError::TooLarge { size: len as usize, limit: self.config.max_bytes });
        }

        let final_url = response.url().to_string();
        let set_cookies: Vec<String> = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(cookie_pair)
            .collect();

        let bytes: Bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(e.to_string())
            } else {
                TransportError::Network(format!("failed to read response: {}", e))
            }
        })?;

        if bytes.len() > self.config.max_bytes {
            return Err(TransportError::TooLarge { size: bytes.len(), limit: self.config.max_bytes });
        }

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!("fetched {} in {}ms ({} bytes)", final_url, fetch_ms, bytes.len());

        Ok(FetchResponse {
            final_url,
            status: status.as_u16(),
            set_cookies,
            body: String::from_utf8_lossy(&bytes).into_owned(),
            fetch_ms,
        })
    }
}

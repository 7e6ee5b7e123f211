//! Catalog lookup engine.
//!
//! [`CatalogEngine::find_availability`] drives one lookup through:
//!
//! ```text
//! CacheCheck -> SessionEnsure -> ThrottledFetch -> ResponseTriage
//!     -> Retry (session expired, once)
//!     -> ExtractAndMatch -> CacheStore -> Done
//! ```
//!
//! ### Failure Policy
//! - An expiry page triggers exactly one retry: invalidate, re-ensure, refetch.
//!   A second expiry is returned as `SESSION_EXPIRED`.
//! - Error pages, transport failures, handshake failures and the overall
//!   deadline end the lookup with an error result that is never cached.
//! - Misses (with or without catalog hits) are cached as negative results.
//!
//! ### Fallback
//! - A query with a year that yields no candidates is searched once more by
//!   title alone when `title_only_fallback` is enabled.

pub mod session;
pub mod throttle;

#[cfg(test)]
pub(crate) mod testing;

pub use session::SessionManager;
pub use throttle::{RequestThrottler, ThrottlePermit};

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use shelfcheck_core::{AppConfig, Error, Query, QueryResult, ResultCache};

use crate::extract::{Availability, Candidate, ResultExtractor, Triage, has_any_results, triage};
use crate::fetch::{CatalogTransport, CatalogUrls, FetchClient, FetchConfig};
use crate::matcher::select_best;

/// Note attached to a negative result when the catalog had hits but none matched.
pub const NOTE_NO_MATCH: &str = "catalog returned results but none matched the title";

/// Note attached to a negative result when the catalog had no usable hits.
pub const NOTE_NO_RESULTS: &str = "no results";

/// Note attached to a match whose copy is currently lent out.
pub const NOTE_ON_LOAN: &str = "on loan";

/// Retries allowed after a session-expiry page.
const EXPIRY_RETRIES: u8 = 1;

/// Runtime configuration of the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Catalog base URL, e.g. `https://opac.example.org/webOPACClient`
    pub base_url: String,
    /// Value of the `Login` handshake parameter
    pub login_id: String,
    /// HTTP transport settings
    pub fetch: FetchConfig,
    /// Deadline for one whole lookup, including queueing (default: 90s)
    pub query_timeout: Duration,
    /// Concurrent catalog requests (default: 5)
    pub max_concurrent: usize,
    /// Minimum gap between catalog requests (default: 200ms)
    pub request_spacing: Duration,
    /// Session lifetime (default: 5min)
    pub session_ttl: Duration,
    /// Result retention (default: 1h)
    pub cache_ttl: Duration,
    /// Sweep period of the result cache (default: 5min)
    pub cache_sweep_interval: Duration,
    /// Repeat a yearless search when the year search finds nothing (default: true)
    pub title_only_fallback: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            login_id: "opacdirect".to_string(),
            fetch: FetchConfig::default(),
            query_timeout: Duration::from_secs(90),
            max_concurrent: 5,
            request_spacing: Duration::from_millis(200),
            session_ttl: Duration::from_secs(300),
            cache_ttl: Duration::from_secs(3600),
            cache_sweep_interval: Duration::from_secs(300),
            title_only_fallback: true,
        }
    }
}

impl EngineConfig {
    /// Build the engine configuration from loaded application settings.
    ///
    /// # Errors
    ///
    /// Returns `INVALID_INPUT` if no base URL is configured.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let base_url = config.require_base_url().map_err(|e| Error::InvalidInput(e.to_string()))?;

        Ok(Self {
            base_url: base_url.to_string(),
            login_id: config.login_id.clone(),
            fetch: FetchConfig {
                user_agent: config.user_agent.clone(),
                max_bytes: config.max_bytes,
                timeout: config.timeout(),
                ..FetchConfig::default()
            },
            query_timeout: config.query_timeout(),
            max_concurrent: config.max_concurrent,
            request_spacing: config.request_spacing(),
            session_ttl: config.session_ttl(),
            cache_ttl: config.cache_ttl(),
            cache_sweep_interval: config.cache_sweep_interval(),
            title_only_fallback: config.title_only_fallback,
        })
    }
}

/// Outcome of one search round trip.
struct SearchOutcome {
    candidates: Vec<Candidate>,
    any_results: bool,
}

/// Resolves film titles against the catalog.
///
/// Owns the session, throttle and result cache; build one per catalog and
/// share it behind an `Arc`.
pub struct CatalogEngine {
    config: EngineConfig,
    transport: Arc<dyn CatalogTransport>,
    urls: CatalogUrls,
    session: SessionManager,
    throttle: RequestThrottler,
    extractor: ResultExtractor,
    cache: Arc<ResultCache>,
}

impl std::fmt::Debug for CatalogEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogEngine")
            .field("config", &self.config)
            .field("session", &self.session)
            .field("throttle", &self.throttle)
            .finish_non_exhaustive()
    }
}

impl CatalogEngine {
    /// Create an engine with the reqwest transport.
    pub fn new(config: EngineConfig) -> Result<Self, Error> {
        let transport = FetchClient::new(config.fetch.clone())?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create an engine on top of any transport.
    pub fn with_transport(config: EngineConfig, transport: Arc<dyn CatalogTransport>) -> Result<Self, Error> {
        let urls = CatalogUrls::new(&config.base_url, &config.login_id).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let session = SessionManager::new(transport.clone(), urls.clone(), config.session_ttl);
        let throttle = RequestThrottler::new(config.max_concurrent, config.request_spacing);
        let cache = Arc::new(ResultCache::new(config.cache_ttl));

        Ok(Self { config, transport, urls, session, throttle, extractor: ResultExtractor::new(), cache })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn throttle(&self) -> &RequestThrottler {
        &self.throttle
    }

    /// Start the periodic cache sweep on the configured interval.
    pub fn spawn_cache_sweeper(&self) -> JoinHandle<()> {
        self.cache.spawn_sweeper(self.config.cache_sweep_interval)
    }

    /// Resolve a query. Never fails; failures come back as error results.
    pub async fn find_availability(&self, query: Query) -> QueryResult {
        let deadline = self.config.query_timeout;
        match tokio::time::timeout(deadline, self.resolve(&query)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(title = query.title(), timeout_ms = deadline.as_millis() as u64, "lookup timed out");
                QueryResult::from_error(&Error::Timeout(format!("lookup exceeded {}ms", deadline.as_millis())))
            }
        }
    }

    async fn resolve(&self, query: &Query) -> QueryResult {
        if query.title().is_empty() {
            return QueryResult::from_error(&Error::InvalidInput("title must not be empty".into()));
        }

        let key = query.cache_key();
        if let Some(hit) = self.cache.get(&key).await {
            tracing::debug!(key = %key, "cache hit");
            return hit;
        }
        tracing::debug!(key = %key, "cache miss");

        let result = match self.lookup(query).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(title = query.title(), code = e.code(), error = %e, "lookup failed");
                return QueryResult::from_error(&e);
            }
        };

        self.cache.store(&key, result.clone()).await;
        result
    }

    async fn lookup(&self, query: &Query) -> Result<QueryResult, Error> {
        let mut outcome = self.search(query).await?;

        if outcome.candidates.is_empty() && query.year().is_some() && self.config.title_only_fallback {
            tracing::debug!(title = query.title(), "no candidates with year, retrying by title");
            let fallback = self.search(&query.without_year()).await?;
            outcome.any_results |= fallback.any_results;
            outcome.candidates = fallback.candidates;
        }

        let matched = select_best(query.title(), &outcome.candidates);
        tracing::debug!(title = query.title(), score = matched.score, matched = matched.matched, "match selected");

        let result = match matched.candidate {
            Some(candidate) if matched.matched => {
                let link = self.urls.deep_link(&candidate.text);
                let found = QueryResult::found(candidate.text, link, matched.score);
                if candidate.availability == Some(Availability::OnLoan) { found.with_note(NOTE_ON_LOAN) } else { found }
            }
            _ if outcome.any_results || !outcome.candidates.is_empty() => QueryResult::not_found(NOTE_NO_MATCH),
            _ => QueryResult::not_found(NOTE_NO_RESULTS),
        };

        Ok(result)
    }

    /// One search with the bounded session-expiry retry.
    async fn search(&self, query: &Query) -> Result<SearchOutcome, Error> {
        let url = self.urls.search(&query.search_string());
        let mut retries_left = EXPIRY_RETRIES;

        loop {
            if !self.session.ensure().await {
                return Err(Error::SessionFailure("catalog handshake failed".into()));
            }
            let cookie = self.session.cookie().await;

            let response = {
                let _permit = self.throttle.acquire().await?;
                self.transport.get(&url, cookie.as_deref()).await?
            };
            tracing::debug!(fetch_ms = response.fetch_ms, bytes = response.body.len(), "search fetched");

            match triage(&response.body) {
                Triage::SessionExpired if retries_left > 0 => {
                    retries_left -= 1;
                    tracing::warn!(title = query.title(), "catalog session expired, retrying once");
                    self.session.invalidate_stale(cookie.as_deref()).await;
                }
                Triage::SessionExpired => {
                    return Err(Error::SessionExpired("session expired again after renewal".into()));
                }
                Triage::BackendError => {
                    tracing::warn!(title = query.title(), "catalog returned an error page");
                    return Err(Error::BackendError("catalog returned an error page".into()));
                }
                Triage::Results => {
                    let candidates = self.extractor.extract(&response.body);
                    let any_results = has_any_results(&response.body);
                    tracing::debug!(candidates = candidates.len(), any_results, "search triaged");
                    return Ok(SearchOutcome { candidates, any_results });
                }
            }
        }
    }
}

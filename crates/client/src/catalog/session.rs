//! Catalog session lifecycle.
//!
//! The catalog only honours searches that carry the cookie handed out by the
//! `start.do?Login=` handshake. A session is considered dead once its TTL has
//! passed or once the engine invalidates it after an expiry page.
//!
//! ### Handshake Collapsing
//! - The session state sits behind an async mutex that is held across the
//!   handshake, so only one handshake is ever in flight.
//! - Callers that queued behind a handshake take its outcome instead of
//!   starting another one: a live session is returned as-is, and a failed
//!   handshake is reported as failed to everyone who waited on it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::fetch::{CatalogTransport, CatalogUrls};

#[derive(Debug, Clone)]
struct Session {
    cookie: Option<String>,
    established_at: Instant,
}

impl Session {
    fn is_live(&self, ttl: Duration) -> bool {
        self.established_at.elapsed() < ttl
    }
}

#[derive(Debug, Default)]
struct SessionState {
    session: Option<Session>,
    last_outcome: bool,
}

impl SessionState {
    fn live(&self, ttl: Duration) -> Option<&Session> {
        self.session.as_ref().filter(|s| s.is_live(ttl))
    }
}

pub struct SessionManager {
    transport: Arc<dyn CatalogTransport>,
    urls: CatalogUrls,
    ttl: Duration,
    state: Mutex<SessionState>,
    handshakes: AtomicU64,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("urls", &self.urls)
            .field("ttl", &self.ttl)
            .field("handshakes", &self.handshake_count())
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(transport: Arc<dyn CatalogTransport>, urls: CatalogUrls, ttl: Duration) -> Self {
        Self { transport, urls, ttl, state: Mutex::new(SessionState::default()), handshakes: AtomicU64::new(0) }
    }

    /// Make sure a live session exists, handshaking if needed.
    ///
    /// Returns false when the handshake failed; no search should be sent then.
    pub async fn ensure(&self) -> bool {
        let seen = self.handshakes.load(Ordering::Acquire);
        let mut state = self.state.lock().await;

        if state.live(self.ttl).is_some() {
            return true;
        }

        // a handshake finished while we waited for the lock and it failed
        if self.handshakes.load(Ordering::Acquire) != seen && !state.last_outcome {
            return false;
        }

        let session = self.handshake().await;
        self.handshakes.fetch_add(1, Ordering::AcqRel);
        state.last_outcome = session.is_some();
        state.session = session;
        state.last_outcome
    }

    async fn handshake(&self) -> Option<Session> {
        let url = self.urls.handshake();
        tracing::debug!(url = %url, "opening catalog session");

        match self.transport.get(&url, None).await {
            Ok(response) => {
                let cookie = response.cookie_header();
                if cookie.is_none() {
                    tracing::warn!("catalog handshake returned no session cookie");
                }
                tracing::debug!(fetch_ms = response.fetch_ms, "catalog session established");
                Some(Session { cookie, established_at: Instant::now() })
            }
            Err(e) => {
                tracing::warn!(error = %e, "catalog handshake failed");
                None
            }
        }
    }

    /// Drop the current session; the next [`ensure`](Self::ensure) handshakes again.
    pub async fn invalidate(&self) {
        self.state.lock().await.session = None;
    }

    /// Drop the session only if it still carries `cookie`.
    ///
    /// A caller that saw an expiry page for an old cookie must not throw away
    /// a session another caller has already renewed.
    pub async fn invalidate_stale(&self, cookie: Option<&str>) {
        let mut state = self.state.lock().await;
        let current = state.session.as_ref().map(|s| s.cookie.as_deref());
        if current == Some(cookie) {
            tracing::debug!("invalidating expired catalog session");
            state.session = None;
        }
    }

    /// Cookie header of the live session, if any.
    pub async fn cookie(&self) -> Option<String> {
        self.state.lock().await.live(self.ttl).and_then(|s| s.cookie.clone())
    }

    /// Number of handshakes attempted so far.
    pub fn handshake_count(&self) -> u64 {
        self.handshakes.load(Ordering::Acquire)
    }
}

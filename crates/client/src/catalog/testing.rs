//! In-process transport that replays canned catalog responses.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::fetch::{CatalogTransport, FetchResponse, TransportError};

pub const BASE: &str = "https://opac.example.org/webOPACClient";

pub const EMPTY_PAGE: &str = r#"<html><body><div class="hitcount">0 Treffer</div></body></html>"#;

pub const EXPIRED_PAGE: &str = "<html><body><p>Ihre Sitzung ist abgelaufen.</p></body></html>";

pub const ERROR_PAGE: &str = "<html><body><h2>Ein Fehler ist aufgetreten.</h2></body></html>";

type Reply = Result<FetchResponse, TransportError>;

/// A 200 response with the given body.
pub fn ok(body: &str) -> Reply {
    Ok(FetchResponse { status: 200, body: body.to_string(), ..Default::default() })
}

/// One DVD hit row per title, each marked as available.
pub fn results_page(titles: &[&str]) -> String {
    let rows: Vec<String> = titles
        .iter()
        .enumerate()
        .map(|(i, title)| {
            format!(
                r#"<tr><td>DVD</td><td><a href="/webOPACClient/singleHit.do?curPos={}">{title}</a></td><td>Verfügbar</td></tr>"#,
                i + 1
            )
        })
        .collect();
    format!(
        r#"<html><body><div class="hitcount">{} Treffer</div><table>{}</table></body></html>"#,
        titles.len(),
        rows.concat()
    )
}

/// Replays queued handshake and search replies.
///
/// When a queue runs dry, handshakes succeed with a fresh cookie and searches
/// return an empty result page.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    handshakes: Mutex<VecDeque<Reply>>,
    searches: Mutex<VecDeque<Reply>>,
    handshake_calls: AtomicUsize,
    search_calls: AtomicUsize,
    search_urls: Mutex<Vec<String>>,
    cookies_sent: Mutex<Vec<Option<String>>>,
    delay: Duration,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every reply by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn push_handshake(&self, reply: Reply) {
        self.handshakes.lock().unwrap().push_back(reply);
    }

    pub fn push_search(&self, reply: Reply) {
        self.searches.lock().unwrap().push_back(reply);
    }

    pub fn handshake_calls(&self) -> usize {
        self.handshake_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn search_urls(&self) -> Vec<String> {
        self.search_urls.lock().unwrap().clone()
    }

    /// Cookie header sent with each search, in order.
    pub fn cookies_sent(&self) -> Vec<Option<String>> {
        self.cookies_sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CatalogTransport for ScriptedTransport {
    async fn get(&self, url: &str, cookie: Option<&str>) -> Result<FetchResponse, TransportError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if url.contains("/start.do?Login=") {
            let n = self.handshake_calls.fetch_add(1, Ordering::SeqCst) + 1;
            let queued = self.handshakes.lock().unwrap().pop_front();
            return queued.unwrap_or_else(|| {
                Ok(FetchResponse {
                    status: 200,
                    set_cookies: vec![format!("JSESSIONID=S{n}")],
                    ..Default::default()
                })
            });
        }

        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.search_urls.lock().unwrap().push(url.to_string());
        self.cookies_sent.lock().unwrap().push(cookie.map(str::to_string));
        let queued = self.searches.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| ok(EMPTY_PAGE))
    }
}

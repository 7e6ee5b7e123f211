//! MCP tool implementations.
//!
//! This module contains all tools exposed by the shelfcheck server.

pub mod cache;
pub mod find_availability;

pub use cache::{CachePurgeParams, cache_stats_impl, purge_impl};
pub use find_availability::{FindAvailabilityParams, find_availability_impl};

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use rmcp::model::CallToolResult;
    use shelfcheck_client::{CatalogEngine, CatalogTransport, EngineConfig, FetchResponse, TransportError};

    /// Answers every handshake with a cookie and every search with the same page.
    pub struct StubTransport {
        page: String,
        calls: AtomicUsize,
    }

    impl StubTransport {
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl CatalogTransport for StubTransport {
        async fn get(&self, url: &str, _cookie: Option<&str>) -> Result<FetchResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut response = FetchResponse { status: 200, final_url: url.to_string(), ..Default::default() };
            if url.contains("/start.do?Login=") {
                response.set_cookies = vec!["JSESSIONID=STUB".to_string()];
            } else {
                response.body = self.page.clone();
            }
            Ok(response)
        }
    }

    /// An engine whose catalog lists `titles` as available DVDs.
    pub fn stub_engine(titles: &[&str]) -> (CatalogEngine, Arc<StubTransport>) {
        let rows: String = titles
            .iter()
            .map(|t| format!(r#"<tr><td>DVD</td><td><a href="singleHit.do?curPos=1">{t}</a></td><td>Verfügbar</td></tr>"#))
            .collect();
        let page = format!(
            r#"<html><body><div class="hitcount">{} Treffer</div><table>{rows}</table></body></html>"#,
            titles.len()
        );

        let transport = Arc::new(StubTransport { page, calls: AtomicUsize::new(0) });
        let config = EngineConfig {
            base_url: "https://opac.example.org/webOPACClient".into(),
            request_spacing: Duration::ZERO,
            ..EngineConfig::default()
        };
        let engine = CatalogEngine::with_transport(config, transport.clone()).unwrap();
        (engine, transport)
    }

    /// Text of the first content item of a tool result.
    pub fn result_text(result: &CallToolResult) -> String {
        let content = serde_json::to_value(&result.content[0]).unwrap();
        content
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content")
            .to_string()
    }
}

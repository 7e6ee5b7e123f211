//! Catalog URL canonicalization and request URL construction.

pub use shelfcheck_core::base_url::{UrlError, canonicalize};

/// Builds the handshake, search and deep-link URLs for one catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogUrls {
    base: String,
    login_id: String,
}

impl CatalogUrls {
    /// `base` is canonicalized and kept without a trailing slash.
    pub fn new(base: &str, login_id: &str) -> Result<Self, UrlError> {
        let url = canonicalize(base)?;
        let base = url.as_str().trim_end_matches('/').to_string();
        Ok(Self { base, login_id: login_id.trim().to_string() })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// `<base>/start.do?Login=<id>`
    pub fn handshake(&self) -> String {
        format!("{}/start.do?Login={}", self.base, urlencoding::encode(&self.login_id))
    }

    /// Search request for a free-text search string such as `"title year"`.
    pub fn search(&self, search_string: &str) -> String {
        format!(
            "{}/search.do?methodToCall=submit&methodToCallParameter=submitSearch&searchCategories[0]=-1&searchString[0]={}",
            self.base,
            urlencoding::encode(search_string)
        )
    }

    /// Catalog deep link for an exact title: `<base>/start.do?Branch=00&Query=-1="<title>"`.
    pub fn deep_link(&self, title: &str) -> String {
        format!("{}/start.do?Branch=00&Query=-1={}", self.base, urlencoding::encode(&format!("\"{title}\"")))
    }
}

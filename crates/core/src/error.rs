//! Unified error types for shelfcheck.
//!
//! Every variant renders as `CODE: message`. The engine never returns these
//! to its callers directly; they are folded into a negative [`QueryResult`]
//! so that a lookup always resolves to a result object.
//!
//! [`QueryResult`]: crate::QueryResult

use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Unified error types for the catalog engine.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty title).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid catalog URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Handshake with the catalog failed (unreachable or non-2xx).
    #[error("SESSION_FAILURE: {0}")]
    SessionFailure(String),

    /// The catalog reported an expired session again after the retry.
    #[error("SESSION_EXPIRED: {0}")]
    SessionExpired(String),

    /// The catalog answered with its generic error page.
    #[error("BACKEND_ERROR: {0}")]
    BackendError(String),

    /// Network failure or non-2xx search response.
    #[error("TRANSPORT_ERROR: {0}")]
    TransportError(String),

    /// Response body exceeded the configured limit.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// Caller-side deadline elapsed.
    #[error("TIMEOUT: {0}")]
    Timeout(String),
}

impl Error {
    /// Stable error code, the prefix of the rendered message.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "INVALID_INPUT",
            Error::InvalidUrl(_) => "INVALID_URL",
            Error::SessionFailure(_) => "SESSION_FAILURE",
            Error::SessionExpired(_) => "SESSION_EXPIRED",
            Error::BackendError(_) => "BACKEND_ERROR",
            Error::TransportError(_) => "TRANSPORT_ERROR",
            Error::FetchTooLarge(_) => "FETCH_TOO_LARGE",
            Error::Timeout(_) => "TIMEOUT",
        }
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::SessionFailure(msg) => (-32020, msg.clone()),
            Error::SessionExpired(msg) => (-32021, msg.clone()),
            Error::BackendError(msg) => (-32022, msg.clone()),
            Error::TransportError(msg) => (-32008, msg.clone()),
            Error::FetchTooLarge(msg) => (-32007, msg.clone()),
            Error::Timeout(msg) => (-32006, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

//! Jikan API Error Types
//!
//! Maps HTTP status codes and transport failures to variants the fetcher
//! uses for its retry decision.

use crate::id::CatalogId;

/// Failure of a single title lookup attempt
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Rate limited — try again after backoff")]
    RateLimited,

    #[error("Catalog entry {0} not found")]
    NotFound(CatalogId),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error ({0}): {1}")]
    Server(u16, String),

    #[error("Request timeout")]
    Timeout,

    #[error("Request error: {0}")]
    Request(String),

    #[error("Malformed response: {0}")]
    Parse(String),
}

impl LookupError {
    /// Whether this failure is transient and worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LookupError::RateLimited
                | LookupError::Timeout
                | LookupError::Network(_)
                | LookupError::Server(_, _)
        )
    }

    /// Create a LookupError from an HTTP status code and response body
    pub fn from_status(id: CatalogId, status: u16, body: &str) -> Self {
        match status {
            404 => LookupError::NotFound(id),
            408 => LookupError::Timeout,
            429 => LookupError::RateLimited,
            500..=599 => LookupError::Server(status, body.to_string()),
            _ => LookupError::Request(format!("HTTP {}: {}", status, body)),
        }
    }
}

impl From<reqwest::Error> for LookupError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LookupError::Timeout
        } else if e.is_decode() {
            LookupError::Parse(e.to_string())
        } else if e.is_connect() || e.is_request() || e.is_body() {
            LookupError::Network(e.to_string())
        } else {
            LookupError::Request(e.to_string())
        }
    }
}

//! Error types for the catalog client

use core_auth::TokenError;
use thiserror::Error;

/// Catalog request errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    /// No bearer token could be obtained
    #[error("Access token unavailable: {0}")]
    Token(#[from] TokenError),

    /// Transport-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// API request returned an error
    #[error("Catalog API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    Parse(String),

    /// Request exceeded its time budget
    #[error("Catalog request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Caller supplied arguments the API cannot accept
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl SearchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            SearchError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type for catalog operations
pub type Result<T> = std::result::Result<T, SearchError>;

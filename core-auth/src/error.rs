use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token exchange endpoint is not configured: {0}")]
    MissingCredentials(String),

    #[error("Token exchange rejected ({status}): {message}")]
    ExchangeRejected { status: u16, message: String },

    #[error("Token refresh rejected ({status}): {message}")]
    RefreshRejected { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    #[error("Token storage error: {0}")]
    Storage(String),

    #[error("Operation timed out: {operation}")]
    Timeout { operation: String },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl TokenError {
    /// Whether trying the same call again could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            TokenError::Network(_) | TokenError::Timeout { .. } => true,
            TokenError::ExchangeRejected { status, .. }
            | TokenError::RefreshRejected { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<BridgeError> for TokenError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Storage(msg) => TokenError::Storage(msg),
            BridgeError::Timeout(operation) => TokenError::Timeout { operation },
            other => TokenError::Network(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, TokenError>;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Server configuration error")]
    Configuration,

    #[error("Invalid request body: {0}")]
    BadRequest(String),

    /// Non-2xx answer from the token endpoint, passed through to the caller.
    #[error("Upstream rejected the grant with status {status}: {message}")]
    Upstream {
        status: u16,
        message: String,
        details: Value,
    },

    #[error("Token endpoint unreachable: {0}")]
    Transport(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ProxyError::Transport(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ProxyError::Configuration => {
                error!("Missing client credentials");
                json!({ "error": "Server configuration error" })
            }
            ProxyError::BadRequest(message) => {
                warn!(error = %message, "Rejected malformed token request");
                json!({ "error": message })
            }
            ProxyError::Upstream {
                status,
                message,
                details,
            } => {
                warn!(status, error = %message, "Token endpoint rejected grant");
                json!({ "error": message, "details": details })
            }
            ProxyError::Transport(message) => {
                error!(error = %message, "Token endpoint unreachable");
                json!({ "error": message })
            }
            ProxyError::Internal(message) => {
                error!(error = %message, "Token request failed");
                json!({ "error": message })
            }
        };
        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;

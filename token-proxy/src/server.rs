//! # Token Exchange Server
//!
//! Axum router that swaps client grants for catalog access tokens without
//! exposing the client secret to browsers.
//!
//! ## Endpoints
//!
//! | Path | Description |
//! |------|-------------|
//! | `POST /` | Token exchange |
//! | `POST /get-spotify-token` | Same handler under the function name |
//!
//! Preflight `OPTIONS` requests are answered by the CORS layer.

use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};
use crate::grant::{TokenRequest, UpstreamGrant};
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, ORIGIN};
use axum::http::{HeaderMap, HeaderName, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use bridge_traits::http::{HttpClient, HttpRequest};
use bytes::Bytes;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_UPSTREAM_ERROR: &str = "Failed to get Spotify token";

/// Shared state passed to the handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<ProxyConfig>,
    http: Arc<dyn HttpClient>,
}

impl AppState {
    pub fn new(config: ProxyConfig, http: Arc<dyn HttpClient>) -> Self {
        Self {
            config: Arc::new(config),
            http,
        }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(exchange_token))
        .route("/get-spotify-token", post(exchange_token))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

/// Any origin, with the header set used by hosted gateways.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            CONTENT_TYPE,
        ])
}

/// Serve on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(%addr, "Token proxy listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

#[instrument(skip_all)]
async fn exchange_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let request =
        TokenRequest::from_body(&body).map_err(|e| ProxyError::BadRequest(e.to_string()))?;

    let (client_id, client_secret) = state
        .config
        .credentials()
        .ok_or(ProxyError::Configuration)?;

    let origin = headers.get(ORIGIN).and_then(|value| value.to_str().ok());
    let grant = UpstreamGrant::select(request, origin, &state.config.fallback_origin);
    let grant_type = grant.grant_type();
    info!(grant_type, "Token request received");

    let upstream = HttpRequest::post(state.config.token_url.as_str())
        .basic_auth(client_id, client_secret)
        .form(&grant.form_fields())
        .map_err(|e| ProxyError::Internal(e.to_string()))?
        .timeout(UPSTREAM_TIMEOUT);

    let response = state
        .http
        .execute(upstream)
        .await
        .map_err(|e| ProxyError::Transport(e.to_string()))?;

    let data: Value = response
        .json()
        .unwrap_or_else(|_| Value::String(response.text_lossy()));

    if !response.is_success() {
        let message = data
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_UPSTREAM_ERROR)
            .to_string();
        return Err(ProxyError::Upstream {
            status: response.status,
            message,
            details: data,
        });
    }

    info!(grant_type, "Token issued");
    Ok((StatusCode::OK, Json(data)).into_response())
}

//! # Token Exchange Provider
//!
//! Obtains bearer tokens from the token-exchange proxy, which holds the
//! catalog client secret server-side.
//!
//! ## Overview
//!
//! [`TokenProvider`] is the seam between the [`TokenManager`](crate::TokenManager)
//! cache and the network. [`ProxyTokenProvider`] is the production
//! implementation: it POSTs a small JSON body naming the grant and turns the
//! response into an [`AuthToken`] whose expiry is computed against the
//! injected clock.
//!
//! | Grant | Request body |
//! |---|---|
//! | client credentials | `{}` |
//! | authorization code | `{"authCode": "..."}` |
//! | refresh token | `{"refreshToken": "..."}` |

use crate::error::{Result, TokenError};
use crate::types::{AuthToken, GrantKind, ProxyErrorBody, TokenGrant, TokenResponse};
use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest};
use bridge_traits::time::Clock;
use core_runtime::config::RaagyaConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Source of fresh tokens for a given grant.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn acquire(&self, grant: TokenGrant) -> Result<AuthToken>;
}

/// [`TokenProvider`] backed by the token-exchange proxy.
pub struct ProxyTokenProvider {
    http_client: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl ProxyTokenProvider {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        clock: Arc<dyn Clock>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            clock,
            endpoint: endpoint.into(),
            api_key: None,
            timeout: core_runtime::config::DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Build a provider from the shared runtime configuration.
    pub fn from_config(config: &RaagyaConfig) -> Self {
        let mut provider = Self::new(
            config.http_client.clone(),
            config.clock.clone(),
            config.token_endpoint.clone(),
        )
        .with_timeout(config.request_timeout);
        if let Some(key) = &config.token_endpoint_api_key {
            provider = provider.with_api_key(key.clone());
        }
        provider
    }

    /// Gateway key sent as both `apikey` and `Authorization: Bearer`.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_request(&self, grant: &TokenGrant) -> Result<HttpRequest> {
        let mut request = HttpRequest::post(self.endpoint.clone())
            .header("Accept", "application/json")
            .timeout(self.timeout)
            .json(&grant.request_body())
            .map_err(|e| TokenError::Configuration(format!("Failed to encode request: {}", e)))?;

        if let Some(key) = &self.api_key {
            request = request.header("apikey", key.clone()).bearer_token(key);
        }

        Ok(request)
    }

    fn rejection(kind: GrantKind, status: u16, message: String) -> TokenError {
        match kind {
            GrantKind::RefreshToken => TokenError::RefreshRejected { status, message },
            _ => TokenError::ExchangeRejected { status, message },
        }
    }
}

#[async_trait]
impl TokenProvider for ProxyTokenProvider {
    #[instrument(skip(self, grant), fields(grant = %grant.kind()))]
    async fn acquire(&self, grant: TokenGrant) -> Result<AuthToken> {
        if self.endpoint.trim().is_empty() {
            return Err(TokenError::MissingCredentials(
                "token endpoint URL is empty".to_string(),
            ));
        }

        let kind = grant.kind();
        let request = self.build_request(&grant)?;

        debug!(endpoint = %self.endpoint, "Requesting token from exchange endpoint");

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(TokenError::from)?;

        if !response.is_success() {
            let body = response.json::<ProxyErrorBody>().unwrap_or_default();
            let message = body.message();
            warn!(status = response.status, error = %message, "Token exchange rejected");
            return Err(Self::rejection(kind, response.status, message));
        }

        let payload: TokenResponse = response
            .json()
            .map_err(|e| TokenError::InvalidResponse(e.to_string()))?;

        if payload.access_token.is_empty() {
            return Err(TokenError::InvalidResponse(
                "response did not contain an access token".to_string(),
            ));
        }

        let token = AuthToken::from_response(payload, self.clock.now_millis());
        debug!(
            expires_at_ms = token.expires_at_epoch_ms,
            has_refresh_token = token.has_refresh_token(),
            "Token acquired"
        );
        Ok(token)
    }
}

impl std::fmt::Debug for ProxyTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyTokenProvider")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

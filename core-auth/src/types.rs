use serde::{Deserialize, Serialize};
use std::fmt;

/// Grant presented to the token exchange endpoint.
#[derive(Clone, PartialEq, Eq)]
pub enum TokenGrant {
    /// App-only token, no user context.
    ClientCredentials,
    /// Code returned to the `/callback` route after user consent.
    AuthorizationCode { code: String },
    /// Previously issued refresh token.
    RefreshToken { refresh_token: String },
}

/// Discriminant of [`TokenGrant`] without the secret payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrantKind {
    ClientCredentials,
    AuthorizationCode,
    RefreshToken,
}

impl TokenGrant {
    pub fn kind(&self) -> GrantKind {
        match self {
            TokenGrant::ClientCredentials => GrantKind::ClientCredentials,
            TokenGrant::AuthorizationCode { .. } => GrantKind::AuthorizationCode,
            TokenGrant::RefreshToken { .. } => GrantKind::RefreshToken,
        }
    }

    /// Request body understood by the token proxy.
    pub(crate) fn request_body(&self) -> ExchangeRequest<'_> {
        match self {
            TokenGrant::ClientCredentials => ExchangeRequest::default(),
            TokenGrant::AuthorizationCode { code } => ExchangeRequest {
                auth_code: Some(code),
                refresh_token: None,
            },
            TokenGrant::RefreshToken { refresh_token } => ExchangeRequest {
                auth_code: None,
                refresh_token: Some(refresh_token),
            },
        }
    }
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenGrant::ClientCredentials => f.write_str("ClientCredentials"),
            TokenGrant::AuthorizationCode { .. } => f
                .debug_struct("AuthorizationCode")
                .field("code", &"[REDACTED]")
                .finish(),
            TokenGrant::RefreshToken { .. } => f
                .debug_struct("RefreshToken")
                .field("refresh_token", &"[REDACTED]")
                .finish(),
        }
    }
}

impl GrantKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantKind::ClientCredentials => "client_credentials",
            GrantKind::AuthorizationCode => "authorization_code",
            GrantKind::RefreshToken => "refresh_token",
        }
    }
}

impl fmt::Display for GrantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bearer token for the music catalog.
///
/// # Examples
///
/// ```
/// use core_auth::AuthToken;
///
/// let token = AuthToken::new("BQD...", 1_700_000_000_000, None);
/// assert!(token.is_expired_at(1_700_000_000_000));
/// assert!(!token.is_expired_at(1_699_999_999_999));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub access_token: String,
    /// Expiry as Unix epoch milliseconds.
    pub expires_at_epoch_ms: i64,
    pub refresh_token: Option<String>,
}

impl AuthToken {
    pub fn new(
        access_token: impl Into<String>,
        expires_at_epoch_ms: i64,
        refresh_token: Option<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at_epoch_ms,
            refresh_token,
        }
    }

    /// Build a token from an exchange response received at `now_ms`.
    pub fn from_response(response: TokenResponse, now_ms: i64) -> Self {
        let expires_in_ms = response.expires_in.saturating_mul(1000);
        Self {
            access_token: response.access_token,
            expires_at_epoch_ms: now_ms.saturating_add(expires_in_ms),
            refresh_token: response.refresh_token.filter(|t| !t.is_empty()),
        }
    }

    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at_epoch_ms
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.is_some()
    }
}

// Custom Debug implementation to avoid logging tokens
impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("access_token", &"[REDACTED]")
            .field("expires_at_epoch_ms", &self.expires_at_epoch_ms)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

fn default_expires_in() -> i64 {
    3600
}

/// Successful body returned by the exchange endpoint.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Error body returned by the exchange endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProxyErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

impl ProxyErrorBody {
    /// Best single-line description of the failure.
    pub fn message(&self) -> String {
        match (&self.error, &self.details) {
            (Some(error), Some(details)) => format!("{}: {}", error, details),
            (Some(error), None) => error.clone(),
            (None, Some(details)) => details.to_string(),
            (None, None) => "unknown error".to_string(),
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub(crate) struct ExchangeRequest<'a> {
    #[serde(rename = "authCode", skip_serializing_if = "Option::is_none")]
    pub auth_code: Option<&'a str>,
    #[serde(rename = "refreshToken", skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<&'a str>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_request_bodies() {
        let body = serde_json::to_string(&TokenGrant::ClientCredentials.request_body()).unwrap();
        assert_eq!(body, "{}");

        let grant = TokenGrant::AuthorizationCode {
            code: "abc".into(),
        };
        let body = serde_json::to_string(&grant.request_body()).unwrap();
        assert_eq!(body, r#"{"authCode":"abc"}"#);

        let grant = TokenGrant::RefreshToken {
            refresh_token: "r1".into(),
        };
        let body = serde_json::to_string(&grant.request_body()).unwrap();
        assert_eq!(body, r#"{"refreshToken":"r1"}"#);
    }

    #[test]
    fn test_token_from_response_defaults_expiry() {
        let response: TokenResponse = serde_json::from_str(r#"{"access_token":"a"}"#).unwrap();
        let token = AuthToken::from_response(response, 1_000);
        assert_eq!(token.expires_at_epoch_ms, 1_000 + 3_600_000);
        assert_eq!(token.refresh_token, None);
    }

    #[test]
    fn test_empty_refresh_token_is_dropped() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token":"a","expires_in":60,"refresh_token":""}"#)
                .unwrap();
        let token = AuthToken::from_response(response, 0);
        assert_eq!(token.expires_at_epoch_ms, 60_000);
        assert!(!token.has_refresh_token());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let token = AuthToken::new("secret-access", 5, Some("secret-refresh".into()));
        let printed = format!("{:?}", token);
        assert!(!printed.contains("secret-access"));
        assert!(!printed.contains("secret-refresh"));
        assert!(printed.contains("[REDACTED]"));

        let grant = TokenGrant::RefreshToken {
            refresh_token: "secret-refresh".into(),
        };
        assert!(!format!("{:?}", grant).contains("secret-refresh"));
    }

    #[test]
    fn test_proxy_error_message() {
        let body: ProxyErrorBody =
            serde_json::from_str(r#"{"error":"Failed to get Spotify token","details":{"error":"invalid_client"}}"#)
                .unwrap();
        assert!(body.message().starts_with("Failed to get Spotify token"));
        assert!(body.message().contains("invalid_client"));
        assert_eq!(ProxyErrorBody::default().message(), "unknown error");
    }
}

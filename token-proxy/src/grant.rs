//! Grant selection for incoming token requests.

use serde::Deserialize;

/// Body accepted by the proxy. Both fields are optional; `{}` requests an
/// app-only token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    #[serde(default)]
    pub auth_code: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl TokenRequest {
    /// Parse a request body. An empty body is treated as `{}`.
    pub fn from_body(body: &[u8]) -> Result<Self, serde_json::Error> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
    }
}

/// Grant forwarded to the upstream token endpoint.
#[derive(Clone, PartialEq, Eq)]
pub enum UpstreamGrant {
    RefreshToken { refresh_token: String },
    AuthorizationCode { code: String, redirect_uri: String },
    ClientCredentials,
}

impl UpstreamGrant {
    /// A refresh token wins over an authorization code; neither means client
    /// credentials. Empty strings count as absent.
    pub fn select(request: TokenRequest, origin: Option<&str>, fallback_origin: &str) -> Self {
        let present = |value: Option<String>| value.filter(|v| !v.is_empty());

        if let Some(refresh_token) = present(request.refresh_token) {
            return UpstreamGrant::RefreshToken { refresh_token };
        }
        if let Some(code) = present(request.auth_code) {
            let origin = origin
                .filter(|o| !o.is_empty() && *o != "null")
                .unwrap_or(fallback_origin)
                .trim_end_matches('/');
            return UpstreamGrant::AuthorizationCode {
                code,
                redirect_uri: format!("{}/callback", origin),
            };
        }
        UpstreamGrant::ClientCredentials
    }

    pub fn grant_type(&self) -> &'static str {
        match self {
            UpstreamGrant::RefreshToken { .. } => "refresh_token",
            UpstreamGrant::AuthorizationCode { .. } => "authorization_code",
            UpstreamGrant::ClientCredentials => "client_credentials",
        }
    }

    /// Form fields for the upstream request.
    pub fn form_fields(&self) -> Vec<(&'static str, &str)> {
        let mut fields = vec![("grant_type", self.grant_type())];
        match self {
            UpstreamGrant::RefreshToken { refresh_token } => {
                fields.push(("refresh_token", refresh_token.as_str()));
            }
            UpstreamGrant::AuthorizationCode { code, redirect_uri } => {
                fields.push(("code", code.as_str()));
                fields.push(("redirect_uri", redirect_uri.as_str()));
            }
            UpstreamGrant::ClientCredentials => {}
        }
        fields
    }
}

impl std::fmt::Debug for UpstreamGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpstreamGrant::RefreshToken { .. } => f
                .debug_struct("RefreshToken")
                .field("refresh_token", &"***")
                .finish(),
            UpstreamGrant::AuthorizationCode { redirect_uri, .. } => f
                .debug_struct("AuthorizationCode")
                .field("code", &"***")
                .field("redirect_uri", redirect_uri)
                .finish(),
            UpstreamGrant::ClientCredentials => f.write_str("ClientCredentials"),
        }
    }
}

//! Proxy configuration read from the process environment.

use std::net::SocketAddr;

pub const CLIENT_ID_VAR: &str = "SPOTIFY_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "SPOTIFY_CLIENT_SECRET";
pub const ADDR_VAR: &str = "TOKEN_PROXY_ADDR";
pub const FALLBACK_ORIGIN_VAR: &str = "TOKEN_PROXY_FALLBACK_ORIGIN";
pub const TOKEN_URL_VAR: &str = "SPOTIFY_TOKEN_URL";

pub const DEFAULT_ADDR: &str = "127.0.0.1:8787";
pub const DEFAULT_FALLBACK_ORIGIN: &str = "http://localhost:5173";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

#[derive(Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Missing credentials are reported per request, not at startup.
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub bind_addr: SocketAddr,
    /// Origin used for the redirect URI when a request carries no `Origin`.
    pub fallback_origin: String,
    pub token_url: String,
}

impl ProxyConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let addr = get(ADDR_VAR).unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let bind_addr = addr
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {} '{}': {}", ADDR_VAR, addr, e))?;

        Ok(Self {
            client_id: get(CLIENT_ID_VAR),
            client_secret: get(CLIENT_SECRET_VAR),
            bind_addr,
            fallback_origin: get(FALLBACK_ORIGIN_VAR)
                .unwrap_or_else(|| DEFAULT_FALLBACK_ORIGIN.to_string())
                .trim_end_matches('/')
                .to_string(),
            token_url: get(TOKEN_URL_VAR).unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
        })
    }

    pub fn with_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(client_secret.into());
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Both halves of the client credential, if configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) => Some((id.as_str(), secret.as_str())),
            _ => None,
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8787)),
            fallback_origin: DEFAULT_FALLBACK_ORIGIN.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
        }
    }
}

impl std::fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .field("bind_addr", &self.bind_addr)
            .field("fallback_origin", &self.fallback_origin)
            .field("token_url", &self.token_url)
            .finish()
    }
}

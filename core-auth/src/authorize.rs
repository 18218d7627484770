//! User authorization redirect.
//!
//! Builds the consent URL the host opens to connect a user account. The
//! catalog sends the user back to the configured redirect URI with a `code`
//! query parameter, handled by [`handle_callback`](crate::handle_callback).

use crate::error::{Result, TokenError};
use core_runtime::config::SpotifyConfig;
use url::Url;

/// Parameters of the authorization redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizeConfig {
    pub authorize_url: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

impl AuthorizeConfig {
    /// Extract authorize settings, requiring a client id and redirect URI.
    pub fn from_spotify(config: &SpotifyConfig) -> Result<Self> {
        let client_id = config
            .client_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| TokenError::Configuration("client_id is not set".to_string()))?;
        let redirect_uri = config
            .redirect_uri
            .clone()
            .filter(|uri| !uri.trim().is_empty())
            .ok_or_else(|| TokenError::Configuration("redirect_uri is not set".to_string()))?;

        Ok(Self {
            authorize_url: config.authorize_url.clone(),
            client_id,
            redirect_uri,
            scopes: config.scopes.clone(),
        })
    }
}

/// Consent URL with `client_id`, `response_type=code`, `redirect_uri` and the
/// space-separated `scope` list.
pub fn authorize_url(config: &AuthorizeConfig) -> Result<String> {
    let mut url = Url::parse(&config.authorize_url).map_err(|e| {
        TokenError::Configuration(format!(
            "invalid authorize URL '{}': {}",
            config.authorize_url, e
        ))
    })?;

    url.query_pairs_mut()
        .append_pair("client_id", &config.client_id)
        .append_pair("response_type", "code")
        .append_pair("redirect_uri", &config.redirect_uri)
        .append_pair("scope", &config.scopes.join(" "));

    Ok(url.into())
}

//! Persisted Token Storage
//!
//! Keeps the catalog bearer token in the host's key-value settings store
//! under three string keys:
//!
//! | Key | Value |
//! |---|---|
//! | `spotify_token` | access token |
//! | `spotify_token_expires` | expiry, Unix epoch milliseconds as a decimal string |
//! | `spotify_refresh_token` | refresh token, if one was issued |
//!
//! A record whose expiry cannot be parsed is treated as corrupted and every
//! key is removed.
//!
//! ## Example
//!
//! ```no_run
//! use core_auth::{AuthToken, TokenStore};
//! use bridge_traits::MemorySettingsStore;
//! use std::sync::Arc;
//! # async fn example() -> core_auth::Result<()> {
//! let store = TokenStore::new(Arc::new(MemorySettingsStore::new()));
//!
//! store.save(&AuthToken::new("access", 1_700_000_000_000, None)).await?;
//! let token = store.load().await?;
//! assert!(token.is_some());
//!
//! store.clear().await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{Result, TokenError};
use crate::types::AuthToken;
use bridge_traits::storage::SettingsStore;
use std::sync::Arc;
use tracing::{debug, warn};

pub const ACCESS_TOKEN_KEY: &str = "spotify_token";
pub const EXPIRES_AT_KEY: &str = "spotify_token_expires";
pub const REFRESH_TOKEN_KEY: &str = "spotify_refresh_token";

/// Token persistence over an injected [`SettingsStore`].
///
/// Token values are never logged.
#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn SettingsStore>,
}

impl TokenStore {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    /// Read the persisted token.
    ///
    /// Returns `Ok(None)` when no access token is stored. An access token
    /// without a parseable expiry clears all three keys and yields `None`.
    pub async fn load(&self) -> Result<Option<AuthToken>> {
        let access_token = match self.get(ACCESS_TOKEN_KEY).await? {
            Some(token) if !token.is_empty() => token,
            _ => return Ok(None),
        };

        let expires_at = match self.get(EXPIRES_AT_KEY).await? {
            Some(raw) => raw.trim().parse::<i64>().ok(),
            None => None,
        };

        let Some(expires_at_epoch_ms) = expires_at else {
            warn!("Persisted token expiry is missing or malformed, clearing token fields");
            self.clear().await?;
            return Ok(None);
        };

        let refresh_token = self
            .get(REFRESH_TOKEN_KEY)
            .await?
            .filter(|token| !token.is_empty());

        Ok(Some(AuthToken {
            access_token,
            expires_at_epoch_ms,
            refresh_token,
        }))
    }

    /// Persist a token.
    ///
    /// When `token` carries no refresh token the previously stored one is
    /// left in place, since refresh responses usually omit it.
    pub async fn save(&self, token: &AuthToken) -> Result<()> {
        self.set(ACCESS_TOKEN_KEY, &token.access_token).await?;
        self.set(EXPIRES_AT_KEY, &token.expires_at_epoch_ms.to_string())
            .await?;
        if let Some(refresh_token) = &token.refresh_token {
            self.set(REFRESH_TOKEN_KEY, refresh_token).await?;
        }

        debug!(
            expires_at_ms = token.expires_at_epoch_ms,
            has_refresh_token = token.refresh_token.is_some(),
            "Persisted access token"
        );
        Ok(())
    }

    /// Remove every persisted token field.
    pub async fn clear(&self) -> Result<()> {
        for key in [ACCESS_TOKEN_KEY, EXPIRES_AT_KEY, REFRESH_TOKEN_KEY] {
            self.store
                .delete(key)
                .await
                .map_err(|e| TokenError::Storage(e.to_string()))?;
        }
        debug!("Cleared persisted token fields");
        Ok(())
    }

    /// Stored refresh token, if any.
    pub async fn refresh_token(&self) -> Result<Option<String>> {
        Ok(self
            .get(REFRESH_TOKEN_KEY)
            .await?
            .filter(|token| !token.is_empty()))
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.store
            .get_string(key)
            .await
            .map_err(|e| TokenError::Storage(e.to_string()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.store
            .set_string(key, value)
            .await
            .map_err(|e| TokenError::Storage(e.to_string()))
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore").finish_non_exhaustive()
    }
}

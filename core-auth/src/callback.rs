//! `/callback` route handling.
//!
//! The catalog redirects back with either `?code=...` or `?error=...`. A code
//! is exchanged and persisted through the [`TokenManager`]; the host then
//! navigates to the returned route.

use crate::manager::TokenManager;
use tracing::{info, warn};

/// Where the host should navigate once the callback has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackRoute {
    /// `/dashboard`
    Dashboard,
    /// `/`
    Home,
}

impl CallbackRoute {
    pub fn path(&self) -> &'static str {
        match self {
            CallbackRoute::Dashboard => "/dashboard",
            CallbackRoute::Home => "/",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackOutcome {
    pub route: CallbackRoute,
    /// Reason the connection was not made, if any.
    pub error: Option<String>,
}

impl CallbackOutcome {
    fn home(error: impl Into<String>) -> Self {
        Self {
            route: CallbackRoute::Home,
            error: Some(error.into()),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.route == CallbackRoute::Dashboard
    }
}

/// Handle the redirect query string (with or without the leading `?`).
pub async fn handle_callback(manager: &TokenManager, query: &str) -> CallbackOutcome {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut code = None;
    let mut denied = None;

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "code" if !value.is_empty() => code = Some(value.into_owned()),
            "error" => denied = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(reason) = denied {
        warn!(reason = %reason, "Authorization was denied");
        return CallbackOutcome::home(reason);
    }

    let Some(code) = code else {
        warn!("Callback reached without an authorization code");
        return CallbackOutcome::home("missing authorization code");
    };

    match manager.exchange_authorization_code(&code).await {
        Ok(_) => {
            info!("Catalog account connected");
            CallbackOutcome {
                route: CallbackRoute::Dashboard,
                error: None,
            }
        }
        Err(e) => {
            warn!(error = %e, "Authorization code exchange failed");
            CallbackOutcome::home(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, TokenError};
    use crate::provider::TokenProvider;
    use crate::token_store::TokenStore;
    use crate::types::{AuthToken, TokenGrant};
    use async_trait::async_trait;
    use bridge_traits::{ManualClock, MemorySettingsStore};
    use core_runtime::events::EventBus;
    use std::sync::Arc;

    struct CodeProvider {
        accept: &'static str,
    }

    #[async_trait]
    impl TokenProvider for CodeProvider {
        async fn acquire(&self, grant: TokenGrant) -> Result<AuthToken> {
            match grant {
                TokenGrant::AuthorizationCode { code } if code == self.accept => {
                    Ok(AuthToken::new("user", i64::MAX, Some("refresh".into())))
                }
                _ => Err(TokenError::ExchangeRejected {
                    status: 400,
                    message: "invalid_grant".into(),
                }),
            }
        }
    }

    fn manager() -> TokenManager {
        TokenManager::new(
            Arc::new(CodeProvider { accept: "good" }),
            TokenStore::new(Arc::new(MemorySettingsStore::new())),
            Arc::new(ManualClock::at_millis(0)),
            EventBus::new(8),
        )
    }

    #[tokio::test]
    async fn test_code_exchanged_routes_to_dashboard() {
        let manager = manager();
        let outcome = handle_callback(&manager, "?code=good&state=xyz").await;
        assert_eq!(outcome.route, CallbackRoute::Dashboard);
        assert_eq!(outcome.route.path(), "/dashboard");
        assert!(manager.is_connected().await);
    }

    #[tokio::test]
    async fn test_error_parameter_routes_home() {
        let outcome = handle_callback(&manager(), "error=access_denied").await;
        assert_eq!(outcome.route, CallbackRoute::Home);
        assert_eq!(outcome.error.as_deref(), Some("access_denied"));
    }

    #[tokio::test]
    async fn test_missing_code_routes_home() {
        let outcome = handle_callback(&manager(), "").await;
        assert_eq!(outcome.route.path(), "/");
        assert!(!outcome.is_connected());
    }

    #[tokio::test]
    async fn test_failed_exchange_routes_home() {
        let manager = manager();
        let outcome = handle_callback(&manager, "code=bad").await;
        assert_eq!(outcome.route, CallbackRoute::Home);
        assert!(outcome.error.unwrap().contains("invalid_grant"));
        assert!(!manager.is_connected().await);
    }
}

//! # Token Manager
//!
//! Cache discipline for the catalog bearer token.
//!
//! ## Overview
//!
//! The `TokenManager` hands out a usable access token on demand. It prefers
//! the persisted token, refreshes it when it has expired and a refresh token
//! is available, and otherwise falls back to an app-only client credentials
//! grant. Every transition is published on the event bus as an [`AuthEvent`].
//!
//! ```text
//! persisted & unexpired ──────────────────────────────► return
//! expired + refresh token ── refresh ok ──► persist ──► return
//!                          └─ refresh failed ─► clear all fields ─┐
//! absent / expired without refresh ◄──────────────────────────────┘
//!     └── client credentials ── ok ──► persist ──► return
//!                              └─ failed ──► TokenError
//! ```
//!
//! Callers are serialized on a single async lock, so at most one refresh or
//! exchange is in flight and concurrent callers observe its result.
//!
//! ## Usage
//!
//! ```no_run
//! use core_auth::{ProxyTokenProvider, TokenManager, TokenStore};
//! use bridge_traits::{MemorySettingsStore, SystemClock};
//! use core_runtime::events::EventBus;
//! use std::sync::Arc;
//! # use bridge_traits::http::HttpClient;
//! # async fn example(http_client: Arc<dyn HttpClient>) -> core_auth::Result<()> {
//! let clock = Arc::new(SystemClock);
//! let provider = ProxyTokenProvider::new(http_client, clock.clone(), "https://proxy.example/token");
//! let manager = TokenManager::new(
//!     Arc::new(provider),
//!     TokenStore::new(Arc::new(MemorySettingsStore::new())),
//!     clock,
//!     EventBus::new(100),
//! );
//!
//! let token = manager.valid_token().await?;
//! println!("expires at {}", token.expires_at_epoch_ms);
//! # Ok(())
//! # }
//! ```

use crate::error::{Result, TokenError};
use crate::provider::TokenProvider;
use crate::token_store::TokenStore;
use crate::types::{AuthToken, TokenGrant};
use async_trait::async_trait;
use bridge_traits::time::Clock;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, instrument, warn};

/// Upper bound for a single grant exchange.
const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Anything that can produce a bearer token for catalog requests.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// Token cache over a [`TokenProvider`] and a [`TokenStore`].
pub struct TokenManager {
    provider: Arc<dyn TokenProvider>,
    store: TokenStore,
    clock: Arc<dyn Clock>,
    event_bus: EventBus,
    /// Serializes refreshes and exchanges.
    exchange_lock: Mutex<()>,
    exchange_timeout: Duration,
}

impl TokenManager {
    pub fn new(
        provider: Arc<dyn TokenProvider>,
        store: TokenStore,
        clock: Arc<dyn Clock>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            provider,
            store,
            clock,
            event_bus,
            exchange_lock: Mutex::new(()),
            exchange_timeout: DEFAULT_EXCHANGE_TIMEOUT,
        }
    }

    pub fn with_exchange_timeout(mut self, exchange_timeout: Duration) -> Self {
        self.exchange_timeout = exchange_timeout;
        self
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Return a token that is unexpired at the time of the call.
    #[instrument(skip(self))]
    pub async fn valid_token(&self) -> Result<AuthToken> {
        let _guard = self.exchange_lock.lock().await;

        if let Some(token) = self.store.load().await? {
            if !token.is_expired_at(self.now_ms()) {
                debug!("Persisted token is valid");
                return Ok(token);
            }

            if let Some(refresh_token) = token.refresh_token.clone() {
                match self.refresh(refresh_token).await {
                    Ok(fresh) => return Ok(fresh),
                    Err(e) => {
                        warn!(error = %e, "Token refresh failed, clearing persisted tokens");
                        self.store.clear().await?;
                        self.emit(AuthEvent::TokensCleared {
                            reason: "refresh_failed".to_string(),
                        });
                    }
                }
            } else {
                debug!("Persisted token expired without a refresh token");
            }
        }

        self.acquire_and_store(TokenGrant::ClientCredentials).await
    }

    /// Exchange the code delivered to `/callback` for a user token.
    #[instrument(skip(self, code))]
    pub async fn exchange_authorization_code(&self, code: &str) -> Result<AuthToken> {
        if code.trim().is_empty() {
            return Err(TokenError::Configuration(
                "authorization code is empty".to_string(),
            ));
        }

        let _guard = self.exchange_lock.lock().await;
        self.acquire_and_store(TokenGrant::AuthorizationCode {
            code: code.to_string(),
        })
        .await
    }

    /// Whether a user connection is on file.
    ///
    /// True when a persisted token is unexpired, or expired but refreshable.
    /// No network call is made.
    pub async fn is_connected(&self) -> bool {
        match self.store.load().await {
            Ok(Some(token)) => !token.is_expired_at(self.now_ms()) || token.has_refresh_token(),
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "Could not read persisted token");
                false
            }
        }
    }

    /// Forget every persisted token field.
    pub async fn sign_out(&self) -> Result<()> {
        let _guard = self.exchange_lock.lock().await;
        self.store.clear().await?;
        self.emit(AuthEvent::TokensCleared {
            reason: "sign_out".to_string(),
        });
        info!("Signed out of catalog");
        Ok(())
    }

    async fn refresh(&self, refresh_token: String) -> Result<AuthToken> {
        info!("Access token expired, refreshing");
        self.emit(AuthEvent::TokenRefreshing);

        let mut fresh = self
            .bounded(
                "token refresh",
                TokenGrant::RefreshToken {
                    refresh_token: refresh_token.clone(),
                },
            )
            .await
            .map_err(|e| {
                self.emit(AuthEvent::AuthError {
                    message: format!("Token refresh failed: {}", e),
                    recoverable: true,
                });
                e
            })?;

        if fresh.refresh_token.is_none() {
            fresh.refresh_token = Some(refresh_token);
        }

        self.store.save(&fresh).await?;
        self.emit(AuthEvent::TokenRefreshed {
            expires_at_ms: fresh.expires_at_epoch_ms,
        });
        info!(expires_at_ms = fresh.expires_at_epoch_ms, "Token refreshed");
        Ok(fresh)
    }

    async fn acquire_and_store(&self, grant: TokenGrant) -> Result<AuthToken> {
        let kind = grant.kind();
        let token = match self.bounded("token exchange", grant).await {
            Ok(token) => token,
            Err(e) => {
                error!(grant = %kind, error = %e, "Token exchange failed");
                self.emit(AuthEvent::AuthError {
                    message: e.to_string(),
                    recoverable: e.is_transient(),
                });
                return Err(e);
            }
        };

        self.store.save(&token).await?;
        self.emit(AuthEvent::TokenAcquired {
            grant: kind.to_string(),
            expires_at_ms: token.expires_at_epoch_ms,
        });
        info!(grant = %kind, expires_at_ms = token.expires_at_epoch_ms, "Token acquired");
        Ok(token)
    }

    async fn bounded(&self, operation: &str, grant: TokenGrant) -> Result<AuthToken> {
        match timeout(self.exchange_timeout, self.provider.acquire(grant)).await {
            Ok(result) => result,
            Err(_) => Err(TokenError::Timeout {
                operation: operation.to_string(),
            }),
        }
    }

    fn now_ms(&self) -> i64 {
        self.clock.now_millis()
    }

    fn emit(&self, event: AuthEvent) {
        let _ = self.event_bus.emit(CoreEvent::Auth(event));
    }
}

#[async_trait]
impl AccessTokenSource for TokenManager {
    async fn access_token(&self) -> Result<String> {
        Ok(self.valid_token().await?.access_token)
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("exchange_timeout", &self.exchange_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token_store::{ACCESS_TOKEN_KEY, EXPIRES_AT_KEY, REFRESH_TOKEN_KEY};
    use crate::types::GrantKind;
    use bridge_traits::storage::SettingsStore;
    use bridge_traits::{ManualClock, MemorySettingsStore};
    use core_runtime::events::EventStream;
    use mockall::mock;
    use mockall::predicate::*;

    mock! {
        Provider {}

        #[async_trait]
        impl TokenProvider for Provider {
            async fn acquire(&self, grant: TokenGrant) -> Result<AuthToken>;
        }
    }

    const NOW: i64 = 1_700_000_000_000;

    struct Fixture {
        settings: Arc<MemorySettingsStore>,
        clock: Arc<ManualClock>,
        bus: EventBus,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                settings: Arc::new(MemorySettingsStore::new()),
                clock: Arc::new(ManualClock::at_millis(NOW)),
                bus: EventBus::new(32),
            }
        }

        fn manager(&self, provider: MockProvider) -> TokenManager {
            TokenManager::new(
                Arc::new(provider),
                TokenStore::new(self.settings.clone()),
                self.clock.clone(),
                self.bus.clone(),
            )
        }

        async fn persist(&self, access: &str, expires_at: i64, refresh: Option<&str>) {
            TokenStore::new(self.settings.clone())
                .save(&AuthToken::new(access, expires_at, refresh.map(String::from)))
                .await
                .unwrap();
        }
    }

    fn auth_events(stream: &mut EventStream) -> Vec<AuthEvent> {
        stream
            .drain()
            .into_iter()
            .filter_map(|event| match event {
                CoreEvent::Auth(auth) => Some(auth),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_unexpired_token_is_returned_without_exchange() {
        let fixture = Fixture::new();
        fixture.persist("cached", NOW + 60_000, None).await;

        let mut provider = MockProvider::new();
        provider.expect_acquire().never();

        let token = fixture.manager(provider).valid_token().await.unwrap();
        assert_eq!(token.access_token, "cached");
    }

    #[tokio::test]
    async fn test_missing_token_uses_client_credentials() {
        let fixture = Fixture::new();
        let mut events = EventStream::new(fixture.bus.subscribe());

        let mut provider = MockProvider::new();
        provider
            .expect_acquire()
            .with(eq(TokenGrant::ClientCredentials))
            .times(1)
            .returning(|_| Ok(AuthToken::new("app", NOW + 3_600_000, None)));

        let token = fixture.manager(provider).valid_token().await.unwrap();
        assert_eq!(token.access_token, "app");
        assert_eq!(
            fixture.settings.get_string(ACCESS_TOKEN_KEY).await.unwrap(),
            Some("app".to_string())
        );
        assert_eq!(
            auth_events(&mut events),
            vec![AuthEvent::TokenAcquired {
                grant: "client_credentials".into(),
                expires_at_ms: NOW + 3_600_000
            }]
        );
    }

    #[tokio::test]
    async fn test_expired_token_refreshes_before_new_exchange() {
        let fixture = Fixture::new();
        fixture.persist("old", NOW - 1, Some("refresh-1")).await;
        let mut events = EventStream::new(fixture.bus.subscribe());

        let mut provider = MockProvider::new();
        provider
            .expect_acquire()
            .withf(|grant| grant.kind() == GrantKind::RefreshToken)
            .times(1)
            .returning(|_| Ok(AuthToken::new("new", NOW + 3_600_000, None)));

        let manager = fixture.manager(provider);
        let token = manager.valid_token().await.unwrap();

        assert_eq!(token.access_token, "new");
        assert_eq!(token.refresh_token.as_deref(), Some("refresh-1"));
        let stored = manager.store().load().await.unwrap().unwrap();
        assert_eq!(stored.access_token, "new");
        assert_eq!(stored.refresh_token.as_deref(), Some("refresh-1"));

        assert_eq!(
            auth_events(&mut events),
            vec![
                AuthEvent::TokenRefreshing,
                AuthEvent::TokenRefreshed {
                    expires_at_ms: NOW + 3_600_000
                }
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_refresh_clears_tokens_then_falls_back() {
        let fixture = Fixture::new();
        fixture.persist("old", NOW - 1, Some("revoked")).await;
        let mut events = EventStream::new(fixture.bus.subscribe());

        let mut seq = mockall::Sequence::new();
        let mut provider = MockProvider::new();
        provider
            .expect_acquire()
            .withf(|grant| grant.kind() == GrantKind::RefreshToken)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Err(TokenError::RefreshRejected {
                    status: 400,
                    message: "invalid_grant".into(),
                })
            });
        provider
            .expect_acquire()
            .with(eq(TokenGrant::ClientCredentials))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(AuthToken::new("app", NOW + 1_000, None)));

        let token = fixture.manager(provider).valid_token().await.unwrap();
        assert_eq!(token.access_token, "app");
        assert!(!fixture.settings.has_key(REFRESH_TOKEN_KEY).await.unwrap());

        let events = auth_events(&mut events);
        assert!(events.contains(&AuthEvent::TokensCleared {
            reason: "refresh_failed".into()
        }));
    }

    #[tokio::test]
    async fn test_failed_refresh_and_failed_exchange_leave_store_empty() {
        let fixture = Fixture::new();
        fixture.persist("old", NOW - 1, Some("revoked")).await;

        let mut provider = MockProvider::new();
        provider.expect_acquire().times(2).returning(|grant| match grant {
            TokenGrant::RefreshToken { .. } => Err(TokenError::RefreshRejected {
                status: 400,
                message: "invalid_grant".into(),
            }),
            _ => Err(TokenError::Network("offline".into())),
        });

        let err = fixture.manager(provider).valid_token().await.unwrap_err();
        assert!(matches!(err, TokenError::Network(_)));
        assert!(!fixture.settings.has_key(ACCESS_TOKEN_KEY).await.unwrap());
        assert!(!fixture.settings.has_key(EXPIRES_AT_KEY).await.unwrap());
        assert!(!fixture.settings.has_key(REFRESH_TOKEN_KEY).await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_without_refresh_uses_client_credentials() {
        let fixture = Fixture::new();
        fixture.persist("old", NOW, None).await;

        let mut provider = MockProvider::new();
        provider
            .expect_acquire()
            .with(eq(TokenGrant::ClientCredentials))
            .times(1)
            .returning(|_| Ok(AuthToken::new("app", NOW + 1_000, None)));

        let token = fixture.manager(provider).valid_token().await.unwrap();
        assert_eq!(token.access_token, "app");
    }

    #[tokio::test]
    async fn test_authorization_code_exchange_persists_refresh_token() {
        let fixture = Fixture::new();
        let mut provider = MockProvider::new();
        provider
            .expect_acquire()
            .with(eq(TokenGrant::AuthorizationCode {
                code: "code-1".into(),
            }))
            .times(1)
            .returning(|_| Ok(AuthToken::new("user", NOW + 3_600_000, Some("r".into()))));

        let manager = fixture.manager(provider);
        manager.exchange_authorization_code("code-1").await.unwrap();

        assert!(manager.is_connected().await);
        assert_eq!(
            fixture.settings.get_string(REFRESH_TOKEN_KEY).await.unwrap(),
            Some("r".to_string())
        );
    }

    #[tokio::test]
    async fn test_empty_authorization_code_is_rejected() {
        let fixture = Fixture::new();
        let mut provider = MockProvider::new();
        provider.expect_acquire().never();

        let err = fixture
            .manager(provider)
            .exchange_authorization_code("  ")
            .await
            .unwrap_err();
        assert!(matches!(err, TokenError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_is_connected_tracks_expiry() {
        let fixture = Fixture::new();
        let manager = fixture.manager(MockProvider::new());
        assert!(!manager.is_connected().await);

        fixture.persist("a", NOW + 10, None).await;
        assert!(manager.is_connected().await);

        fixture.clock.advance(chrono::Duration::milliseconds(10));
        assert!(!manager.is_connected().await);
    }

    #[tokio::test]
    async fn test_sign_out_clears_and_emits() {
        let fixture = Fixture::new();
        fixture.persist("a", NOW + 10, Some("r")).await;
        let mut events = EventStream::new(fixture.bus.subscribe());

        let manager = fixture.manager(MockProvider::new());
        manager.sign_out().await.unwrap();

        assert!(fixture.settings.is_empty());
        assert_eq!(
            auth_events(&mut events),
            vec![AuthEvent::TokensCleared {
                reason: "sign_out".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_access_token_source() {
        let fixture = Fixture::new();
        fixture.persist("cached", NOW + 60_000, None).await;
        let source: Arc<dyn AccessTokenSource> = Arc::new(fixture.manager(MockProvider::new()));
        assert_eq!(source.access_token().await.unwrap(), "cached");
    }

    struct SlowProvider;

    #[async_trait]
    impl TokenProvider for SlowProvider {
        async fn acquire(&self, _grant: TokenGrant) -> Result<AuthToken> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(AuthToken::new("late", NOW, None))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_exchange_is_bounded_by_timeout() {
        let fixture = Fixture::new();
        let manager = TokenManager::new(
            Arc::new(SlowProvider),
            TokenStore::new(fixture.settings.clone()),
            fixture.clock.clone(),
            fixture.bus.clone(),
        )
        .with_exchange_timeout(Duration::from_secs(5));

        let err = manager.valid_token().await.unwrap_err();
        assert!(matches!(err, TokenError::Timeout { .. }));
        assert!(fixture.settings.is_empty());
    }

    struct CountingProvider {
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl TokenProvider for CountingProvider {
        async fn acquire(&self, _grant: TokenGrant) -> Result<AuthToken> {
            self.calls
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(AuthToken::new("shared", NOW + 3_600_000, None))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_exchange() {
        let fixture = Fixture::new();
        let provider = Arc::new(CountingProvider {
            calls: std::sync::atomic::AtomicUsize::new(0),
        });
        let manager = Arc::new(TokenManager::new(
            provider.clone(),
            TokenStore::new(fixture.settings.clone()),
            fixture.clock.clone(),
            fixture.bus.clone(),
        ));

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.valid_token().await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().access_token, "shared");
        }
        assert_eq!(
            provider.calls.load(std::sync::atomic::Ordering::SeqCst),
            1
        );
    }
}

//! # Authentication Module
//!
//! Bearer-token management for the music catalog.
//!
//! ## Overview
//!
//! Tokens come from a token-exchange proxy that keeps the catalog client
//! secret server-side. This crate caches them in the host's key-value store,
//! refreshes them when they expire and falls back to an app-only grant when
//! no user connection is available.
//!
//! ## Features
//!
//! - Client credentials, authorization code and refresh token grants
//! - Persisted token cache with corruption recovery
//! - Serialized refresh so concurrent callers share one exchange
//! - Authorization redirect URL and `/callback` handling
//! - Auth state event emission

pub mod authorize;
pub mod callback;
pub mod error;
pub mod manager;
pub mod provider;
pub mod token_store;
pub mod types;

pub use authorize::{authorize_url, AuthorizeConfig};
pub use callback::{handle_callback, CallbackOutcome, CallbackRoute};
pub use error::{Result, TokenError};
pub use manager::{AccessTokenSource, TokenManager};
pub use provider::{ProxyTokenProvider, TokenProvider};
pub use token_store::TokenStore;
pub use types::{AuthToken, GrantKind, ProxyErrorBody, TokenGrant, TokenResponse};

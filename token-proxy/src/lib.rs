//! # Token Proxy
//!
//! Small HTTP service holding the catalog client secret. Browsers and other
//! untrusted hosts post a grant (nothing, an authorization code, or a refresh
//! token) and receive the upstream token response unchanged.
//!
//! ## Usage
//!
//! ```ignore
//! use token_proxy::{serve, AppState, ProxyConfig};
//!
//! let config = ProxyConfig::from_env()?;
//! let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
//! let state = AppState::new(config, Arc::new(ReqwestHttpClient::try_new()?));
//! serve(listener, state, std::future::pending()).await?;
//! ```

pub mod config;
pub mod error;
pub mod grant;
pub mod server;

pub use config::ProxyConfig;
pub use error::{ProxyError, Result};
pub use grant::{TokenRequest, UpstreamGrant};
pub use server::{cors_layer, router, serve, AppState};

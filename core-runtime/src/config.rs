//! # Core Configuration Module
//!
//! Provides configuration management for the Raagya core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `RaagyaConfig`
//! instance that holds all necessary dependencies and settings for the core.
//! It enforces fail-fast validation so missing bridges or malformed endpoints are
//! reported before any network call is made.
//!
//! ## Required Dependencies
//!
//! - `SettingsStore` - Client-local persisted state (tokens, theme, mock identity)
//! - Token endpoint URL - The token-exchange proxy
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `HttpClient` - HTTP operations (desktop default: reqwest)
//! - `Clock` - Time source (default: system clock)
//!
//! When the `desktop-shims` feature is enabled, a reqwest `HttpClient` is injected
//! automatically, and a SQLite `SettingsStore` is opened at `settings_path` if one
//! was given.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::RaagyaConfig;
//! use std::sync::Arc;
//!
//! let config = RaagyaConfig::builder()
//!     .settings_store(Arc::new(MySettingsStore))
//!     .token_endpoint("https://example.supabase.co/functions/v1/get-spotify-token")
//!     .market("IN")
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::RaagyaConfig;
//!
//! // Missing token endpoint and settings store
//! let config = RaagyaConfig::builder()
//!     .build()
//!     .expect("Should fail - missing required settings");
//! ```

use crate::error::{Error, Result};
use bridge_traits::{Clock, HttpClient, SettingsStore, SystemClock};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::events::DEFAULT_EVENT_BUFFER_SIZE;

/// Spotify Web API base URL.
pub const DEFAULT_CATALOG_API_BASE: &str = "https://api.spotify.com/v1";

/// Spotify authorization page.
pub const DEFAULT_AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";

/// Market hint sent with every catalog request.
pub const DEFAULT_MARKET: &str = "IN";

/// Scopes requested by the authorization-code flow.
pub const DEFAULT_SCOPES: &[&str] = &[
    "user-read-private",
    "user-read-email",
    "user-read-playback-state",
    "user-modify-playback-state",
    "user-read-currently-playing",
    "streaming",
    "user-library-read",
    "user-library-modify",
    "user-top-read",
    "playlist-read-private",
    "playlist-modify-public",
    "playlist-modify-private",
];

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_SEARCH_LIMIT: u32 = 20;
pub const DEFAULT_CHAT_SUGGESTION_LIMIT: u32 = 5;
pub const DEFAULT_VOLUME_PERCENT: u8 = 80;
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(15);

/// Largest page size the catalog accepts.
pub const MAX_CATALOG_LIMIT: u32 = 50;

/// Core configuration for Raagya.
///
/// Use [`RaagyaConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct RaagyaConfig {
    /// HTTP client for the token proxy and catalog
    pub http_client: Arc<dyn HttpClient>,

    /// Client-local key-value storage (required)
    pub settings_store: Arc<dyn SettingsStore>,

    /// Time source used for token expiry
    pub clock: Arc<dyn Clock>,

    /// Token-exchange proxy endpoint
    pub token_endpoint: String,

    /// Gateway API key sent as `apikey` and bearer to the token endpoint
    pub token_endpoint_api_key: Option<String>,

    /// Catalog and authorization settings
    pub spotify: SpotifyConfig,

    /// Upper bound for any single token or catalog request
    pub request_timeout: Duration,

    /// Default page size for browse searches
    pub search_limit: u32,

    /// Page size for chat suggestions
    pub chat_suggestion_limit: u32,

    /// Initial volume for new playback controllers (0-100)
    pub default_volume: u8,

    /// Progress sampler period
    pub progress_interval: Duration,

    /// Metadata watchdog for loads; `None` waits indefinitely
    pub load_timeout: Option<Duration>,

    /// Event bus capacity
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for RaagyaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RaagyaConfig")
            .field("http_client", &"HttpClient { ... }")
            .field("settings_store", &"SettingsStore { ... }")
            .field("clock", &"Clock { ... }")
            .field("token_endpoint", &self.token_endpoint)
            .field(
                "token_endpoint_api_key",
                &self.token_endpoint_api_key.as_ref().map(|_| "***"),
            )
            .field("spotify", &self.spotify)
            .field("request_timeout", &self.request_timeout)
            .field("search_limit", &self.search_limit)
            .field("chat_suggestion_limit", &self.chat_suggestion_limit)
            .field("default_volume", &self.default_volume)
            .field("progress_interval", &self.progress_interval)
            .field("load_timeout", &self.load_timeout)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

/// Catalog and authorization settings for the Spotify Web API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotifyConfig {
    /// Web API base URL
    pub api_base: String,

    /// Market hint (ISO 3166-1 alpha-2)
    pub market: String,

    /// Authorization page URL
    pub authorize_url: String,

    /// Public client id; required only for the authorization-code flow
    pub client_id: Option<String>,

    /// Redirect URI registered for the `/callback` route
    pub redirect_uri: Option<String>,

    /// Scopes requested on authorization
    pub scopes: Vec<String>,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_CATALOG_API_BASE.to_string(),
            market: DEFAULT_MARKET.to_string(),
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            client_id: None,
            redirect_uri: None,
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl SpotifyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_market(mut self, market: impl Into<String>) -> Self {
        self.market = market.into();
        self
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Validates URLs and the market code.
    pub fn validate(&self) -> Result<()> {
        validate_http_url("Catalog API base", &self.api_base)?;
        validate_http_url("Authorize URL", &self.authorize_url)?;

        if let Some(redirect_uri) = &self.redirect_uri {
            validate_http_url("Redirect URI", redirect_uri)?;
        }

        if self.market.len() != 2 || !self.market.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(Error::Config(format!(
                "Market must be a two-letter uppercase country code, got '{}'",
                self.market
            )));
        }

        if matches!(&self.client_id, Some(id) if id.trim().is_empty()) {
            return Err(Error::Config("Client id cannot be blank".to_string()));
        }

        Ok(())
    }
}

fn validate_http_url(label: &str, value: &str) -> Result<()> {
    let parsed = Url::parse(value)
        .map_err(|e| Error::Config(format!("{} '{}' is not a valid URL: {}", label, value, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::Config(format!(
            "{} must use http or https, got '{}'",
            label, other
        ))),
    }
}

impl RaagyaConfig {
    /// Creates a new builder for constructing a `RaagyaConfig`.
    pub fn builder() -> RaagyaConfigBuilder {
        RaagyaConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Endpoint URLs parse and use http(s)
    /// - Market is a two-letter code
    /// - Limits are within `1..=50`
    /// - Volume is within `0..=100`
    /// - Durations are non-zero
    pub fn validate(&self) -> Result<()> {
        validate_http_url("Token endpoint", &self.token_endpoint)?;
        self.spotify.validate()?;

        for (label, limit) in [
            ("Search limit", self.search_limit),
            ("Chat suggestion limit", self.chat_suggestion_limit),
        ] {
            if limit == 0 || limit > MAX_CATALOG_LIMIT {
                return Err(Error::Config(format!(
                    "{} must be between 1 and {}, got {}",
                    label, MAX_CATALOG_LIMIT, limit
                )));
            }
        }

        if self.default_volume > 100 {
            return Err(Error::Config(format!(
                "Default volume must be between 0 and 100, got {}",
                self.default_volume
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "Request timeout must be greater than zero".to_string(),
            ));
        }

        if self.progress_interval.is_zero() {
            return Err(Error::Config(
                "Progress interval must be greater than zero".to_string(),
            ));
        }

        if matches!(self.load_timeout, Some(timeout) if timeout.is_zero()) {
            return Err(Error::Config(
                "Load timeout must be greater than zero; use None to disable it".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::try_new()
        .map_err(|e| Error::Initialization {
        component: "HttpClient".to_string(),
        message: e.to_string(),
    })?;
    let client: Arc<dyn HttpClient> = Arc::new(client);
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required for token exchange and catalog search. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default ReqwestHttpClient. \
                 Web: inject a fetch-based client."
            .to_string(),
    })
}

fn settings_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "SettingsStore".to_string(),
        message: "SettingsStore implementation is required for client-local state. \
                 Desktop: enable 'desktop-shims' and set .settings_path() to use SqliteSettingsStore. \
                 Web: inject a localStorage-backed settings store."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_settings_store(path: Option<PathBuf>) -> Result<Arc<dyn SettingsStore>> {
    use bridge_desktop::SqliteSettingsStore;
    use std::thread;
    use tokio::runtime::{Builder, Handle};

    let path = path.ok_or_else(settings_store_missing_error)?;

    let init_store = |path: PathBuf| -> Result<SqliteSettingsStore> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Initialization {
                component: "settings runtime".to_string(),
                message: e.to_string(),
            })?;

        runtime
            .block_on(SqliteSettingsStore::new(path))
            .map_err(|e| Error::Initialization {
                component: "SettingsStore".to_string(),
                message: e.to_string(),
            })
    };

    // block_on panics inside an existing runtime, so open the store on a helper thread
    let store = match Handle::try_current() {
        Ok(_) => thread::spawn(move || init_store(path))
            .join()
            .map_err(|_| Error::Initialization {
                component: "SettingsStore".to_string(),
                message: "worker thread panicked".to_string(),
            })??,
        Err(_) => init_store(path)?,
    };

    let store: Arc<dyn SettingsStore> = Arc::new(store);
    Ok(store)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_settings_store(_path: Option<PathBuf>) -> Result<Arc<dyn SettingsStore>> {
    Err(settings_store_missing_error())
}

/// Builder for constructing [`RaagyaConfig`] instances.
#[derive(Default)]
pub struct RaagyaConfigBuilder {
    http_client: Option<Arc<dyn HttpClient>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    settings_path: Option<PathBuf>,
    clock: Option<Arc<dyn Clock>>,
    token_endpoint: Option<String>,
    token_endpoint_api_key: Option<String>,
    spotify: SpotifyConfig,
    request_timeout: Option<Duration>,
    search_limit: Option<u32>,
    chat_suggestion_limit: Option<u32>,
    default_volume: Option<u8>,
    progress_interval: Option<Duration>,
    load_timeout: Option<Option<Duration>>,
    event_buffer_size: Option<usize>,
}

impl RaagyaConfigBuilder {
    /// Sets the HTTP client implementation.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the settings store implementation (required unless `settings_path`
    /// is given with `desktop-shims`).
    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    /// Location of the desktop SQLite settings database.
    pub fn settings_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    /// Sets the time source.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the token-exchange proxy endpoint (required).
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::RaagyaConfig;
    ///
    /// let builder = RaagyaConfig::builder()
    ///     .token_endpoint("http://127.0.0.1:8787/get-spotify-token");
    /// ```
    pub fn token_endpoint(mut self, url: impl Into<String>) -> Self {
        self.token_endpoint = Some(url.into());
        self
    }

    /// Gateway key for the token endpoint (e.g. a Supabase anon key).
    pub fn token_endpoint_api_key(mut self, key: impl Into<String>) -> Self {
        self.token_endpoint_api_key = Some(key.into());
        self
    }

    /// Replaces all Spotify settings at once.
    pub fn spotify(mut self, spotify: SpotifyConfig) -> Self {
        self.spotify = spotify;
        self
    }

    /// Overrides the Web API base URL.
    pub fn catalog_api_base(mut self, url: impl Into<String>) -> Self {
        self.spotify.api_base = url.into();
        self
    }

    /// Market hint. Default: `IN`
    pub fn market(mut self, market: impl Into<String>) -> Self {
        self.spotify.market = market.into();
        self
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.spotify.client_id = Some(client_id.into());
        self
    }

    pub fn redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.spotify.redirect_uri = Some(redirect_uri.into());
        self
    }

    /// Default: 15 seconds
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Default: 20
    pub fn search_limit(mut self, limit: u32) -> Self {
        self.search_limit = Some(limit);
        self
    }

    /// Default: 5
    pub fn chat_suggestion_limit(mut self, limit: u32) -> Self {
        self.chat_suggestion_limit = Some(limit);
        self
    }

    /// Default: 80
    pub fn default_volume(mut self, percent: u8) -> Self {
        self.default_volume = Some(percent);
        self
    }

    /// Default: 1 second
    pub fn progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = Some(interval);
        self
    }

    /// Default: `Some(15s)`
    pub fn load_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.load_timeout = Some(timeout);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds the final `RaagyaConfig` instance.
    ///
    /// Returns an error if:
    /// - The token endpoint is missing
    /// - Required bridges are missing and no default is available
    /// - Configuration values are invalid
    pub fn build(self) -> Result<RaagyaConfig> {
        let token_endpoint = self.token_endpoint.ok_or_else(|| {
            Error::Config(
                "Token endpoint is required. Use .token_endpoint() to set it.".to_string(),
            )
        })?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let settings_store = match self.settings_store {
            Some(store) => store,
            None => provide_default_settings_store(self.settings_path)?,
        };

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);

        let config = RaagyaConfig {
            http_client,
            settings_store,
            clock,
            token_endpoint,
            token_endpoint_api_key: self.token_endpoint_api_key,
            spotify: self.spotify,
            request_timeout: self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            search_limit: self.search_limit.unwrap_or(DEFAULT_SEARCH_LIMIT),
            chat_suggestion_limit: self
                .chat_suggestion_limit
                .unwrap_or(DEFAULT_CHAT_SUGGESTION_LIMIT),
            default_volume: self.default_volume.unwrap_or(DEFAULT_VOLUME_PERCENT),
            progress_interval: self.progress_interval.unwrap_or(DEFAULT_PROGRESS_INTERVAL),
            load_timeout: self.load_timeout.unwrap_or(Some(DEFAULT_LOAD_TIMEOUT)),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}

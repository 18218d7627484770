//! Core service façade and bootstrap helpers.
//!
//! This crate wires a validated [`RaagyaConfig`] into the shared Rust core:
//! token manager, catalog client, chat and browse orchestrators, preferences,
//! identity, and playback controllers over host-provided audio outputs.
//! Desktop apps typically enable the `desktop-shims` feature, which lets the
//! configuration fall back to the `bridge-desktop` HTTP client and SQLite
//! settings store.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::RaagyaConfig;
//! use core_service::RaagyaCore;
//!
//! let config = RaagyaConfig::builder()
//!     .settings_path("raagya.db")
//!     .token_endpoint("https://example.supabase.co/functions/v1/get-spotify-token")
//!     .build()?;
//! let core = RaagyaCore::new(config)?;
//!
//! let chat = core.chat();
//! chat.handle_utterance("monsoon melodies").await;
//! ```

pub mod chat;
pub mod content;
pub mod error;
pub mod identity;
pub mod preferences;
pub mod search;

pub use chat::{ChatMessage, ChatOrchestrator, ChatOutcome, Sender};
pub use content::{ResponseProvider, Story, StoryProvider, TemplateResponses, TemplateStoryProvider};
pub use error::{CoreError, Result};
pub use identity::{Identity, MockUser};
pub use preferences::{Preferences, Theme};
pub use search::{SearchOutcome, SearchSession};

use std::sync::Arc;

use bridge_traits::playback::AudioOutput;
use core_auth::{
    authorize_url, handle_callback, AuthorizeConfig, CallbackOutcome, ProxyTokenProvider,
    TokenManager, TokenStore,
};
use core_catalog::{CatalogSearchClient, Track};
use core_playback::{PlaybackConfig, PlaybackController};
use core_runtime::events::{EventBus, EventStream};
use core_runtime::RaagyaConfig;
use tracing::info;

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct RaagyaCore {
    config: Arc<RaagyaConfig>,
    event_bus: EventBus,
    tokens: Arc<TokenManager>,
    catalog: Arc<CatalogSearchClient>,
    responses: Arc<dyn ResponseProvider>,
    stories: Arc<dyn StoryProvider>,
}

impl RaagyaCore {
    /// Build the core with the built-in reply and story templates.
    pub fn new(config: RaagyaConfig) -> Result<Self> {
        Self::with_content(
            config,
            Arc::new(TemplateResponses::new()),
            Arc::new(TemplateStoryProvider::new()),
        )
    }

    pub fn with_content(
        config: RaagyaConfig,
        responses: Arc<dyn ResponseProvider>,
        stories: Arc<dyn StoryProvider>,
    ) -> Result<Self> {
        config.validate()?;
        PlaybackConfig::from_runtime(&config)
            .validate()
            .map_err(CoreError::InitializationFailed)?;

        let event_bus = EventBus::new(config.event_buffer_size);
        let provider = Arc::new(ProxyTokenProvider::from_config(&config));
        let tokens = Arc::new(
            TokenManager::new(
                provider,
                TokenStore::new(config.settings_store.clone()),
                config.clock.clone(),
                event_bus.clone(),
            )
            .with_exchange_timeout(config.request_timeout),
        );
        let catalog = Arc::new(CatalogSearchClient::from_config(&config, tokens.clone()));

        info!(endpoint = %config.token_endpoint, market = %config.spotify.market, "Raagya core ready");

        Ok(Self {
            config: Arc::new(config),
            event_bus,
            tokens,
            catalog,
            responses,
            stories,
        })
    }

    pub fn config(&self) -> &RaagyaConfig {
        &self.config
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Subscribe to every core event, notifications included.
    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    pub fn tokens(&self) -> Arc<TokenManager> {
        self.tokens.clone()
    }

    pub fn catalog(&self) -> Arc<CatalogSearchClient> {
        self.catalog.clone()
    }

    /// A fresh conversation limited to the configured suggestion count.
    pub fn chat(&self) -> ChatOrchestrator {
        ChatOrchestrator::new(
            self.catalog.clone(),
            self.responses.clone(),
            self.event_bus.clone(),
        )
        .with_limit(self.config.chat_suggestion_limit)
    }

    pub fn search_session(&self) -> SearchSession {
        SearchSession::new(self.catalog.clone(), self.event_bus.clone())
            .with_limit(self.config.search_limit)
    }

    pub fn preferences(&self) -> Preferences {
        Preferences::new(self.config.settings_store.clone())
    }

    pub fn identity(&self) -> Identity {
        Identity::new(self.config.settings_store.clone(), self.event_bus.clone())
    }

    /// Controller over `output`. Each output should have exactly one controller.
    pub fn playback_controller(&self, output: Arc<dyn AudioOutput>) -> PlaybackController {
        PlaybackController::new(
            output,
            self.event_bus.clone(),
            PlaybackConfig::from_runtime(&self.config),
        )
    }

    pub fn story_for(&self, track: &Track) -> Story {
        self.stories.compose(track)
    }

    /// Consent URL for connecting a catalog account.
    pub fn authorize_url(&self) -> Result<String> {
        let config = AuthorizeConfig::from_spotify(&self.config.spotify)?;
        Ok(authorize_url(&config)?)
    }

    /// Complete the redirect back from the consent page.
    pub async fn handle_callback(&self, query: &str) -> CallbackOutcome {
        handle_callback(&self.tokens, query).await
    }

    pub async fn is_connected(&self) -> bool {
        self.tokens.is_connected().await
    }

    pub async fn disconnect(&self) -> Result<()> {
        Ok(self.tokens.sign_out().await?)
    }
}

impl std::fmt::Debug for RaagyaCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RaagyaCore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

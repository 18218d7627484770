//! Persisted UI preferences.

use crate::error::Result;
use bridge_traits::storage::SettingsStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

pub const THEME_KEY: &str = "raagya-theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Ocean,
    Sunny,
}

impl Theme {
    pub const ALL: [Theme; 4] = [Theme::Light, Theme::Dark, Theme::Ocean, Theme::Sunny];

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::Ocean => "ocean",
            Theme::Sunny => "sunny",
        }
    }

    /// Class the host applies to its root element. Light uses none.
    pub fn css_class(&self) -> Option<&'static str> {
        match self {
            Theme::Light => None,
            Theme::Dark => Some("dark"),
            Theme::Ocean => Some("ocean-theme"),
            Theme::Sunny => Some("sunny-theme"),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Theme::ALL
            .into_iter()
            .find(|theme| theme.as_str() == s)
            .ok_or_else(|| format!("unknown theme: {}", s))
    }
}

pub struct Preferences {
    store: Arc<dyn SettingsStore>,
}

impl Preferences {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    /// Stored theme, or `fallback` when nothing valid is stored.
    ///
    /// Hosts pass their system color-scheme preference as `fallback`.
    pub async fn theme_or(&self, fallback: Theme) -> Theme {
        match self.store.get_string(THEME_KEY).await {
            Ok(Some(raw)) => raw.parse().unwrap_or_else(|e| {
                warn!(error = %e, "Ignoring stored theme");
                fallback
            }),
            Ok(None) => fallback,
            Err(e) => {
                warn!(error = %e, "Failed to read theme");
                fallback
            }
        }
    }

    pub async fn theme(&self) -> Theme {
        self.theme_or(Theme::default()).await
    }

    pub async fn set_theme(&self, theme: Theme) -> Result<()> {
        self.store.set_string(THEME_KEY, theme.as_str()).await?;
        debug!(%theme, "Theme saved");
        Ok(())
    }
}

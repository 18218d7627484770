//! # Identity
//!
//! Local, mock sign-in for the app shell. No credentials leave the device;
//! a successful login stores a fixed user record derived from the email.

use crate::error::{CoreError, Result};
use bridge_traits::storage::SettingsStore;
use core_runtime::events::{EventBus, Notification};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

pub const USER_KEY: &str = "raagya-user";

const MOCK_USER_ID: &str = "user-123";
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockUser {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl MockUser {
    fn from_email(email: &str) -> Self {
        let name = email.split('@').next().unwrap_or(email).to_string();
        Self {
            id: MOCK_USER_ID.to_string(),
            name,
            email: email.to_string(),
        }
    }
}

pub struct Identity {
    store: Arc<dyn SettingsStore>,
    event_bus: EventBus,
}

impl Identity {
    pub fn new(store: Arc<dyn SettingsStore>, event_bus: EventBus) -> Self {
        Self { store, event_bus }
    }

    /// The signed-in user, if any. An unreadable record counts as signed out.
    pub async fn current_user(&self) -> Option<MockUser> {
        let raw = match self.store.get_string(USER_KEY).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "Failed to read stored user");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "Discarding malformed stored user");
                None
            }
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.current_user().await.is_some()
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<MockUser> {
        let email = email.trim();
        if email.is_empty() || password.chars().count() < MIN_PASSWORD_LEN {
            self.event_bus.notify(Notification::destructive(
                "Login failed",
                "Please check your credentials and try again.",
            ));
            return Err(CoreError::InvalidCredentials(
                "email required and password must be at least 6 characters".to_string(),
            ));
        }

        let user = MockUser::from_email(email);
        let raw = serde_json::to_string(&user)
            .map_err(|e| CoreError::Storage(format!("Failed to encode user: {}", e)))?;
        self.store.set_string(USER_KEY, &raw).await?;

        info!(user_id = %user.id, "Signed in");
        self.event_bus.notify(Notification::info(
            "Welcome to Raagya!",
            "Login successful. Enjoy your musical journey!",
        ));
        Ok(user)
    }

    pub async fn logout(&self) -> Result<()> {
        self.store.delete(USER_KEY).await?;
        info!("Signed out");
        self.event_bus.notify(Notification::info(
            "Logged out",
            "You have been successfully logged out.",
        ));
        Ok(())
    }
}

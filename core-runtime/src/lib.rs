//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the Raagya core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus and user-facing notifications
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that other modules depend on.
//! It establishes the configuration, logging conventions, and event
//! broadcasting mechanisms used throughout the system.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{RaagyaConfig, RaagyaConfigBuilder, SpotifyConfig};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, EventStream, Notification, NotificationVariant};

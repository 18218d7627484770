//! # Playback Module
//!
//! Preview playback state machine for the Raagya core.
//!
//! ## Overview
//!
//! This module handles:
//! - A single [`PlaybackController`] owning the host audio output
//! - Load tickets that discard callbacks from replaced sources
//! - Periodic position sampling while playing
//! - An optional watchdog for loads that never resolve
//! - User notifications for every visible transition
//!
//! Only 30-second previews are played. Tracks without a preview can still be
//! selected; the session then carries a link to the full track in the catalog.

pub mod config;
pub mod controller;
pub mod error;
pub mod notices;
pub mod sampler;
pub mod session;

pub use config::PlaybackConfig;
pub use controller::PlaybackController;
pub use error::{PlaybackError, Result};
pub use session::{PlaybackSession, PlaybackState};

//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the Raagya core and host-specific
//! implementations. Each trait represents a capability that the core requires but
//! that must be implemented differently per host (desktop, browser, tests).
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async HTTP requests
//!
//! ### Storage
//! - [`SettingsStore`](storage::SettingsStore) - Keyed-string client-local state
//!
//! ### Audio
//! - [`AudioOutput`](playback::AudioOutput) - The single audio element driven by the
//!   playback controller
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Host    | Implementation Crate | Status |
//! |---------|----------------------|--------|
//! | Desktop | `bridge-desktop`     | ✅ HTTP + settings |
//! | Browser | host application     | 📋 Planned |
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with descriptive errors when a required capability is missing:
//!
//! ```ignore
//! let settings_store = self.settings_store.ok_or_else(|| Error::CapabilityMissing {
//!     capability: "SettingsStore".to_string(),
//!     message: "No settings store provided. Inject a host adapter.".to_string(),
//! })?;
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Host
//! implementations should convert platform-specific errors to `BridgeError`
//! with actionable messages.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds to support safe concurrent usage
//! across async tasks.

pub mod error;
pub mod http;
pub mod playback;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use playback::{AudioOutput, AudioSource, LoadTicket, OutputEvent};
pub use storage::{MemorySettingsStore, SettingsStore};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, ManualClock, StderrLogger, SystemClock};

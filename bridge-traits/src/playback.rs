//! Playback bridge traits and supporting audio types.
//!
//! The host owns the actual audio element (an HTML `<audio>` element, a native
//! player, a test double). The core drives it exclusively through
//! [`AudioOutput`] and receives its asynchronous callbacks as [`OutputEvent`]s
//! tagged with the [`LoadTicket`] of the load that produced them.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::error::Result;

/// Identity of a single source assignment.
///
/// Tickets increase monotonically per controller. A callback carrying a ticket
/// other than the latest one refers to a source that has since been replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadTicket(u64);

impl LoadTicket {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// The ticket issued after this one.
    pub fn next(&self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for LoadTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "load#{}", self.0)
    }
}

/// High-level audio source descriptor provided to the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    /// Remote HTTP(S) stream to be fetched by the host.
    RemoteStream {
        url: String,
        headers: HashMap<String, String>,
    },
}

impl AudioSource {
    /// Remote source without extra request headers.
    pub fn remote(url: impl Into<String>) -> Self {
        AudioSource::RemoteStream {
            url: url.into(),
            headers: HashMap::new(),
        }
    }

    pub fn url(&self) -> &str {
        match self {
            AudioSource::RemoteStream { url, .. } => url,
        }
    }

    /// Determine whether the source represents remote content.
    pub fn is_remote(&self) -> bool {
        matches!(self, AudioSource::RemoteStream { .. })
    }
}

/// Asynchronous notifications raised by the host audio output.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputEvent {
    /// Source metadata resolved; the media is ready to start.
    MetadataLoaded { ticket: LoadTicket, duration: Duration },
    /// Playback reached end of media.
    Ended { ticket: LoadTicket },
    /// Decode or network failure on the attached source.
    Error { ticket: LoadTicket, message: String },
}

impl OutputEvent {
    pub fn ticket(&self) -> LoadTicket {
        match self {
            OutputEvent::MetadataLoaded { ticket, .. }
            | OutputEvent::Ended { ticket }
            | OutputEvent::Error { ticket, .. } => *ticket,
        }
    }
}

/// Single audio-output resource driven by the playback controller.
///
/// Implementations report completion of `attach` asynchronously through
/// [`OutputEvent::MetadataLoaded`]; `attach` itself only assigns the source.
/// Volume is normalized to `0.0..=1.0`.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Replace the current source, releasing the previous one.
    async fn attach(&self, ticket: LoadTicket, source: AudioSource) -> Result<()>;

    /// Release the current source entirely. The output is silent afterwards.
    async fn detach(&self) -> Result<()>;

    /// Begin or resume playback.
    async fn play(&self) -> Result<()>;

    /// Pause playback without releasing the source.
    async fn pause(&self) -> Result<()>;

    /// Seek to an absolute position within the source.
    async fn seek(&self, position: Duration) -> Result<()>;

    /// Adjust playback volume.
    async fn set_volume(&self, volume: f32) -> Result<()>;

    /// Current playback position.
    async fn position(&self) -> Result<Duration>;
}

//! Playback session snapshot

use crate::error::PlaybackError;
use core_catalog::Track;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Transport state of the controller.
///
/// ```text
/// Idle ── load ──► Loading ── metadata ──► Paused ◄──► Playing ── end ──► Ended
///            │                                 ▲                            │
///            └── no preview / failure ──► Error └────────── play ───────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Idle,
    Loading,
    Playing,
    Paused,
    Ended,
    Error,
}

impl PlaybackState {
    /// States in which `seek` is honored.
    pub fn is_seekable(&self) -> bool {
        matches!(self, PlaybackState::Playing | PlaybackState::Paused)
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Loading => "loading",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Ended => "ended",
            PlaybackState::Error => "error",
        };
        f.write_str(label)
    }
}

/// Point-in-time view of the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSession {
    pub current_track: Option<Track>,
    pub state: PlaybackState,
    pub position_seconds: f64,
    /// Zero until the source metadata resolves.
    pub duration_seconds: f64,
    pub volume_percent: u8,
    pub last_error: Option<PlaybackError>,
}

impl PlaybackSession {
    pub fn new(volume_percent: u8) -> Self {
        Self {
            current_track: None,
            state: PlaybackState::Idle,
            position_seconds: 0.0,
            duration_seconds: 0.0,
            volume_percent: volume_percent.min(100),
            last_error: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn track_id(&self) -> Option<&str> {
        self.current_track.as_ref().map(|t| t.id.as_str())
    }

    /// Link for opening the current track in the external catalog.
    pub fn catalog_link(&self) -> Option<String> {
        self.current_track.as_ref().and_then(Track::external_url)
    }

    /// Played fraction in `0.0..=1.0`, or `0.0` when the duration is unknown.
    pub fn progress(&self) -> f64 {
        if self.duration_seconds > 0.0 {
            (self.position_seconds / self.duration_seconds).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self::new(core_runtime::config::DEFAULT_VOLUME_PERCENT)
    }
}

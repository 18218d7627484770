//! # Playback Error Types
//!
//! Errors absorbed by the playback controller. They are recorded on the
//! session and reported as events and notifications, never returned to the
//! caller of a transport operation.

use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    // ========================================================================
    // Selection Errors
    // ========================================================================
    /// Attempted to play when no track is loaded.
    #[error("No track selected")]
    NoTrackSelected,

    /// The track carries no preview audio.
    #[error("Preview unavailable for track {track_id}")]
    PreviewUnavailable { track_id: String },

    // ========================================================================
    // Output Errors
    // ========================================================================
    /// The audio output refused the source or the play request.
    #[error("Audio source rejected: {0}")]
    SourceRejected(String),

    /// The audio output reported a decode or network failure.
    #[error("Audio output error: {0}")]
    Output(String),

    /// Source metadata did not resolve in time.
    #[error("Track did not load within {seconds}s")]
    LoadTimeout { seconds: u64 },
}

impl PlaybackError {
    /// Returns `true` if reloading the same track may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PlaybackError::Output(_) | PlaybackError::LoadTimeout { .. }
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

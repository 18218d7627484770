//! Catalog data types
//!
//! [`Track`] is the application-facing record. The `Raw*` types mirror the
//! Spotify Web API JSON closely enough for deserialization and are only
//! consumed by the mapping step.

use serde::{Deserialize, Serialize};

/// Cover art used when the album carries no image.
pub const PLACEHOLDER_COVER: &str = "/placeholder.svg";

/// Artist label used when a track lists no artists.
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Title used when the catalog record has no name.
pub const UNTITLED: &str = "Untitled";

const TRACK_URI_PREFIX: &str = "spotify:track:";
const TRACK_WEB_BASE: &str = "https://open.spotify.com/track/";

/// A song as presented to the rest of the application.
///
/// `preview_url` is `None` when the catalog has no short audio preview for
/// the track. `catalog_uri` is `None` when the track cannot be opened in the
/// external catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub cover_url: String,
    pub preview_url: Option<String>,
    pub catalog_uri: Option<String>,
    pub duration_seconds: Option<f64>,
}

impl Track {
    pub fn has_preview(&self) -> bool {
        self.preview_url.is_some()
    }

    /// Web link for the track.
    ///
    /// `spotify:track:<id>` URIs become `https://open.spotify.com/track/<id>`;
    /// any other URI is returned unchanged.
    pub fn external_url(&self) -> Option<String> {
        let uri = self.catalog_uri.as_deref()?;
        Some(match uri.strip_prefix(TRACK_URI_PREFIX) {
            Some(id) if !id.is_empty() => format!("{}{}", TRACK_WEB_BASE, id),
            _ => uri.to_string(),
        })
    }
}

/// Seeds for a recommendations request.
///
/// The catalog accepts between one and five seeds in total.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecommendationSeeds {
    pub tracks: Vec<String>,
    pub artists: Vec<String>,
    pub genres: Vec<String>,
}

impl RecommendationSeeds {
    pub const MAX_SEEDS: usize = 5;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_track(mut self, id: impl Into<String>) -> Self {
        self.tracks.push(id.into());
        self
    }

    pub fn with_artist(mut self, id: impl Into<String>) -> Self {
        self.artists.push(id.into());
        self
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genres.push(genre.into());
        self
    }

    pub fn len(&self) -> usize {
        self.tracks.len() + self.artists.len() + self.genres.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Raw API payloads
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawArtist {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawImage {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAlbum {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub images: Vec<RawImage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTrack {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artists: Vec<RawArtist>,
    #[serde(default)]
    pub album: Option<RawAlbum>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPaging {
    #[serde(default)]
    pub items: Vec<Option<RawTrack>>,
    #[serde(default)]
    pub total: Option<u64>,
}

/// `GET /search?type=track`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub tracks: Option<RawPaging>,
}

/// `GET /recommendations`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecommendationsResponse {
    #[serde(default)]
    pub tracks: Vec<Option<RawTrack>>,
}

/// Error envelope: `{"error": {"status": 401, "message": "..."}}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub error: Option<ApiErrorDetail>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
}

//! Raw catalog record → [`Track`] conversion

use crate::types::{RawTrack, Track, PLACEHOLDER_COVER, UNKNOWN_ARTIST, UNTITLED};

/// Convert one raw catalog track.
///
/// Returns `None` for records without an id, which cannot be played or
/// linked.
pub fn map_track(raw: RawTrack) -> Option<Track> {
    let id = raw.id.filter(|id| !id.is_empty())?;

    let artist = raw
        .artists
        .iter()
        .map(|a| a.name.as_str())
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    let cover_url = raw
        .album
        .and_then(|album| album.images.into_iter().next())
        .map(|image| image.url)
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| PLACEHOLDER_COVER.to_string());

    let title = if raw.name.trim().is_empty() {
        UNTITLED.to_string()
    } else {
        raw.name
    };

    Some(Track {
        id,
        title,
        artist: if artist.is_empty() {
            UNKNOWN_ARTIST.to_string()
        } else {
            artist
        },
        cover_url,
        preview_url: non_empty(raw.preview_url),
        catalog_uri: non_empty(raw.uri),
        duration_seconds: raw.duration_ms.map(|ms| ms as f64 / 1000.0),
    })
}

/// Map a result page, keeping relevance order and dropping null items.
pub fn map_tracks<I>(items: I) -> Vec<Track>
where
    I: IntoIterator<Item = Option<RawTrack>>,
{
    items.into_iter().flatten().filter_map(map_track).collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

//! User-facing playback notifications.

use core_runtime::events::Notification;

pub fn no_song_selected() -> Notification {
    Notification::destructive("No Song Selected", "Please select a song to play")
}

pub fn preview_unavailable() -> Notification {
    Notification::destructive(
        "Preview Unavailable",
        "This track doesn't have a preview available.",
    )
}

pub fn playing_preview() -> Notification {
    Notification::info(
        "Playing Preview",
        "This is a 30-second preview. Open in Spotify for the full song.",
    )
}

pub fn preview_ended() -> Notification {
    Notification::info(
        "Preview Ended",
        "Open in Spotify to listen to the full song",
    )
}

pub fn playback_error() -> Notification {
    Notification::destructive(
        "Playback Error",
        "Could not play preview. Try opening in Spotify.",
    )
}

//! # Event Bus
//!
//! Typed events and user-facing notifications, fanned out over a
//! `tokio::sync::broadcast` channel.
//!
//! ## Overview
//!
//! Producers (token manager, search orchestrators, playback controllers) hold
//! a clone of the [`EventBus`] and publish [`CoreEvent`]s. The host UI
//! subscribes and renders [`Notification`]s as toasts. Nobody is required to
//! listen: emitting without subscribers fails and producers ignore it.
//!
//! A receiver that falls more than `capacity` events behind gets
//! `RecvError::Lagged(n)` once and then continues with newer events.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, Notification};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut rx = bus.subscribe();
//!
//! bus.notify(Notification::info("Playing Preview", "This is a 30-second preview."));
//!
//! let event = rx.recv().await.unwrap();
//! assert_eq!(event.as_notification().map(|n| n.title.as_str()), Some("Playing Preview"));
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Auth(AuthEvent),
    Search(SearchEvent),
    Playback(PlaybackEvent),
    Notification(Notification),
}

impl CoreEvent {
    pub fn as_notification(&self) -> Option<&Notification> {
        match self {
            CoreEvent::Notification(n) => Some(n),
            _ => None,
        }
    }
}

/// Token lifecycle. Token strings never appear here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AuthEvent {
    TokenAcquired {
        /// `client_credentials` or `authorization_code`.
        grant: String,
        expires_at_ms: i64,
    },
    TokenRefreshing,
    TokenRefreshed {
        expires_at_ms: i64,
    },
    /// Every persisted token field was removed.
    TokensCleared {
        /// `refresh_failed` or `sign_out`.
        reason: String,
    },
    AuthError {
        message: String,
        recoverable: bool,
    },
}

/// Catalog searches issued by the chat and browse orchestrators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SearchEvent {
    Started {
        /// Monotonic within the issuing session.
        request_id: u64,
        query: String,
    },
    Completed {
        request_id: u64,
        result_count: usize,
    },
    Failed {
        request_id: u64,
        message: String,
    },
}

/// Playback controller transitions. Positions are milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    TrackLoaded {
        track_id: String,
        has_preview: bool,
    },
    /// Source metadata resolved.
    Ready {
        track_id: String,
        duration_ms: u64,
    },
    Started {
        track_id: String,
        title: String,
    },
    Paused {
        track_id: String,
        position_ms: u64,
    },
    /// The preview ran to its end.
    Completed {
        track_id: String,
    },
    PositionChanged {
        track_id: String,
        position_ms: u64,
        duration_ms: u64,
    },
    VolumeChanged {
        percent: u8,
    },
    Error {
        track_id: Option<String>,
        message: String,
        recoverable: bool,
    },
}

// ============================================================================
// Notifications
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotificationVariant {
    #[default]
    Default,
    Destructive,
}

/// Transient, dismissible toast.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub variant: NotificationVariant,
}

impl Notification {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::with_variant(title, description, NotificationVariant::Default)
    }

    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::with_variant(title, description, NotificationVariant::Destructive)
    }

    fn with_variant(
        title: impl Into<String>,
        description: impl Into<String>,
        variant: NotificationVariant,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant,
        }
    }

    pub fn is_destructive(&self) -> bool {
        self.variant == NotificationVariant::Destructive
    }
}

// ============================================================================
// Bus
// ============================================================================

/// Cloneable broadcast handle. Past events are not replayed to new
/// subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// `capacity` is the per-subscriber backlog before lagging.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Returns how many subscribers got the event; errors when there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    pub fn notify(&self, notification: Notification) {
        let _ = self.emit(CoreEvent::Notification(notification));
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

type Predicate = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// Receiver with an optional predicate.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let bus = EventBus::new(16);
/// let toasts = EventStream::new(bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Notification(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    predicate: Option<Predicate>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            predicate: None,
        }
    }

    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.predicate.as_ref().map_or(true, |p| p(event))
    }

    /// Wait for the next accepted event.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Take every accepted event already buffered, skipping over lag.
    pub fn drain(&mut self) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.accepts(&event) => events.push(event),
                Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return events,
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("filtered", &self.predicate.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers_is_harmless() {
        let bus = EventBus::new(4);
        assert!(bus.emit(CoreEvent::Auth(AuthEvent::TokenRefreshing)).is_err());
        bus.notify(Notification::info("Logged out", "See you soon."));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_every_subscriber_sees_each_event() {
        let bus = EventBus::new(4);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        let event = CoreEvent::Search(SearchEvent::Started {
            request_id: 1,
            query: "lofi".to_string(),
        });
        assert_eq!(bus.emit(event.clone()).unwrap(), 2);

        assert_eq!(first.recv().await.unwrap(), event);
        assert_eq!(second.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_filtered_stream_skips_other_events() {
        let bus = EventBus::new(4);
        let mut toasts = EventStream::new(bus.subscribe())
            .filter(|event| event.as_notification().is_some());

        let _ = bus.emit(CoreEvent::Playback(PlaybackEvent::VolumeChanged { percent: 40 }));
        let toast = Notification::destructive("Playback Error", "Could not play preview.");
        bus.notify(toast.clone());

        assert_eq!(toasts.recv().await.unwrap(), CoreEvent::Notification(toast));
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();

        for i in 0..5 {
            let _ = bus.emit(CoreEvent::Auth(AuthEvent::TokenRefreshed {
                expires_at_ms: 1_700_000_000_000 + i,
            }));
        }

        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(3))));
    }

    #[test]
    fn test_drain_skips_lag_and_returns_newest() {
        let bus = EventBus::new(2);
        let mut stream = EventStream::new(bus.subscribe());

        for percent in [10, 20, 30, 40] {
            let _ = bus.emit(CoreEvent::Playback(PlaybackEvent::VolumeChanged { percent }));
        }

        let drained = stream.drain();
        assert_eq!(
            drained,
            vec![
                CoreEvent::Playback(PlaybackEvent::VolumeChanged { percent: 30 }),
                CoreEvent::Playback(PlaybackEvent::VolumeChanged { percent: 40 }),
            ]
        );
        assert!(stream.drain().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_publishers() {
        let bus = EventBus::new(64);
        let mut stream = EventStream::new(bus.subscribe());

        let searches = {
            let bus = bus.clone();
            tokio::spawn(async move {
                for request_id in 0..10 {
                    let _ = bus.emit(CoreEvent::Search(SearchEvent::Completed {
                        request_id,
                        result_count: 5,
                    }));
                }
            })
        };
        let ticks = {
            let bus = bus.clone();
            tokio::spawn(async move {
                for i in 0..10 {
                    let _ = bus.emit(CoreEvent::Playback(PlaybackEvent::PositionChanged {
                        track_id: "t1".to_string(),
                        position_ms: i * 1000,
                        duration_ms: 30_000,
                    }));
                }
            })
        };
        searches.await.unwrap();
        ticks.await.unwrap();

        assert_eq!(stream.drain().len(), 20);
    }

    #[test]
    fn test_wire_shape() {
        let event = CoreEvent::Notification(Notification::destructive(
            "Preview Unavailable",
            "This track doesn't have a preview available.",
        ));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "Notification");
        assert_eq!(json["payload"]["variant"], "destructive");

        let paused = CoreEvent::Playback(PlaybackEvent::Paused {
            track_id: "t1".to_string(),
            position_ms: 1200,
        });
        let json = serde_json::to_value(&paused).unwrap();
        assert_eq!(json["payload"]["event"], "Paused");
        assert_eq!(json["payload"]["position_ms"], 1200);
    }

    #[test]
    fn test_notification_variants() {
        assert!(Notification::destructive("Search Failed", "x").is_destructive());
        assert!(!Notification::info("No songs found", "x").is_destructive());
        assert_eq!(
            CoreEvent::Auth(AuthEvent::TokenRefreshing).as_notification(),
            None
        );
    }
}

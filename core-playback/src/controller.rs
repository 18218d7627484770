//! # Playback Controller
//!
//! Transport state machine over a single host audio output.
//!
//! ## Overview
//!
//! The controller is the only component that touches the [`AudioOutput`].
//! Every load issues a fresh [`LoadTicket`]; callbacks from the output carry
//! the ticket of the load that produced them and are ignored once a newer
//! load (or a shutdown) has happened.
//!
//! Session state sits behind a synchronous mutex that is released before
//! every call into the output. Source changes (attach, detach) are
//! serialized by a separate async lock, and after each awaited output call
//! the ticket is checked again before the result is applied.
//!
//! Failures never surface as `Err` to callers. They move the session to
//! [`PlaybackState::Error`], publish [`PlaybackEvent::Error`] and raise a
//! user notification.
//!
//! ## Usage
//!
//! ```ignore
//! let controller = PlaybackController::new(output, event_bus, PlaybackConfig::default());
//!
//! let ticket = controller.load_track(track).await;
//! // later, from the host output:
//! controller.handle_event(OutputEvent::MetadataLoaded { ticket, duration }).await;
//! controller.play().await;
//! ```

use crate::config::PlaybackConfig;
use crate::error::PlaybackError;
use crate::notices;
use crate::sampler::{BackgroundTask, ProgressSampler};
use crate::session::{PlaybackSession, PlaybackState};
use bridge_traits::playback::{AudioOutput, AudioSource, LoadTicket, OutputEvent};
use core_catalog::Track;
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use futures::FutureExt;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Owner of the audio output and the playback session.
///
/// Dropping the controller aborts its background tasks.
pub struct PlaybackController {
    inner: Arc<Inner>,
}

struct Inner {
    output: Arc<dyn AudioOutput>,
    event_bus: EventBus,
    config: PlaybackConfig,
    state: Mutex<ControllerState>,
    /// Held across attach/detach so source changes land in ticket order.
    lifecycle: tokio::sync::Mutex<()>,
}

struct ControllerState {
    session: PlaybackSession,
    /// Latest ticket issued; anything else is stale.
    ticket: LoadTicket,
    /// `play()` arrived while the source was still loading.
    play_when_ready: bool,
    sampler: ProgressSampler,
    watchdog: Option<BackgroundTask>,
}

impl ControllerState {
    fn is_current(&self, ticket: LoadTicket) -> bool {
        self.ticket == ticket
    }

    fn stop_tasks(&mut self) {
        self.sampler.stop();
        self.watchdog = None;
    }

    fn track_id(&self) -> Option<String> {
        self.session.track_id().map(String::from)
    }
}

enum PlayAction {
    NoTrack,
    NoPreview,
    Deferred,
    AlreadyPlaying,
    Unplayable,
    Start { ticket: LoadTicket, rewind: bool },
}

impl PlaybackController {
    pub fn new(output: Arc<dyn AudioOutput>, event_bus: EventBus, config: PlaybackConfig) -> Self {
        let session = PlaybackSession::new(config.default_volume);
        Self {
            inner: Arc::new(Inner {
                output,
                event_bus,
                config,
                state: Mutex::new(ControllerState {
                    session,
                    ticket: LoadTicket::new(0),
                    play_when_ready: false,
                    sampler: ProgressSampler::new(),
                    watchdog: None,
                }),
                lifecycle: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Make `track` current and start loading its preview.
    pub async fn load_track(&self, track: Track) -> LoadTicket {
        self.inner.load_track(track).await
    }

    pub async fn play(&self) {
        self.inner.play().await
    }

    pub async fn pause(&self) {
        self.inner.pause().await
    }

    pub async fn toggle_play_pause(&self) {
        if self.session().is_playing() {
            self.inner.pause().await
        } else {
            self.inner.play().await
        }
    }

    /// Move to `seconds`, clamped to the known duration.
    pub async fn seek(&self, seconds: f64) {
        self.inner.seek(seconds).await
    }

    /// Set the volume in percent. Values outside `0..=100` are clamped.
    pub async fn set_volume(&self, percent: i32) {
        self.inner.set_volume(percent).await
    }

    pub async fn on_metadata_loaded(&self, ticket: LoadTicket, duration: Duration) {
        self.inner.on_metadata_loaded(ticket, duration).await
    }

    pub async fn on_ended(&self, ticket: LoadTicket) {
        self.inner.on_ended(ticket)
    }

    pub async fn on_error(&self, ticket: LoadTicket, message: impl Into<String>) {
        self.inner.fail(ticket, PlaybackError::Output(message.into()))
    }

    /// Dispatch a callback from the host output.
    pub async fn handle_event(&self, event: OutputEvent) {
        match event {
            OutputEvent::MetadataLoaded { ticket, duration } => {
                self.on_metadata_loaded(ticket, duration).await
            }
            OutputEvent::Ended { ticket } => self.on_ended(ticket).await,
            OutputEvent::Error { ticket, message } => self.on_error(ticket, message).await,
        }
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> PlaybackSession {
        self.inner.state.lock().session.clone()
    }

    pub fn current_ticket(&self) -> LoadTicket {
        self.inner.state.lock().ticket
    }

    /// Whether the progress sampler is running.
    pub fn is_sampling(&self) -> bool {
        self.inner.state.lock().sampler.is_running()
    }

    /// Stop everything and release the output. Safe to call repeatedly.
    pub async fn shutdown(&self) {
        self.inner.shutdown().await
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.inner.state.lock().stop_tasks();
    }
}

impl std::fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let st = self.inner.state.lock();
        f.debug_struct("PlaybackController")
            .field("ticket", &st.ticket)
            .field("state", &st.session.state)
            .finish_non_exhaustive()
    }
}

impl Inner {
    #[instrument(skip(self, track), fields(track_id = %track.id))]
    async fn load_track(self: &Arc<Self>, track: Track) -> LoadTicket {
        let track_id = track.id.clone();
        let preview_url = track.preview_url.clone();

        let ticket = {
            let mut st = self.state.lock();
            st.ticket = st.ticket.next();
            st.stop_tasks();
            st.play_when_ready = false;

            let session = &mut st.session;
            session.current_track = Some(track);
            session.position_seconds = 0.0;
            session.duration_seconds = 0.0;
            if preview_url.is_some() {
                session.state = PlaybackState::Loading;
                session.last_error = None;
            } else {
                session.state = PlaybackState::Error;
                session.last_error = Some(PlaybackError::PreviewUnavailable {
                    track_id: track_id.clone(),
                });
            }
            st.ticket
        };

        info!(%ticket, has_preview = preview_url.is_some(), "Track loaded");
        self.emit(PlaybackEvent::TrackLoaded {
            track_id: track_id.clone(),
            has_preview: preview_url.is_some(),
        });

        let _lifecycle = self.lifecycle.lock().await;
        if !self.is_current(ticket) {
            debug!(%ticket, "Load superseded before reaching the output");
            return ticket;
        }

        let Some(url) = preview_url else {
            if let Err(e) = self.output.detach().await {
                warn!(error = %e, "Failed to release previous source");
            }
            if !self.is_current(ticket) {
                return ticket;
            }
            let error = PlaybackError::PreviewUnavailable {
                track_id: track_id.clone(),
            };
            self.emit(PlaybackEvent::Error {
                track_id: Some(track_id),
                message: error.to_string(),
                recoverable: false,
            });
            self.event_bus.notify(notices::preview_unavailable());
            return ticket;
        };

        if let Err(e) = self.output.attach(ticket, AudioSource::remote(url)).await {
            self.fail(ticket, PlaybackError::SourceRejected(e.to_string()));
            return ticket;
        }

        let volume = {
            let st = self.state.lock();
            if !st.is_current(ticket) {
                return ticket;
            }
            st.session.volume_percent
        };
        if let Err(e) = self.output.set_volume(f32::from(volume) / 100.0).await {
            warn!(error = %e, "Failed to apply volume to new source");
        }

        if let Some(timeout) = self.config.load_timeout {
            let weak = Arc::downgrade(self);
            let mut st = self.state.lock();
            if st.is_current(ticket) && st.session.state == PlaybackState::Loading {
                st.watchdog = Some(BackgroundTask::spawn(async move {
                    tokio::time::sleep(timeout).await;
                    if let Some(inner) = weak.upgrade() {
                        inner.on_load_timeout(ticket, timeout);
                    }
                }));
            }
        }

        ticket
    }

    async fn on_metadata_loaded(self: &Arc<Self>, ticket: LoadTicket, duration: Duration) {
        let (track_id, autoplay) = {
            let mut st = self.state.lock();
            if !st.is_current(ticket) || st.session.state != PlaybackState::Loading {
                debug!(%ticket, "Ignoring stale metadata callback");
                return;
            }
            st.watchdog = None;
            st.session.duration_seconds = duration.as_secs_f64();
            st.session.state = PlaybackState::Paused;
            let autoplay = std::mem::take(&mut st.play_when_ready);
            (st.track_id().unwrap_or_default(), autoplay)
        };

        debug!(%ticket, duration_ms = duration.as_millis() as u64, "Source ready");
        self.emit(PlaybackEvent::Ready {
            track_id,
            duration_ms: duration.as_millis() as u64,
        });

        if autoplay {
            self.play().await;
        }
    }

    fn on_load_timeout(&self, ticket: LoadTicket, timeout: Duration) {
        self.fail_when(
            ticket,
            PlaybackError::LoadTimeout {
                seconds: timeout.as_secs(),
            },
            |state| state == PlaybackState::Loading,
        );
    }

    async fn play(self: &Arc<Self>) {
        let (action, track_id) = {
            let mut st = self.state.lock();
            let track_id = st.track_id();
            let has_preview = st.session.current_track.as_ref().map(Track::has_preview);
            let action = match (has_preview, st.session.state) {
                (None, _) => PlayAction::NoTrack,
                (Some(false), _) => PlayAction::NoPreview,
                (Some(true), PlaybackState::Loading) => {
                    st.play_when_ready = true;
                    PlayAction::Deferred
                }
                (Some(true), PlaybackState::Playing) => PlayAction::AlreadyPlaying,
                (Some(true), PlaybackState::Paused) => PlayAction::Start {
                    ticket: st.ticket,
                    rewind: false,
                },
                (Some(true), PlaybackState::Ended) => PlayAction::Start {
                    ticket: st.ticket,
                    rewind: true,
                },
                (Some(true), PlaybackState::Error | PlaybackState::Idle) => PlayAction::Unplayable,
            };
            (action, track_id)
        };

        match action {
            PlayAction::NoTrack => {
                info!("Play requested with no track selected");
                self.emit(PlaybackEvent::Error {
                    track_id: None,
                    message: PlaybackError::NoTrackSelected.to_string(),
                    recoverable: false,
                });
                self.event_bus.notify(notices::no_song_selected());
            }
            PlayAction::NoPreview => {
                info!("Play requested for a track without preview");
                let track_id = track_id.unwrap_or_default();
                self.emit(PlaybackEvent::Error {
                    message: PlaybackError::PreviewUnavailable {
                        track_id: track_id.clone(),
                    }
                    .to_string(),
                    track_id: Some(track_id),
                    recoverable: false,
                });
                self.event_bus.notify(notices::preview_unavailable());
            }
            PlayAction::Deferred => debug!("Play deferred until the source is ready"),
            PlayAction::AlreadyPlaying => debug!("Already playing"),
            PlayAction::Unplayable => {
                warn!("Play requested while the source is in an error state");
                self.event_bus.notify(notices::playback_error());
            }
            PlayAction::Start { ticket, rewind } => self.start_playback(ticket, rewind).await,
        }
    }

    async fn start_playback(self: &Arc<Self>, ticket: LoadTicket, rewind: bool) {
        if rewind {
            if let Err(e) = self.output.seek(Duration::ZERO).await {
                self.fail(ticket, PlaybackError::Output(e.to_string()));
                return;
            }
        }

        if let Err(e) = self.output.play().await {
            self.fail(ticket, PlaybackError::SourceRejected(e.to_string()));
            return;
        }

        let started = {
            let mut st = self.state.lock();
            if !st.is_current(ticket)
                || !matches!(
                    st.session.state,
                    PlaybackState::Paused | PlaybackState::Ended
                )
            {
                None
            } else {
                st.session.state = PlaybackState::Playing;
                if rewind {
                    st.session.position_seconds = 0.0;
                }
                let weak = Arc::downgrade(self);
                st.sampler.start(self.config.progress_interval, move || {
                    let weak = weak.clone();
                    async move {
                        match weak.upgrade() {
                            Some(inner) => inner.sample(ticket).await,
                            None => false,
                        }
                    }
                    .boxed()
                });
                st.session
                    .current_track
                    .as_ref()
                    .map(|t| (t.id.clone(), t.title.clone()))
            }
        };

        if let Some((track_id, title)) = started {
            info!(%track_id, "Playback started");
            self.emit(PlaybackEvent::Started { track_id, title });
            self.event_bus.notify(notices::playing_preview());
        }
    }

    /// One sampler tick. Returns `false` once sampling should stop.
    async fn sample(&self, ticket: LoadTicket) -> bool {
        {
            let st = self.state.lock();
            if !st.is_current(ticket) || st.session.state != PlaybackState::Playing {
                return false;
            }
        }

        let position = match self.output.position().await {
            Ok(position) => position,
            Err(e) => {
                debug!(error = %e, "Position unavailable");
                return true;
            }
        };

        let event = {
            let mut st = self.state.lock();
            if !st.is_current(ticket) || st.session.state != PlaybackState::Playing {
                return false;
            }
            let duration = st.session.duration_seconds;
            let seconds = clamp_position(position.as_secs_f64(), duration);
            st.session.position_seconds = seconds;
            PlaybackEvent::PositionChanged {
                track_id: st.track_id().unwrap_or_default(),
                position_ms: to_millis(seconds),
                duration_ms: to_millis(duration),
            }
        };

        self.emit(event);
        true
    }

    async fn pause(&self) {
        let ticket = {
            let mut st = self.state.lock();
            if st.session.state != PlaybackState::Playing {
                debug!(state = %st.session.state, "Pause ignored");
                return;
            }
            st.sampler.stop();
            st.session.state = PlaybackState::Paused;
            st.ticket
        };

        if let Err(e) = self.output.pause().await {
            self.fail(ticket, PlaybackError::Output(e.to_string()));
            return;
        }

        let position = self.output.position().await.ok();

        let event = {
            let mut st = self.state.lock();
            if !st.is_current(ticket) || st.session.state != PlaybackState::Paused {
                return;
            }
            if let Some(position) = position {
                st.session.position_seconds =
                    clamp_position(position.as_secs_f64(), st.session.duration_seconds);
            }
            PlaybackEvent::Paused {
                track_id: st.track_id().unwrap_or_default(),
                position_ms: to_millis(st.session.position_seconds),
            }
        };

        self.emit(event);
    }

    fn on_ended(&self, ticket: LoadTicket) {
        let track_id = {
            let mut st = self.state.lock();
            if !st.is_current(ticket) || st.session.state != PlaybackState::Playing {
                debug!(%ticket, "Ignoring end-of-media callback");
                return;
            }
            st.sampler.stop();
            st.session.state = PlaybackState::Ended;
            st.session.position_seconds = 0.0;
            st.track_id().unwrap_or_default()
        };

        info!(%track_id, "Preview ended");
        self.emit(PlaybackEvent::Completed { track_id });
        self.event_bus.notify(notices::preview_ended());
    }

    async fn seek(&self, seconds: f64) {
        let (ticket, target, track_id, duration) = {
            let mut st = self.state.lock();
            if !st.session.state.is_seekable() {
                debug!(state = %st.session.state, "Seek ignored");
                return;
            }
            let duration = st.session.duration_seconds;
            let target = clamp_position(seconds, duration);
            st.session.position_seconds = target;
            (st.ticket, target, st.track_id().unwrap_or_default(), duration)
        };

        if let Err(e) = self.output.seek(Duration::from_secs_f64(target)).await {
            self.fail(ticket, PlaybackError::Output(e.to_string()));
            return;
        }

        self.emit(PlaybackEvent::PositionChanged {
            track_id,
            position_ms: to_millis(target),
            duration_ms: to_millis(duration),
        });
    }

    async fn set_volume(&self, percent: i32) {
        let percent = percent.clamp(0, 100) as u8;
        let changed = {
            let mut st = self.state.lock();
            let changed = st.session.volume_percent != percent;
            st.session.volume_percent = percent;
            changed
        };

        if let Err(e) = self.output.set_volume(f32::from(percent) / 100.0).await {
            warn!(error = %e, "Failed to apply volume");
        }

        if changed {
            self.emit(PlaybackEvent::VolumeChanged { percent });
        }
    }

    fn fail(&self, ticket: LoadTicket, error: PlaybackError) {
        self.fail_when(ticket, error, |_| true)
    }

    fn fail_when<F>(&self, ticket: LoadTicket, error: PlaybackError, applies: F)
    where
        F: FnOnce(PlaybackState) -> bool,
    {
        let track_id = {
            let mut st = self.state.lock();
            if !st.is_current(ticket) || !applies(st.session.state) {
                debug!(%ticket, "Ignoring stale failure");
                return;
            }
            st.stop_tasks();
            st.play_when_ready = false;
            st.session.state = PlaybackState::Error;
            st.session.last_error = Some(error.clone());
            st.track_id()
        };

        warn!(error = %error, track_id = ?track_id, "Playback failed");
        self.emit(PlaybackEvent::Error {
            track_id,
            message: error.to_string(),
            recoverable: error.is_transient(),
        });
        self.event_bus.notify(notices::playback_error());
    }

    async fn shutdown(&self) {
        {
            let mut st = self.state.lock();
            st.ticket = st.ticket.next();
            st.stop_tasks();
            st.play_when_ready = false;
            let volume = st.session.volume_percent;
            st.session = PlaybackSession::new(volume);
        }

        let _lifecycle = self.lifecycle.lock().await;
        if let Err(e) = self.output.pause().await {
            debug!(error = %e, "Pause during shutdown failed");
        }
        if let Err(e) = self.output.detach().await {
            warn!(error = %e, "Failed to release audio output");
        }
        info!("Playback controller shut down");
    }

    fn is_current(&self, ticket: LoadTicket) -> bool {
        self.state.lock().is_current(ticket)
    }

    fn emit(&self, event: PlaybackEvent) {
        let _ = self.event_bus.emit(CoreEvent::Playback(event));
    }
}

/// Clamp a requested position into `[0, duration]`; non-finite input maps to 0.
fn clamp_position(seconds: f64, duration: f64) -> f64 {
    if !seconds.is_finite() {
        return 0.0;
    }
    seconds.clamp(0.0, duration.max(0.0))
}

fn to_millis(seconds: f64) -> u64 {
    (seconds * 1000.0).round() as u64
}

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::playback::{AudioOutput, AudioSource, LoadTicket};
use bridge_traits::{ManualClock, MemorySettingsStore, SettingsStore};
use bytes::Bytes;
use core_runtime::config::SpotifyConfig;
use core_runtime::events::{AuthEvent, CoreEvent};
use core_runtime::RaagyaConfig;
use core_service::{ChatOutcome, RaagyaCore, Theme};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const TOKEN_ENDPOINT: &str = "https://proxy.test/get-spotify-token";

#[derive(Default)]
struct FakeBackend {
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeBackend {
    fn count(&self, prefix: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.url.starts_with(prefix))
            .count()
    }
}

fn json(status: u16, body: serde_json::Value) -> HttpResponse {
    HttpResponse {
        status,
        headers: HashMap::new(),
        body: Bytes::from(body.to_string()),
    }
}

#[async_trait]
impl HttpClient for FakeBackend {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let url = request.url.clone();
        let method = request.method;
        self.requests.lock().push(request);

        if url == TOKEN_ENDPOINT && method == HttpMethod::Post {
            return Ok(json(
                200,
                serde_json::json!({ "access_token": "proxy-token", "expires_in": 3600 }),
            ));
        }
        if url.starts_with("https://api.spotify.com/v1/search") {
            return Ok(json(
                200,
                serde_json::json!({
                    "tracks": { "items": [
                        {
                            "id": "4u7EnebtmKWzUH433cf5Qv",
                            "name": "Bohemian Rhapsody",
                            "artists": [{ "name": "Queen" }],
                            "album": { "images": [{ "url": "https://i.scdn.co/image/q" }] },
                            "preview_url": "https://p.scdn.co/mp3-preview/q",
                            "uri": "spotify:track:4u7EnebtmKWzUH433cf5Qv",
                            "duration_ms": 354320
                        }
                    ]}
                }),
            ));
        }
        Ok(json(404, serde_json::json!({ "error": { "status": 404, "message": "not found" } })))
    }
}

struct SilentOutput;

#[async_trait]
impl AudioOutput for SilentOutput {
    async fn attach(&self, _ticket: LoadTicket, _source: AudioSource) -> BridgeResult<()> {
        Ok(())
    }
    async fn detach(&self) -> BridgeResult<()> {
        Ok(())
    }
    async fn play(&self) -> BridgeResult<()> {
        Ok(())
    }
    async fn pause(&self) -> BridgeResult<()> {
        Ok(())
    }
    async fn seek(&self, _position: Duration) -> BridgeResult<()> {
        Ok(())
    }
    async fn set_volume(&self, _volume: f32) -> BridgeResult<()> {
        Ok(())
    }
    async fn position(&self) -> BridgeResult<Duration> {
        Ok(Duration::ZERO)
    }
}

fn core() -> (RaagyaCore, Arc<FakeBackend>, Arc<MemorySettingsStore>) {
    let backend = Arc::new(FakeBackend::default());
    let store = Arc::new(MemorySettingsStore::new());
    let config = RaagyaConfig::builder()
        .http_client(backend.clone())
        .settings_store(store.clone())
        .clock(Arc::new(ManualClock::at_millis(1_700_000_000_000)))
        .token_endpoint(TOKEN_ENDPOINT)
        .spotify(
            SpotifyConfig::new()
                .with_client_id("raagya-client")
                .with_redirect_uri("http://localhost:5173/callback"),
        )
        .build()
        .unwrap();
    (RaagyaCore::new(config).unwrap(), backend, store)
}

#[tokio::test]
async fn test_chat_searches_with_cached_token() {
    let (core, backend, store) = core();
    let mut events = core.subscribe();
    let chat = core.chat();

    let outcome = chat.handle_utterance("queen").await.unwrap();
    let ChatOutcome::Suggestions(tracks) = outcome else {
        panic!("expected suggestions");
    };
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].artist, "Queen");

    chat.handle_utterance("queen again").await.unwrap();

    assert_eq!(backend.count(TOKEN_ENDPOINT), 1);
    assert_eq!(backend.count("https://api.spotify.com/v1/search"), 2);
    assert_eq!(
        store.get_string("spotify_token").await.unwrap().as_deref(),
        Some("proxy-token")
    );

    let acquired = events
        .drain()
        .into_iter()
        .filter(|e| matches!(e, CoreEvent::Auth(AuthEvent::TokenAcquired { .. })))
        .count();
    assert_eq!(acquired, 1);
}

#[tokio::test]
async fn test_search_result_plays_through_controller() {
    let (core, _, _) = core();
    let session = core.search_session();
    session.search("bohemian").await;
    let track = session.results().remove(0);

    let controller = core.playback_controller(Arc::new(SilentOutput));
    let ticket = controller.load_track(track).await;
    controller
        .on_metadata_loaded(ticket, Duration::from_secs(30))
        .await;
    controller.play().await;
    assert!(controller.session().is_playing());
    assert_eq!(controller.session().volume_percent, 80);
    controller.shutdown().await;
}

#[tokio::test]
async fn test_authorize_url_and_preferences() {
    let (core, _, _) = core();

    let url = core.authorize_url().unwrap();
    assert!(url.starts_with("https://accounts.spotify.com/authorize?"));
    assert!(url.contains("client_id=raagya-client"));
    assert!(url.contains("response_type=code"));

    let prefs = core.preferences();
    prefs.set_theme(Theme::Sunny).await.unwrap();
    assert_eq!(core.preferences().theme().await, Theme::Sunny);

    assert!(!core.is_connected().await);
}

#[tokio::test]
async fn test_story_uses_track_details() {
    let (core, _, _) = core();
    let session = core.search_session();
    session.search("queen").await;
    let track = session.results().remove(0);

    let story = core.story_for(&track);
    assert_eq!(story.track_id, track.id);
    assert!(story.body.contains("Bohemian Rhapsody"));
}

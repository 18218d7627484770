use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use token_proxy::{serve, AppState, ProxyConfig};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Stand-in for the catalog's token endpoint.
struct FakeUpstream {
    status: u16,
    body: Value,
    unreachable: bool,
    seen: Mutex<Vec<HttpRequest>>,
}

impl FakeUpstream {
    fn ok() -> Arc<Self> {
        Arc::new(Self {
            status: 200,
            body: json!({ "access_token": "BQD-upstream", "token_type": "Bearer", "expires_in": 3600 }),
            unreachable: false,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn failing(status: u16, body: Value) -> Arc<Self> {
        Arc::new(Self {
            status,
            body,
            unreachable: false,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            status: 0,
            body: Value::Null,
            unreachable: true,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn last_form(&self) -> String {
        let seen = self.seen.lock();
        let request = seen.last().expect("no upstream request");
        String::from_utf8(request.body.clone().unwrap_or_default().to_vec()).unwrap()
    }
}

#[async_trait]
impl HttpClient for FakeUpstream {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        self.seen.lock().push(request);
        if self.unreachable {
            return Err(BridgeError::OperationFailed("connection refused".into()));
        }
        Ok(HttpResponse {
            status: self.status,
            headers: HashMap::new(),
            body: Bytes::from(self.body.to_string()),
        })
    }
}

struct Running {
    base: String,
    _stop: oneshot::Sender<()>,
}

async fn start(config: ProxyConfig, upstream: Arc<FakeUpstream>) -> Running {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let (stop, stopped) = oneshot::channel::<()>();
    tokio::spawn(serve(listener, AppState::new(config, upstream), async move {
        let _ = stopped.await;
    }));
    Running { base, _stop: stop }
}

fn configured() -> ProxyConfig {
    ProxyConfig::default()
        .with_credentials("client-id", "client-secret")
        .with_token_url("https://accounts.test/api/token")
}

#[tokio::test]
async fn test_client_credentials_exchange() {
    let upstream = FakeUpstream::ok();
    let proxy = start(configured(), upstream.clone()).await;

    let response = reqwest::Client::new()
        .post(format!("{}/get-spotify-token", proxy.base))
        .header("Origin", "https://raagya.app")
        .json(&json!({}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["access_token"], "BQD-upstream");

    assert_eq!(upstream.last_form(), "grant_type=client_credentials");
    let seen = upstream.seen.lock();
    assert_eq!(seen[0].url, "https://accounts.test/api/token");
    assert_eq!(
        seen[0].headers.get("Authorization").map(String::as_str),
        Some("Basic Y2xpZW50LWlkOmNsaWVudC1zZWNyZXQ=")
    );
}

#[tokio::test]
async fn test_auth_code_redirect_follows_origin() {
    let upstream = FakeUpstream::ok();
    let proxy = start(configured(), upstream.clone()).await;

    let response = reqwest::Client::new()
        .post(&proxy.base)
        .header("Origin", "https://raagya.app")
        .json(&json!({ "authCode": "AQB-code" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    assert_eq!(
        upstream.last_form(),
        "grant_type=authorization_code&code=AQB-code&redirect_uri=https%3A%2F%2Fraagya.app%2Fcallback"
    );
}

#[tokio::test]
async fn test_refresh_token_exchange() {
    let upstream = FakeUpstream::ok();
    let proxy = start(configured(), upstream.clone()).await;

    let response = reqwest::Client::new()
        .post(&proxy.base)
        .json(&json!({ "refreshToken": "AQC-refresh" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        upstream.last_form(),
        "grant_type=refresh_token&refresh_token=AQC-refresh"
    );
}

#[tokio::test]
async fn test_upstream_error_passes_through() {
    let upstream = FakeUpstream::failing(
        400,
        json!({ "error": "invalid_grant", "error_description": "Invalid authorization code" }),
    );
    let proxy = start(configured(), upstream).await;

    let response = reqwest::Client::new()
        .post(&proxy.base)
        .json(&json!({ "authCode": "stale" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "invalid_grant");
    assert_eq!(body["details"]["error_description"], "Invalid authorization code");
}

#[tokio::test]
async fn test_missing_credentials_is_server_error() {
    let upstream = FakeUpstream::ok();
    let proxy = start(ProxyConfig::default(), upstream.clone()).await;

    let response = reqwest::Client::new()
        .post(&proxy.base)
        .body("")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Server configuration error" }));
    assert!(upstream.seen.lock().is_empty());
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let proxy = start(configured(), FakeUpstream::ok()).await;

    let response = reqwest::Client::new()
        .post(&proxy.base)
        .header("Content-Type", "application/json")
        .body("{authCode:")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let proxy = start(configured(), FakeUpstream::unreachable()).await;

    let response = reqwest::Client::new()
        .post(&proxy.base)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 502);
}

#[tokio::test]
async fn test_preflight_allows_gateway_headers() {
    let proxy = start(configured(), FakeUpstream::ok()).await;

    let response = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, &proxy.base)
        .header("Origin", "https://raagya.app")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "apikey, content-type")
        .send()
        .await
        .unwrap();

    assert!(response.status().is_success());
    let headers = response.headers();
    assert_eq!(
        headers
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
    let allowed = headers
        .get("access-control-allow-headers")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();
    for header in ["authorization", "x-client-info", "apikey", "content-type"] {
        assert!(allowed.contains(header), "missing {} in {}", header, allowed);
    }
}

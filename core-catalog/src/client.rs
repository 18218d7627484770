//! Spotify Web API catalog client
//!
//! Read-only track search, single-track lookup and recommendations. Every
//! request carries a bearer token obtained from an [`AccessTokenSource`] and
//! the configured market hint.

use async_trait::async_trait;
use bridge_traits::error::BridgeError;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use core_auth::AccessTokenSource;
use core_runtime::config::{RaagyaConfig, DEFAULT_MARKET, DEFAULT_REQUEST_TIMEOUT, MAX_CATALOG_LIMIT};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SearchError};
use crate::mapping::{map_track, map_tracks};
use crate::types::{
    ApiErrorResponse, RawTrack, RecommendationSeeds, RecommendationsResponse, SearchResponse,
    Track,
};

/// Spotify Web API base URL
const DEFAULT_API_BASE: &str = core_runtime::config::DEFAULT_CATALOG_API_BASE;

/// Anything that can answer a free-text track query.
#[async_trait]
pub trait TrackSearch: Send + Sync {
    /// At most `limit` tracks; `limit == 0` yields none.
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<Track>>;
}

/// Catalog client over the host HTTP bridge.
///
/// No automatic retry is performed; failures are returned to the caller.
///
/// # Example
///
/// ```ignore
/// use core_catalog::CatalogSearchClient;
///
/// let client = CatalogSearchClient::new(http_client, token_manager);
/// let tracks = client.search("lofi beats", 5).await?;
/// ```
pub struct CatalogSearchClient {
    http_client: Arc<dyn HttpClient>,
    tokens: Arc<dyn AccessTokenSource>,
    api_base: String,
    market: String,
    timeout: Duration,
}

impl CatalogSearchClient {
    pub fn new(http_client: Arc<dyn HttpClient>, tokens: Arc<dyn AccessTokenSource>) -> Self {
        Self {
            http_client,
            tokens,
            api_base: DEFAULT_API_BASE.to_string(),
            market: DEFAULT_MARKET.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn from_config(config: &RaagyaConfig, tokens: Arc<dyn AccessTokenSource>) -> Self {
        Self::new(config.http_client.clone(), tokens)
            .with_api_base(config.spotify.api_base.clone())
            .with_market(config.spotify.market.clone())
            .with_timeout(config.request_timeout)
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_market(mut self, market: impl Into<String>) -> Self {
        self.market = market.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Search tracks by free text.
    ///
    /// A blank query or a zero `limit` returns an empty list without
    /// touching the network. Larger limits are capped at 50; results keep
    /// the catalog's relevance order.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, limit: u32) -> Result<Vec<Track>> {
        let query = query.trim();
        if query.is_empty() || limit == 0 {
            debug!("Blank query or zero limit, skipping catalog request");
            return Ok(Vec::new());
        }

        let limit = clamp_limit(limit);
        let url = format!(
            "{}/search?q={}&type=track&limit={}&market={}",
            self.api_base,
            urlencoding::encode(query),
            limit,
            urlencoding::encode(&self.market)
        );

        let response: SearchResponse = self.get_json(url).await?;
        let items = response.tracks.map(|page| page.items).unwrap_or_default();

        let mut tracks = map_tracks(items);
        tracks.truncate(limit as usize);

        info!(count = tracks.len(), "Catalog search completed");
        Ok(tracks)
    }

    /// Look up a single track. An unknown id yields `Ok(None)`.
    #[instrument(skip(self))]
    pub async fn get_track(&self, track_id: &str) -> Result<Option<Track>> {
        let track_id = track_id.trim();
        if track_id.is_empty() {
            return Err(SearchError::InvalidRequest("track id is empty".to_string()));
        }

        let url = format!(
            "{}/tracks/{}?market={}",
            self.api_base,
            urlencoding::encode(track_id),
            urlencoding::encode(&self.market)
        );

        match self.get_json::<RawTrack>(url).await {
            Ok(raw) => Ok(map_track(raw)),
            Err(SearchError::Api { status: 404, .. }) => {
                debug!("Track not found");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Tracks similar to the given seeds.
    #[instrument(skip(self, seeds), fields(seeds = seeds.len()))]
    pub async fn recommendations(
        &self,
        seeds: &RecommendationSeeds,
        limit: u32,
    ) -> Result<Vec<Track>> {
        if seeds.is_empty() || seeds.len() > RecommendationSeeds::MAX_SEEDS {
            return Err(SearchError::InvalidRequest(format!(
                "between 1 and {} seeds are required, got {}",
                RecommendationSeeds::MAX_SEEDS,
                seeds.len()
            )));
        }
        if limit == 0 {
            return Ok(Vec::new());
        }

        let limit = clamp_limit(limit);
        let mut url = format!(
            "{}/recommendations?limit={}&market={}",
            self.api_base,
            limit,
            urlencoding::encode(&self.market)
        );
        for (name, values) in [
            ("seed_tracks", &seeds.tracks),
            ("seed_artists", &seeds.artists),
            ("seed_genres", &seeds.genres),
        ] {
            if !values.is_empty() {
                url.push_str(&format!(
                    "&{}={}",
                    name,
                    urlencoding::encode(&values.join(","))
                ));
            }
        }

        let response: RecommendationsResponse = self.get_json(url).await?;
        let mut tracks = map_tracks(response.tracks);
        tracks.truncate(limit as usize);

        info!(count = tracks.len(), "Recommendations fetched");
        Ok(tracks)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T> {
        let response = self.execute_get(url).await?;
        serde_json::from_slice(&response.body)
            .map_err(|e| SearchError::Parse(format!("Failed to parse catalog response: {}", e)))
    }

    async fn execute_get(&self, url: String) -> Result<HttpResponse> {
        let token = self.tokens.access_token().await?;

        let request = HttpRequest::get(url)
            .bearer_token(&token)
            .header("Accept", "application/json")
            .timeout(self.timeout);

        let response = tokio::time::timeout(self.timeout, self.http_client.execute(request))
            .await
            .map_err(|_| SearchError::Timeout {
                seconds: self.timeout.as_secs(),
            })?
            .map_err(|e| match e {
                BridgeError::Timeout(_) => SearchError::Timeout {
                    seconds: self.timeout.as_secs(),
                },
                other => SearchError::Network(other.to_string()),
            })?;

        if response.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<ApiErrorResponse>()
            .ok()
            .and_then(|body| body.error)
            .and_then(|detail| detail.message)
            .unwrap_or_else(|| response.text_lossy());

        warn!(status = response.status, error = %message, "Catalog request failed");
        Err(SearchError::Api {
            status: response.status,
            message,
        })
    }
}

#[async_trait]
impl TrackSearch for CatalogSearchClient {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<Track>> {
        CatalogSearchClient::search(self, query, limit).await
    }
}

impl std::fmt::Debug for CatalogSearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogSearchClient")
            .field("api_base", &self.api_base)
            .field("market", &self.market)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn clamp_limit(limit: u32) -> u32 {
    limit.clamp(1, MAX_CATALOG_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::HttpMethod;
    use bytes::Bytes;
    use core_auth::TokenError;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        Http {}

        #[async_trait]
        impl HttpClient for Http {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    struct StaticToken(std::result::Result<&'static str, TokenError>);

    #[async_trait]
    impl AccessTokenSource for StaticToken {
        async fn access_token(&self) -> core_auth::Result<String> {
            self.0.clone().map(String::from)
        }
    }

    fn ok_token() -> Arc<dyn AccessTokenSource> {
        Arc::new(StaticToken(Ok("bearer-123")))
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn raw_item(id: &str, preview: Option<&str>) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "name": format!("Song {}", id),
            "artists": [{ "id": "a1", "name": "Anuv Jain" }],
            "album": { "images": [{ "url": "https://i.scdn.co/image/x" }] },
            "preview_url": preview,
            "uri": format!("spotify:track:{}", id),
            "duration_ms": 180000
        })
    }

    fn search_body(items: Vec<serde_json::Value>) -> String {
        serde_json::json!({ "tracks": { "items": items, "total": 100 } }).to_string()
    }

    #[tokio::test]
    async fn test_blank_query_makes_no_request() {
        let mut http = MockHttp::new();
        http.expect_execute().never();

        let client = CatalogSearchClient::new(Arc::new(http), ok_token());
        assert!(client.search("   ", 5).await.unwrap().is_empty());
        assert!(client.search("lofi", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_builds_request_and_maps_in_order() {
        let body = search_body(vec![
            raw_item("t3", Some("https://p.scdn.co/3")),
            serde_json::Value::Null,
            raw_item("t1", None),
        ]);

        let mut http = MockHttp::new();
        http.expect_execute()
            .withf(|req| {
                req.method == HttpMethod::Get
                    && req.url
                        == "https://api.spotify.com/v1/search?q=lofi%20beats&type=track&limit=5&market=IN"
                    && req.headers.get("Authorization").map(String::as_str)
                        == Some("Bearer bearer-123")
                    && req.timeout.is_some()
            })
            .times(1)
            .returning(move |_| Ok(response(200, &body)));

        let client = CatalogSearchClient::new(Arc::new(http), ok_token());
        let tracks = client.search("lofi beats", 5).await.unwrap();

        let ids: Vec<_> = tracks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t3", "t1"]);
        assert!(tracks[0].has_preview());
        assert!(!tracks[1].has_preview());
        assert!(tracks.iter().all(|t| !t.title.is_empty() && !t.artist.is_empty()));
    }

    #[tokio::test]
    async fn test_limit_is_clamped_and_results_truncated() {
        let items: Vec<_> = (0..8).map(|i| raw_item(&format!("t{}", i), None)).collect();
        let body = search_body(items);

        let mut http = MockHttp::new();
        http.expect_execute()
            .withf(|req| req.url.contains("limit=50"))
            .times(1)
            .returning(move |_| Ok(response(200, &body)));

        let client = CatalogSearchClient::new(Arc::new(http), ok_token());
        assert_eq!(client.search("x", 500).await.unwrap().len(), 8);

        let body = search_body((0..8).map(|i| raw_item(&format!("t{}", i), None)).collect());
        let mut http = MockHttp::new();
        http.expect_execute()
            .withf(|req| req.url.contains("limit=1&"))
            .times(1)
            .returning(move |_| Ok(response(200, &body)));

        let client = CatalogSearchClient::new(Arc::new(http), ok_token());
        assert_eq!(client.search("x", 0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_tracks_object_is_empty() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .returning(|_| Ok(response(200, "{}")));

        let client = CatalogSearchClient::new(Arc::new(http), ok_token());
        assert!(client.search("nothing", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_api_error_carries_status_and_message() {
        let mut http = MockHttp::new();
        http.expect_execute().returning(|_| {
            Ok(response(
                401,
                r#"{"error":{"status":401,"message":"The access token expired"}}"#,
            ))
        });

        let client = CatalogSearchClient::new(Arc::new(http), ok_token());
        let err = client.search("x", 5).await.unwrap_err();
        assert_eq!(
            err,
            SearchError::Api {
                status: 401,
                message: "The access token expired".into()
            }
        );
    }

    #[tokio::test]
    async fn test_token_failure_short_circuits() {
        let mut http = MockHttp::new();
        http.expect_execute().never();

        let tokens: Arc<dyn AccessTokenSource> =
            Arc::new(StaticToken(Err(TokenError::Network("offline".into()))));
        let client = CatalogSearchClient::new(Arc::new(http), tokens);
        assert!(matches!(
            client.search("x", 5).await,
            Err(SearchError::Token(_))
        ));
    }

    #[tokio::test]
    async fn test_transport_and_parse_failures() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .returning(|_| Err(BridgeError::OperationFailed("Connection failed".into())));
        let client = CatalogSearchClient::new(Arc::new(http), ok_token());
        assert!(matches!(
            client.search("x", 5).await,
            Err(SearchError::Network(_))
        ));

        let mut http = MockHttp::new();
        http.expect_execute()
            .returning(|_| Ok(response(200, "not json")));
        let client = CatalogSearchClient::new(Arc::new(http), ok_token());
        assert!(matches!(
            client.search("x", 5).await,
            Err(SearchError::Parse(_))
        ));
    }

    struct HangingHttp;

    #[async_trait]
    impl HttpClient for HangingHttp {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(response(200, "{}"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_is_bounded_by_timeout() {
        let client = CatalogSearchClient::new(Arc::new(HangingHttp), ok_token())
            .with_timeout(Duration::from_secs(2));
        assert_eq!(
            client.search("x", 5).await.unwrap_err(),
            SearchError::Timeout { seconds: 2 }
        );
    }

    #[tokio::test]
    async fn test_get_track_found_and_missing() {
        let body = raw_item("t9", Some("https://p.scdn.co/9")).to_string();
        let mut http = MockHttp::new();
        http.expect_execute()
            .withf(|req| req.url == "https://api.spotify.com/v1/tracks/t9?market=IN")
            .times(1)
            .returning(move |_| Ok(response(200, &body)));
        let client = CatalogSearchClient::new(Arc::new(http), ok_token());
        let track = client.get_track("t9").await.unwrap().unwrap();
        assert_eq!(track.id, "t9");

        let mut http = MockHttp::new();
        http.expect_execute().returning(|_| {
            Ok(response(
                404,
                r#"{"error":{"status":404,"message":"Non existing id"}}"#,
            ))
        });
        let client = CatalogSearchClient::new(Arc::new(http), ok_token());
        assert_eq!(client.get_track("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_recommendations_seed_validation_and_query() {
        let mut http = MockHttp::new();
        http.expect_execute().never();
        let client = CatalogSearchClient::new(Arc::new(http), ok_token());
        assert!(matches!(
            client.recommendations(&RecommendationSeeds::new(), 10).await,
            Err(SearchError::InvalidRequest(_))
        ));

        let body = serde_json::json!({ "tracks": [raw_item("r1", None)] }).to_string();
        let mut http = MockHttp::new();
        http.expect_execute()
            .withf(|req| {
                req.url.starts_with("https://api.spotify.com/v1/recommendations?limit=10&market=IN")
                    && req.url.contains("&seed_tracks=t1%2Ct2")
                    && req.url.contains("&seed_genres=bollywood")
                    && !req.url.contains("seed_artists")
            })
            .times(1)
            .returning(move |_| Ok(response(200, &body)));

        let client = CatalogSearchClient::new(Arc::new(http), ok_token());
        let seeds = RecommendationSeeds::new()
            .with_track("t1")
            .with_track("t2")
            .with_genre("bollywood");
        let tracks = client.recommendations(&seeds, 10).await.unwrap();
        assert_eq!(tracks.len(), 1);
    }

    #[tokio::test]
    async fn test_track_search_trait_object() {
        let mut http = MockHttp::new();
        http.expect_execute().never();
        let search: Arc<dyn TrackSearch> =
            Arc::new(CatalogSearchClient::new(Arc::new(http), ok_token()));
        assert!(search.search("", 5).await.unwrap().is_empty());
    }
}

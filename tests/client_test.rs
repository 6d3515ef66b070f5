use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use plarchive::{
    archive::CollectionReader,
    error::ApiError,
    management::TokenManager,
    spotify::{PlaylistApi, RetryPolicy, SpotifyClient},
    types::CreatePlaylistRequest,
};
use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, Request, Respond, ResponseTemplate,
    matchers::{body_json, body_partial_json, header, method, path},
};

const PLAYLIST: &str = "3cEYpjA9oz9GiPac4AsH4n";

fn client(server: &MockServer) -> SpotifyClient {
    SpotifyClient::with_base_url(server.uri(), TokenManager::with_static_token("test-token"))
        .with_retry_policy(RetryPolicy {
            max_retries: 3,
            max_retry_after: 5,
            server_error_backoff: Duration::ZERO,
        })
}

fn track(uri: &str) -> Value {
    json!({
        "added_at": "2025-01-01T00:00:00Z",
        "track": {
            "id": uri.rsplit(':').next(),
            "name": format!("Track {uri}"),
            "artists": [{ "name": "Artist" }],
            "uri": uri,
            "is_local": false
        }
    })
}

fn spotify_error(status: u16, message: &str) -> Value {
    json!({ "error": { "status": status, "message": message } })
}

/// Serves a playlist's tracks in pages, linking them through absolute `next` URLs.
struct PaginatedTracks {
    base_uri: String,
    pages: Vec<Vec<Value>>,
}

impl Respond for PaginatedTracks {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let page: usize = request
            .url
            .query_pairs()
            .find(|(k, _)| k == "page")
            .and_then(|(_, v)| v.parse().ok())
            .unwrap_or(0);

        let next = (page + 1 < self.pages.len()).then(|| {
            format!(
                "{}/playlists/{PLAYLIST}/tracks?page={}&limit=100",
                self.base_uri,
                page + 1
            )
        });

        ResponseTemplate::new(200).set_body_json(json!({
            "items": self.pages[page],
            "next": next,
        }))
    }
}

/// Fails with `first` for the first `failures` requests, then succeeds.
struct FailThenSucceed {
    count: Arc<AtomicU32>,
    failures: u32,
    first: ResponseTemplate,
    success_body: Value,
}

impl Respond for FailThenSucceed {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.count.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            self.first.clone()
        } else {
            ResponseTemplate::new(200).set_body_json(self.success_body.clone())
        }
    }
}

#[tokio::test]
async fn test_current_user_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "listener",
            "display_name": "Listener"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let user_id = client(&server).current_user_id().await.unwrap();
    assert_eq!(user_id, "listener");
}

#[tokio::test]
async fn test_reader_follows_next_links() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/playlists/{PLAYLIST}/tracks")))
        .respond_with(PaginatedTracks {
            base_uri: server.uri(),
            pages: vec![
                vec![track("spotify:track:a"), track("spotify:track:b")],
                vec![
                    json!({ "added_at": null, "track": null }),
                    json!({
                        "track": { "id": null, "name": "demo", "uri": "spotify:local:demo", "is_local": true }
                    }),
                    track("spotify:track:c"),
                ],
            ],
        })
        .expect(2)
        .mount(&server)
        .await;

    let reader = CollectionReader::new(Arc::new(client(&server)));
    let items = reader.read_all_items(PLAYLIST).await.unwrap();

    let uris: Vec<&str> = items.iter().map(|i| i.uri.as_str()).collect();
    assert_eq!(uris, vec!["spotify:track:a", "spotify:track:b", "spotify:track:c"]);
    assert_eq!(items[0].artist_names, vec!["Artist"]);
}

#[tokio::test]
async fn test_not_found_maps_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/playlists/{PLAYLIST}")))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(spotify_error(404, "Resource not found")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server).playlist(PLAYLIST).await.unwrap_err();

    assert!(err.is_not_found());
    assert!(err.to_string().contains("Resource not found"));
}

#[tokio::test]
async fn test_unauthorized_maps_to_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(spotify_error(401, "The access token expired")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server).current_user_id().await.unwrap_err();

    assert!(err.is_auth());
    assert!(!err.is_not_found());
}

#[tokio::test]
async fn test_rate_limit_is_retried_after_delay() {
    let server = MockServer::start().await;
    let count = Arc::new(AtomicU32::new(0));
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(FailThenSucceed {
            count: Arc::clone(&count),
            failures: 1,
            first: ResponseTemplate::new(429).insert_header("Retry-After", "0"),
            success_body: json!({ "id": "listener" }),
        })
        .mount(&server)
        .await;

    let user_id = client(&server).current_user_id().await.unwrap();

    assert_eq!(user_id, "listener");
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_rate_limit_above_ceiling_is_not_waited_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "600"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server).current_user_id().await.unwrap_err();

    assert!(matches!(err, ApiError::RateLimited { retry_after: 600 }));
}

#[tokio::test]
async fn test_gateway_error_is_retried() {
    let server = MockServer::start().await;
    let count = Arc::new(AtomicU32::new(0));
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(FailThenSucceed {
            count: Arc::clone(&count),
            failures: 2,
            first: ResponseTemplate::new(502),
            success_body: json!({ "id": "listener" }),
        })
        .mount(&server)
        .await;

    assert_eq!(client(&server).current_user_id().await.unwrap(), "listener");
    assert_eq!(count.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_gateway_error_gives_up_after_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&server)
        .await;

    let err = client(&server).current_user_id().await.unwrap_err();

    assert!(matches!(err, ApiError::Status { status: 503, .. }));
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/playlists/{PLAYLIST}")))
        .respond_with(ResponseTemplate::new(500).set_body_json(spotify_error(500, "Server error")))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server).playlist(PLAYLIST).await.unwrap_err();

    match err {
        ApiError::Status { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "Server error");
        }
        other => panic!("expected Status, got {other:?}"),
    }
}

#[tokio::test]
async fn test_create_playlist_is_private() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/listener/playlists"))
        .and(body_partial_json(json!({
            "name": "Weekly (Cumulative)",
            "public": false
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "archive-id",
            "name": "Weekly (Cumulative)"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = CreatePlaylistRequest {
        name: "Weekly (Cumulative)".into(),
        description: "Cumulative archive".into(),
        public: false,
        collaborative: false,
    };
    let created = client(&server)
        .create_playlist("listener", &request)
        .await
        .unwrap();

    assert_eq!(created.id, "archive-id");
}

#[tokio::test]
async fn test_add_items_posts_uris() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/playlists/archive-id/tracks"))
        .and(body_json(json!({ "uris": ["spotify:track:a", "spotify:track:b"] })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "snapshot_id": "snap" })))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .add_items(
            "archive-id",
            &["spotify:track:a".to_string(), "spotify:track:b".to_string()],
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_add_items_rejects_oversized_batch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "snapshot_id": "snap" })))
        .expect(0)
        .mount(&server)
        .await;

    let uris: Vec<String> = (0..101).map(|i| format!("spotify:track:{i}")).collect();
    let err = client(&server).add_items("archive-id", &uris).await.unwrap_err();

    assert!(matches!(err, ApiError::InvalidRequest(_)));
}

fn weekly_archive_request() -> CreatePlaylistRequest {
    CreatePlaylistRequest {
        name: "Weekly (Cumulative)".into(),
        description: "Cumulative archive".into(),
        public: false,
        collaborative: false,
    }
}

#[tokio::test]
async fn test_create_playlist_is_not_resent_after_gateway_timeout() {
    let server = MockServer::start().await;
    let count = Arc::new(AtomicU32::new(0));
    Mock::given(method("POST"))
        .and(path("/users/listener/playlists"))
        .respond_with(FailThenSucceed {
            count: Arc::clone(&count),
            failures: 1,
            first: ResponseTemplate::new(504),
            success_body: json!({ "id": "second-archive", "name": "Weekly (Cumulative)" }),
        })
        .mount(&server)
        .await;

    let err = client(&server)
        .create_playlist("listener", &weekly_archive_request())
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Status { status: 504, .. }));
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_add_items_is_not_resent_after_bad_gateway() {
    let server = MockServer::start().await;
    let count = Arc::new(AtomicU32::new(0));
    Mock::given(method("POST"))
        .and(path("/playlists/archive-id/tracks"))
        .respond_with(FailThenSucceed {
            count: Arc::clone(&count),
            failures: 1,
            first: ResponseTemplate::new(502),
            success_body: json!({ "snapshot_id": "snap" }),
        })
        .mount(&server)
        .await;

    let err = client(&server)
        .add_items("archive-id", &["spotify:track:a".to_string()])
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Status { status: 502, .. }));
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_rate_limited_create_playlist_is_retried() {
    let server = MockServer::start().await;
    let count = Arc::new(AtomicU32::new(0));
    Mock::given(method("POST"))
        .and(path("/users/listener/playlists"))
        .respond_with(FailThenSucceed {
            count: Arc::clone(&count),
            failures: 1,
            first: ResponseTemplate::new(429).insert_header("Retry-After", "0"),
            success_body: json!({ "id": "archive-id", "name": "Weekly (Cumulative)" }),
        })
        .mount(&server)
        .await;

    let created = client(&server)
        .create_playlist("listener", &weekly_archive_request())
        .await
        .unwrap();

    assert_eq!(created.id, "archive-id");
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

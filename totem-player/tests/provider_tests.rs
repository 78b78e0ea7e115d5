//! BackendClient against a mock signage backend
//!
//! Covers:
//! - Playlist fetch with bearer auth
//! - Error status mapping (404, 5xx with JSON and text bodies)
//! - Transport failures and malformed bodies
//! - Device heartbeat

use serde_json::json;
use std::time::Duration;
use totem_common::{MediaKind, PlayerState};
use totem_player::provider::Heartbeat;
use totem_player::{BackendClient, LoadError, PlaylistProvider};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, token: Option<&str>) -> BackendClient {
    BackendClient::new(
        &server.uri(),
        token.map(str::to_string),
        Duration::from_secs(2),
    )
    .unwrap()
}

#[tokio::test]
async fn test_fetch_playlist_with_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/player/lobby-tv"))
        .and(header("authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "playlist": {
                "name": "Lobby",
                "media": [
                    { "type": "image/png", "url": "https://cdn.example.com/a.png", "duration": 5, "name": "Welcome" },
                    { "type": "video", "filename": "promo.mp4", "duration": "12.5" }
                ]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let snapshot = client(&server, Some("s3cret"))
        .fetch_playlist("lobby-tv")
        .await
        .unwrap();

    assert_eq!(snapshot.len(), 2);
    let first = snapshot.get(0).unwrap();
    assert_eq!(first.kind, MediaKind::Image);
    assert_eq!(first.name.as_deref(), Some("Welcome"));
    assert_eq!(first.display_duration().unwrap(), Duration::from_secs(5));

    let second = snapshot.get(1).unwrap();
    assert_eq!(second.kind, MediaKind::Video);
    assert_eq!(second.source_url, format!("{}/stream/promo.mp4", server.uri()));
    assert_eq!(second.display_seconds, Some(12.5));
}

#[tokio::test]
async fn test_unknown_device_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/player/ghost"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "Device not found" })))
        .mount(&server)
        .await;

    let err = client(&server, None).fetch_playlist("ghost").await.unwrap_err();
    assert_eq!(err, LoadError::DeviceNotFound("ghost".to_string()));
}

#[tokio::test]
async fn test_server_error_message_from_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/player/lobby-tv"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({ "error": { "message": "database unavailable" } })),
        )
        .mount(&server)
        .await;

    let err = client(&server, None).fetch_playlist("lobby-tv").await.unwrap_err();
    assert_eq!(
        err,
        LoadError::Http {
            status: 500,
            message: "database unavailable".to_string()
        }
    );
}

#[tokio::test]
async fn test_server_error_message_from_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/player/lobby-tv"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance window"))
        .mount(&server)
        .await;

    let err = client(&server, None).fetch_playlist("lobby-tv").await.unwrap_err();
    assert_eq!(
        err,
        LoadError::Http {
            status: 503,
            message: "maintenance window".to_string()
        }
    );
}

#[tokio::test]
async fn test_empty_error_body_falls_back_to_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/player/lobby-tv"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client(&server, None).fetch_playlist("lobby-tv").await.unwrap_err();
    assert_eq!(
        err,
        LoadError::Http {
            status: 401,
            message: "HTTP 401".to_string()
        }
    );
}

#[tokio::test]
async fn test_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/player/lobby-tv"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client(&server, None).fetch_playlist("lobby-tv").await.unwrap_err();
    assert!(matches!(err, LoadError::Malformed(_)));
}

#[tokio::test]
async fn test_empty_playlist_is_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/player/lobby-tv"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "media": [] })))
        .mount(&server)
        .await;

    let snapshot = client(&server, None).fetch_playlist("lobby-tv").await.unwrap();
    assert!(snapshot.is_empty());
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    // Reserve a port, then close it so nothing is listening there
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client =
        BackendClient::new(&format!("http://{}", addr), None, Duration::from_millis(500)).unwrap();
    let err = client.fetch_playlist("lobby-tv").await.unwrap_err();
    assert!(matches!(err, LoadError::Network(_)));
}

#[tokio::test]
async fn test_heartbeat_posts_player_state() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/devices/lobby-tv/heartbeat"))
        .and(header("authorization", "Bearer s3cret"))
        .and(body_json(json!({
            "status": "online",
            "player_state": "playing",
            "current_index": 2,
            "item_count": 4
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let heartbeat = Heartbeat {
        status: "online",
        player_state: PlayerState::Playing,
        current_index: 2,
        item_count: 4,
    };
    client(&server, Some("s3cret"))
        .send_heartbeat("lobby-tv", &heartbeat)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_heartbeat_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let heartbeat = Heartbeat {
        status: "online",
        player_state: PlayerState::Empty,
        current_index: 0,
        item_count: 0,
    };
    assert!(client(&server, None)
        .send_heartbeat("lobby-tv", &heartbeat)
        .await
        .is_err());
}

// Source adapter tests against a local directory server

mod common;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use common::hour;
use gdatum::models::Source;
use gdatum::sources::{
    AltvAdapter, MajesticAdapter, RagempAdapter, SourceAdapter, SourceError, http_client,
};
use std::time::Duration;

const RAGEMP_BODY: &str = r#"{
    "10.0.0.2:22005": {"name": "Second", "gamemode": "freeroam", "url": "", "lang": "de", "players": 5},
    "10.0.0.1:22005": {"name": "First", "gamemode": "roleplay", "url": "https://first.example", "lang": "ru", "players": 250}
}"#;

const ALTV_BODY: &str = r#"[
    {"name": "Alt One", "gameMode": "Roleplay", "website": "https://one.example", "language": "en", "playersCount": 42, "address": "altv://one.example:7788", "maxPlayersCount": 1000}
]"#;

const MAJESTIC_BODY: &str = r#"{"result": {"servers": [
    {"name": "Moscow", "country": "ru", "players": 1800, "ip": "s1.majestic.example"},
    {"name": "Warsaw", "country": "pl", "players": -1, "ip": "s2.majestic.example"}
]}}"#;

/// Serves the fixtures on an ephemeral port and returns its base URL.
async fn directory_server() -> String {
    let app = Router::new()
        .route("/ragemp", get(|| async { RAGEMP_BODY }))
        .route("/altv", get(|| async { ALTV_BODY }))
        .route("/majestic", get(|| async { MAJESTIC_BODY }))
        .route("/broken", get(|| async { "{not json" }))
        .route(
            "/down",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client() -> reqwest::Client {
    http_client(Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn ragemp_adapter_fetches_keyed_map() {
    let base = directory_server().await;
    let adapter = RagempAdapter::new(client(), format!("{}/ragemp", base));
    assert_eq!(adapter.source(), Source::Ragemp);

    let out = adapter.fetch(hour(0)).await.unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].host, "10.0.0.1:22005");
    assert_eq!(out[0].players_count, 250);
    assert_eq!(out[0].language, "ru");
    assert_eq!(out[1].name, "Second");
    assert!(out.iter().all(|s| s.collected_at == hour(0)));
}

#[tokio::test]
async fn altv_adapter_fetches_array() {
    let base = directory_server().await;
    let adapter = AltvAdapter::new(client(), format!("{}/altv", base));

    let out = adapter.fetch(hour(1)).await.unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].source, Source::Altv);
    assert_eq!(out[0].host, "altv://one.example:7788");
    assert_eq!(out[0].gamemode, "Roleplay");
    assert_eq!(out[0].url, "https://one.example");
    assert_eq!(out[0].players_count, 42);
    assert_eq!(out[0].collected_at, hour(1));
}

#[tokio::test]
async fn majestic_adapter_fetches_envelope() {
    let base = directory_server().await;
    let adapter = MajesticAdapter::new(client(), format!("{}/majestic", base));

    let out = adapter.fetch(hour(0)).await.unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].host, "s1.majestic.example");
    assert_eq!(out[0].language, "ru");
    assert_eq!(out[0].url, "https://majestic-rp.ru");
    assert_eq!(out[0].gamemode, "Roleplay");
    assert_eq!(out[1].players_count, 0);
}

#[tokio::test]
async fn non_success_status_is_source_error() {
    let base = directory_server().await;
    let adapter = AltvAdapter::new(client(), format!("{}/down", base));
    match adapter.fetch(hour(0)).await {
        Err(SourceError::Status(status)) => assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE),
        other => panic!("expected Status error, got {:?}", other),
    }
}

#[tokio::test]
async fn malformed_body_is_decode_error() {
    let base = directory_server().await;
    let adapter = RagempAdapter::new(client(), format!("{}/broken", base));
    assert!(matches!(
        adapter.fetch(hour(0)).await,
        Err(SourceError::Decode(_))
    ));
}

#[tokio::test]
async fn unreachable_directory_is_request_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let adapter = MajesticAdapter::new(client(), format!("http://{}/majestic", addr));
    assert!(matches!(
        adapter.fetch(hour(0)).await,
        Err(SourceError::Request(_))
    ));
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let base = directory_server().await;
    let adapter =
        RagempAdapter::new(client(), format!("{}/ragemp", base)).with_max_body_bytes(64);
    assert!(matches!(
        adapter.fetch(hour(0)).await,
        Err(SourceError::TooLarge(64))
    ));

    let fits = AltvAdapter::new(client(), format!("{}/altv", base))
        .with_max_body_bytes(ALTV_BODY.len());
    assert_eq!(fits.fetch(hour(0)).await.unwrap().len(), 1);
}

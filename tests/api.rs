use std::{io, sync::Arc, time::Duration};

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use family_summons::{
    config::AppConfig,
    dao::{
        models::PlayerRecord,
        preferences::PreferenceStore,
        roster_store::{BackendKind, RosterStore, RosterSubscription, memory::MemoryRosterStore},
        storage::{StorageError, StorageResult},
    },
    routes,
    state::{AppState, SharedState},
};
use futures::future::BoxFuture;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use time::{OffsetDateTime, UtcOffset};
use tower::ServiceExt;

/// Roster store whose reads work but every write is refused, as when the remote is unreachable.
struct RefusingWrites(MemoryRosterStore);

impl RosterStore for RefusingWrites {
    fn kind(&self) -> BackendKind {
        BackendKind::CouchDb
    }

    fn subscribe(&self) -> BoxFuture<'static, StorageResult<RosterSubscription>> {
        self.0.subscribe()
    }

    fn append(&self, _record: PlayerRecord) -> BoxFuture<'static, StorageResult<Option<String>>> {
        Box::pin(async { Err(offline()) })
    }

    fn clear(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Err(offline()) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Err(offline()) })
    }
}

fn offline() -> StorageError {
    StorageError::unavailable(
        "connection refused".into(),
        io::Error::new(io::ErrorKind::ConnectionRefused, "offline"),
    )
}

fn test_config() -> AppConfig {
    AppConfig::default()
        .with_utc_offset(UtcOffset::UTC)
        .with_burn_delay(Duration::ZERO)
}

async fn app_with(config: AppConfig, store: Arc<dyn RosterStore>) -> (Router, SharedState) {
    let target = OffsetDateTime::now_utc() + time::Duration::days(3);
    let state = AppState::new(config, target, store, PreferenceStore::in_memory(), false)
        .await
        .unwrap();
    (routes::router(state.clone()), state)
}

async fn app() -> (Router, SharedState) {
    app_with(test_config(), Arc::new(MemoryRosterStore::new())).await
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn new_visitor(app: &Router) -> String {
    let (status, body) = send(app, Method::POST, "/sessions", None).await;
    assert_eq!(status, StatusCode::CREATED);
    body["visitor_id"].as_str().unwrap().to_string()
}

async fn gated_visitor(app: &Router) -> String {
    let visitor = new_visitor(app).await;
    let (status, _) = send(
        app,
        Method::POST,
        &format!("/sessions/{visitor}/password"),
        Some(json!({ "password": "123456" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    visitor
}

async fn join(app: &Router, visitor: &str, alias: &str) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        &format!("/sessions/{visitor}/join"),
        Some(json!({ "alias": alias })),
    )
    .await
}

#[tokio::test]
async fn join_scenario_reports_each_rejection() {
    let (app, _state) = app().await;

    let first = gated_visitor(&app).await;
    let (status, body) = join(&app, &first, "Al").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["player"]["nickname"], "Al");
    assert_eq!(body["session"]["phase"], "joined");
    assert_eq!(body["session"]["current_alias"], "Al");

    let second = gated_visitor(&app).await;
    let (status, body) = join(&app, &second, "al").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "duplicate_alias");
    assert_eq!(
        body["message"],
        "This name is already taken by another member of the Family."
    );

    let (status, body) = join(&app, &second, "A").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "alias_too_short");

    let (status, body) = join(&app, &second, "   ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "empty_alias");

    let (_, roster) = send(&app, Method::GET, "/roster", None).await;
    assert_eq!(roster["count"], 1);
    assert_eq!(roster["players"][0]["nickname"], "Al");
    assert_eq!(roster["players"][0]["rank"], 1);

    // A failed join leaves the session untouched.
    let (_, session) = send(&app, Method::GET, &format!("/sessions/{second}"), None).await;
    assert_eq!(session["phase"], "gated");
    assert_eq!(session["has_joined"], false);
}

#[tokio::test]
async fn joined_alias_is_visible_immediately() {
    let (app, _state) = app().await;
    let visitor = gated_visitor(&app).await;

    let before = OffsetDateTime::now_utc().unix_timestamp() * 1000;
    let (status, _) = join(&app, &visitor, "  Vito  ").await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, roster) = send(&app, Method::GET, &format!("/roster?visitor={visitor}"), None).await;
    let players = roster["players"].as_array().unwrap();
    let vito: Vec<_> = players.iter().filter(|p| p["nickname"] == "Vito").collect();
    assert_eq!(vito.len(), 1);
    assert_eq!(vito[0]["is_current"], true);
    let joined_at = vito[0]["joined_at"].as_i64().unwrap();
    assert!((joined_at - before).abs() < 2_000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_joins_from_one_visitor_claim_a_single_entry() {
    let (app, _state) = app().await;
    let visitor = gated_visitor(&app).await;

    let ((first, _), (second, _)) = tokio::join!(
        join(&app, &visitor, "Vito"),
        join(&app, &visitor, "Sonny")
    );
    let mut statuses = [first.as_u16(), second.as_u16()];
    statuses.sort_unstable();
    assert_eq!(statuses, [201, 409]);

    let (_, roster) = send(&app, Method::GET, "/roster", None).await;
    assert_eq!(roster["count"], 1);
    let (_, session) = send(&app, Method::GET, &format!("/sessions/{visitor}"), None).await;
    assert_eq!(session["phase"], "joined");
    assert_eq!(session["current_alias"], roster["players"][0]["nickname"]);
}

#[tokio::test]
async fn passcode_gate_guards_the_join_form() {
    let (app, _state) = app().await;
    let visitor = new_visitor(&app).await;

    let (_, session) = send(&app, Method::GET, &format!("/sessions/{visitor}"), None).await;
    assert_eq!(session["phase"], "locked");

    let (status, body) = join(&app, &visitor, "Vito").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "locked");

    for rejected in ["12345", "abcdef", "1234567"] {
        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/sessions/{visitor}/password"),
            Some(json!({ "password": rejected })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "passcode {rejected}");
        assert_eq!(body["code"], "invalid_password");
    }

    let (status, session) = send(
        &app,
        Method::POST,
        &format!("/sessions/{visitor}/password"),
        Some(json!({ "password": "123456" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["phase"], "gated");
    assert_eq!(session["password_accepted"], true);
}

#[tokio::test]
async fn without_gate_visitors_start_at_the_join_form() {
    let config = test_config().with_password_gate(false);
    let (app, _state) = app_with(config, Arc::new(MemoryRosterStore::new())).await;

    let visitor = new_visitor(&app).await;
    let (status, _) = join(&app, &visitor, "Sonny").await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn store_failures_surface_as_retryable_errors() {
    let store = Arc::new(RefusingWrites(MemoryRosterStore::new()));
    let (app, _state) = app_with(test_config(), store).await;
    let visitor = gated_visitor(&app).await;

    let (status, body) = join(&app, &visitor, "Fredo").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "join_failed");

    let (_, session) = send(&app, Method::GET, &format!("/sessions/{visitor}"), None).await;
    assert_eq!(session["has_joined"], false);
    assert_eq!(session["current_alias"], Value::Null);

    let (status, body) = send(&app, Method::DELETE, "/roster", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "clear_failed");

    let (_, health) = send(&app, Method::GET, "/healthcheck", None).await;
    assert_eq!(health["status"], "degraded");
}

#[tokio::test]
async fn clearing_the_roster_keeps_sessions() {
    let (app, state) = app().await;
    let visitor = gated_visitor(&app).await;
    join(&app, &visitor, "Tessio").await;

    let (status, _) = send(&app, Method::DELETE, "/roster", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(state.roster().snapshot().is_empty());

    let (_, roster) = send(&app, Method::GET, "/roster", None).await;
    assert_eq!(roster["count"], 0);

    let (_, session) = send(&app, Method::GET, &format!("/sessions/{visitor}"), None).await;
    assert_eq!(session["current_alias"], "Tessio");
}

#[tokio::test]
async fn change_alias_returns_to_the_join_form() {
    let (app, _state) = app().await;
    let visitor = gated_visitor(&app).await;
    join(&app, &visitor, "Clemenza").await;

    let uri = format!("/sessions/{visitor}/change-alias");
    let (status, session) = send(&app, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["phase"], "gated");
    assert_eq!(session["current_alias"], Value::Null);
    assert_eq!(session["password_accepted"], true);

    let (status, _) = send(&app, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // The roster entry outlives the alias change.
    let (_, roster) = send(&app, Method::GET, "/roster", None).await;
    assert_eq!(roster["players"][0]["nickname"], "Clemenza");
}

#[tokio::test]
async fn burn_wipes_local_state_only() {
    let (app, _state) = app().await;
    let visitor = gated_visitor(&app).await;
    join(&app, &visitor, "Luca").await;

    let (status, body) = send(&app, Method::POST, &format!("/sessions/{visitor}/burn"), None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["burn_in_ms"], 0);

    let mut session = Value::Null;
    for _ in 0..50 {
        let (_, current) = send(&app, Method::GET, &format!("/sessions/{visitor}"), None).await;
        session = current;
        if session["phase"] == "locked" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(session["phase"], "locked");
    assert_eq!(session["password_accepted"], false);
    assert_eq!(session["burning"], false);

    let (_, roster) = send(&app, Method::GET, "/roster", None).await;
    assert_eq!(roster["count"], 1);
}

#[tokio::test]
async fn key_sequence_reveals_the_role() {
    let (app, _state) = app().await;
    let visitor = new_visitor(&app).await;
    let uri = format!("/sessions/{visitor}/keys");

    let keys = [
        "ArrowUp",
        "ArrowUp",
        "ArrowDown",
        "ArrowDown",
        "ArrowLeft",
        "ArrowRight",
        "ArrowLeft",
        "ArrowRight",
        "b",
    ];
    for key in keys {
        let (status, session) = send(&app, Method::POST, &uri, Some(json!({ "key": key }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(session["role"], Value::Null);
    }

    let (_, session) = send(&app, Method::POST, &uri, Some(json!({ "key": "a" }))).await;
    assert_eq!(
        session["role"],
        "You are the Don. The table answers to you."
    );

    let (status, body) = send(&app, Method::POST, &uri, Some(json!({ "key": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_key");
}

#[tokio::test]
async fn poster_toggles() {
    let (app, _state) = app().await;
    let visitor = new_visitor(&app).await;
    let uri = format!("/sessions/{visitor}/poster");

    let (_, session) = send(&app, Method::POST, &uri, None).await;
    assert_eq!(session["poster_visible"], true);
    let (_, session) = send(&app, Method::POST, &uri, None).await;
    assert_eq!(session["poster_visible"], false);
}

#[tokio::test]
async fn unknown_visitor_is_not_found() {
    let (app, _state) = app().await;
    let visitor = uuid::Uuid::new_v4();

    let (status, body) = send(&app, Method::GET, &format!("/sessions/{visitor}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn oversized_alias_input_is_rejected() {
    let (app, _state) = app().await;
    let visitor = gated_visitor(&app).await;

    let (status, body) = join(&app, &visitor, &"x".repeat(31)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "alias_too_long");

    let (status, oversized) = join(&app, &visitor, &"x".repeat(200)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(oversized["code"], "alias_too_long");
    assert_eq!(oversized["message"], body["message"]);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/sessions/{visitor}/join"),
        Some(json!({ "nickname": "Vito" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "invalid_body");
}

#[tokio::test]
async fn event_details_carry_the_countdown() {
    let (app, _state) = app().await;

    let (status, event) = send(&app, Method::GET, "/event", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(event["date"], "10.12.2025");
    assert_eq!(event["rules"].as_array().unwrap().len(), 4);
    assert_eq!(event["backend"], "memory");
    assert_eq!(event["degraded"], false);

    let (_, countdown) = send(&app, Method::GET, "/countdown", None).await;
    assert_eq!(countdown["finished"], false);
    assert!(countdown["days"].as_u64().unwrap() >= 2);

    let (_, health) = send(&app, Method::GET, "/healthcheck", None).await;
    assert_eq!(health["status"], "ok");
}

#[tokio::test]
async fn public_stream_starts_with_a_status_handshake() {
    let (app, _state) = app().await;

    let response = app
        .clone()
        .oneshot(Request::get("/sse/public").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );

    let mut body = response.into_body();
    let frame = body.frame().await.unwrap().unwrap();
    let text = String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap();
    assert!(text.contains("event: status"), "{text}");
    assert!(text.contains("\"backend\":\"memory\""), "{text}");
}

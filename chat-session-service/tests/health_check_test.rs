//! Health, readiness and router-level integration tests.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use async_trait::async_trait;
use chat_session_service::models::{Message, NewSession, Session};
use chat_session_service::services::{
    InMemorySessionBackend, SessionBackend, SessionStore, SharedSecretVerifier, StoreError,
};
use chat_session_service::startup::{build_router, cors_layer, AppState};
use common::{TestApp, TEST_SECRET};
use secrecy::Secret;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

#[tokio::test]
async fn ping_returns_dot() {
    let app = TestApp::spawn().await;

    let response = app
        .client()
        .get(app.url("/ping"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), ".");
}

#[tokio::test]
async fn health_check_returns_200() {
    // Arrange
    let app = TestApp::spawn().await;

    // Act
    let response = app
        .client()
        .get(app.url("/health"))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "chat-session-service");
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = TestApp::spawn().await;

    let generated = app.client().get(app.url("/ping")).send().await.unwrap();
    assert!(generated.headers().contains_key("x-request-id"));

    let propagated = app
        .client()
        .get(app.url("/ping"))
        .header("x-request-id", "req-123")
        .send()
        .await
        .unwrap();
    assert_eq!(propagated.headers()["x-request-id"], "req-123");
}

#[tokio::test]
async fn metrics_endpoint_reports_store_operations() {
    let app = TestApp::spawn().await;
    app.create_session(3, "metered", serde_json::json!([])).await;

    let response = app.client().get(app.url("/metrics")).send().await.unwrap();

    assert_eq!(response.status(), 200);
    let text = response.text().await.unwrap();
    assert!(text.contains("chat_session_store_operations_total"));
}

fn router(origins: &[String]) -> axum::Router {
    router_with(Arc::new(InMemorySessionBackend::new()), origins)
}

fn router_with(backend: Arc<dyn SessionBackend>, origins: &[String]) -> axum::Router {
    let state = AppState {
        store: SessionStore::new(backend, Duration::from_secs(1)),
        verifier: Arc::new(SharedSecretVerifier::new(&Secret::new(
            TEST_SECRET.to_string(),
        ))),
    };
    build_router(state, cors_layer(origins))
}

#[tokio::test]
async fn cors_preflight_mirrors_origin_by_default() {
    let response = router(&[])
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/chat/session")
                .header("origin", "https://app.example.com")
                .header("access-control-request-method", "POST")
                .header("access-control-request-headers", "authorization,content-type")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(
        headers["access-control-allow-origin"],
        "https://app.example.com"
    );
    assert_eq!(headers["access-control-allow-credentials"], "true");
    assert_eq!(headers["access-control-max-age"], "300");
}

#[tokio::test]
async fn cors_with_allow_list_ignores_other_origins() {
    let response = router(&["https://allowed.example.com".to_string()])
        .oneshot(
            Request::builder()
                .uri("/ping")
                .header("origin", "https://evil.example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response
        .headers()
        .contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let response = router(&[])
        .oneshot(
            Request::builder()
                .uri("/api/chat/nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

const DB_FAILURE: &str =
    "password authentication failed for user \"chat_admin\" at db.internal:5432";

/// Backend whose database is unreachable.
struct UnreachableBackend;

#[async_trait]
impl SessionBackend for UnreachableBackend {
    async fn insert(&self, _session: NewSession) -> Result<i64, StoreError> {
        Err(unreachable_db())
    }

    async fn fetch(&self, _id: i64) -> Result<Option<Session>, StoreError> {
        Err(unreachable_db())
    }

    async fn fetch_by_user(&self, _user_id: i64) -> Result<Vec<Session>, StoreError> {
        Err(unreachable_db())
    }

    async fn append(&self, _id: i64, _messages: &[Message]) -> Result<bool, StoreError> {
        Err(unreachable_db())
    }

    async fn remove(&self, _id: i64) -> Result<bool, StoreError> {
        Err(unreachable_db())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Err(unreachable_db())
    }
}

fn unreachable_db() -> StoreError {
    StoreError::Database(sqlx::Error::Configuration(DB_FAILURE.into()))
}

#[tokio::test]
async fn unhealthy_store_is_reported_without_backend_details() {
    let response = router_with(Arc::new(UnreachableBackend), &[])
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(!text.contains("chat_admin"));
    assert!(!text.contains("db.internal"));

    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["error"], "session store unavailable");
}

#[tokio::test]
async fn unready_store_returns_503() {
    let response = router_with(Arc::new(UnreachableBackend), &[])
        .oneshot(
            Request::builder()
                .uri("/ready")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

//! Common test utilities for chat-session-service integration tests.

#![allow(dead_code)]

use chat_session_service::config::{
    AuthConfig, AuthProvider, ChatSessionConfig, DatabaseConfig, StoreBackend, StoreConfig,
};
use chat_session_service::startup::Application;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use secrecy::Secret;
use serde_json::{json, Value};
use service_core::config::Config as CommonConfig;
use std::sync::Once;

pub const TEST_SECRET: &str = "integration-test-secret";

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,chat_session_service=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn test_config(backend: StoreBackend, database_url: String) -> ChatSessionConfig {
    ChatSessionConfig {
        common: CommonConfig {
            port: 0,
            log_level: "debug".to_string(),
            otlp_endpoint: None,
        },
        service_name: "chat-session-service-test".to_string(),
        store: StoreConfig {
            backend,
            operation_timeout: std::time::Duration::from_secs(3),
        },
        database: DatabaseConfig {
            url: database_url,
            max_connections: 4,
            min_connections: 1,
            connect_max_elapsed: std::time::Duration::from_secs(5),
            init_schema: true,
        },
        auth: AuthConfig {
            provider: AuthProvider::SharedSecret {
                secret: Secret::new(TEST_SECRET.to_string()),
            },
        },
        cors_allowed_origins: vec![],
    }
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    client: reqwest::Client,
}

impl TestApp {
    /// Spawn the service on a random port backed by the in-memory store.
    pub async fn spawn() -> Self {
        Self::spawn_with(test_config(StoreBackend::Memory, String::new())).await
    }

    pub async fn spawn_with(config: ChatSessionConfig) -> Self {
        init_tracing();

        let app = Application::build(config)
            .await
            .expect("Failed to build application");
        let port = app.port();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        Self {
            address: format!("http://127.0.0.1:{}", port),
            port,
            client: reqwest::Client::new(),
        }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Create a session over the API and return its id.
    pub async fn create_session(&self, user_id: i64, name: &str, conversation: Value) -> i64 {
        let response = self
            .client
            .post(self.url("/api/chat/session"))
            .bearer_auth(token_for("test-user"))
            .json(&json!({
                "user_id": user_id,
                "session_name": name,
                "conversation": conversation,
            }))
            .send()
            .await
            .expect("Failed to execute request");

        assert_eq!(response.status(), 201);
        let body: Value = response.json().await.expect("Failed to parse response");
        body["data"]["session_id"]
            .as_i64()
            .expect("session_id missing from response")
    }

    pub async fn get_session(&self, id: i64) -> reqwest::Response {
        self.client
            .get(self.url(&format!("/api/chat/session/{}", id)))
            .bearer_auth(token_for("test-user"))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn append(&self, id: i64, messages: Value) -> reqwest::Response {
        self.client
            .put(self.url(&format!("/api/chat/session/{}", id)))
            .bearer_auth(token_for("test-user"))
            .json(&json!({ "messages": messages }))
            .send()
            .await
            .expect("Failed to execute request")
    }
}

fn sign(claims: Value) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .expect("Failed to sign token")
}

/// A valid bearer token for `sub`.
pub fn token_for(sub: &str) -> String {
    sign(json!({
        "sub": sub,
        "email": format!("{}@example.com", sub),
        "exp": (Utc::now() + Duration::minutes(10)).timestamp(),
    }))
}

pub fn expired_token(sub: &str) -> String {
    sign(json!({
        "sub": sub,
        "exp": (Utc::now() - Duration::minutes(10)).timestamp(),
    }))
}

pub fn message(sender: &str, content: &str, timestamp: &str) -> Value {
    json!({ "sender": sender, "content": content, "timestamp": timestamp })
}

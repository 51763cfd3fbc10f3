//! Application startup and lifecycle management.

use crate::config::{ChatSessionConfig, StoreBackend};
use crate::handlers;
use crate::services::{
    build_verifier, init_metrics, InMemorySessionBackend, PgSessionBackend, SessionBackend,
    SessionStore, TokenVerifier,
};
use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::tracing::{make_request_span, request_id_middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: SessionStore,
    pub verifier: Arc<dyn TokenVerifier>,
}

/// CORS policy for browser clients. An empty origin list mirrors the request
/// origin, which keeps credentialed requests working.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins = if allowed_origins.is_empty() {
        AllowOrigin::mirror_request()
    } else {
        AllowOrigin::list(
            allowed_origins
                .iter()
                .filter_map(|origin| HeaderValue::from_str(origin).ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ACCEPT,
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-csrf-token"),
        ])
        .expose_headers([header::LINK])
        .allow_credentials(true)
        .max_age(Duration::from_secs(300))
}

pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    let api = Router::new()
        .route("/sessions", get(handlers::list_sessions))
        .route("/session", post(handlers::create_session))
        .route(
            "/session/:id",
            get(handlers::get_session)
                .put(handlers::append_messages)
                .delete(handlers::delete_session),
        );

    Router::new()
        .route("/ping", get(handlers::ping))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .nest("/api/chat", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span::<Body>))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    pub async fn build(config: ChatSessionConfig) -> Result<Self, AppError> {
        init_metrics();

        let backend: Arc<dyn SessionBackend> = match config.store.backend {
            StoreBackend::Postgres => {
                let db = PgSessionBackend::connect(&config.database)
                    .await
                    .map_err(|e| {
                        tracing::error!(error = %e, "Failed to connect to PostgreSQL");
                        e
                    })?;

                if config.database.init_schema {
                    db.initialize_schema().await.map_err(|e| {
                        tracing::error!(error = %e, "Failed to bootstrap schema");
                        e
                    })?;
                }

                Arc::new(db)
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory session store; data is lost on restart");
                Arc::new(InMemorySessionBackend::new())
            }
        };

        let state = AppState {
            store: SessionStore::new(backend, config.store.operation_timeout),
            verifier: build_verifier(&config.auth.provider),
        };

        let router = build_router(state, cors_layer(&config.cors_allowed_origins));

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port, "Chat session service listener bound");

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        tracing::info!(
            service = "chat-session-service",
            version = env!("CARGO_PKG_VERSION"),
            port = self.port,
            "Service ready to accept connections"
        );

        axum::serve(self.listener, self.router).await
    }
}

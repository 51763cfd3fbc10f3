//! Session store: the one component that owns chat-session persistence.
//!
//! `SessionStore` wraps an injected [`SessionBackend`] and adds the behaviour
//! every backend shares: server-side `created_at` stamping, a bounded timeout
//! on each operation, and per-operation metrics.

use crate::models::{Message, NewSession, Session};
use async_trait::async_trait;
use chrono::Utc;
use service_core::error::AppError;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, instrument};

/// Matches the 3 second budget the request layer assumes for a store call.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session {0} not found")]
    NotFound(i64),

    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("conversation serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    fn outcome(&self) -> &'static str {
        match self {
            StoreError::NotFound(_) => "not_found",
            StoreError::Timeout { .. } => "timeout",
            StoreError::Serialization(_) => "serialization_error",
            StoreError::Database(_) => "database_error",
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => AppError::NotFound(anyhow::anyhow!("Session not found")),
            StoreError::Timeout { .. } => AppError::Timeout(err.to_string()),
            StoreError::Serialization(e) => AppError::DatabaseError(anyhow::Error::new(e)),
            StoreError::Database(e) => AppError::DatabaseError(anyhow::Error::new(e)),
        }
    }
}

/// Storage seam behind [`SessionStore`].
///
/// `append` must extend the conversation as a single atomic step: two
/// concurrent appends to the same id may interleave in either order but must
/// never drop each other's messages.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn insert(&self, session: NewSession) -> Result<i64, StoreError>;

    async fn fetch(&self, id: i64) -> Result<Option<Session>, StoreError>;

    /// Newest `created_at` first, ties broken by descending id.
    async fn fetch_by_user(&self, user_id: i64) -> Result<Vec<Session>, StoreError>;

    /// Returns `false` when no session has `id`.
    async fn append(&self, id: i64, messages: &[Message]) -> Result<bool, StoreError>;

    /// Returns whether a session was removed.
    async fn remove(&self, id: i64) -> Result<bool, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn SessionBackend>,
    operation_timeout: Duration,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn SessionBackend>, operation_timeout: Duration) -> Self {
        Self {
            backend,
            operation_timeout,
        }
    }

    async fn timed<T, F>(&self, operation: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let start = Instant::now();

        let result = match tokio::time::timeout(self.operation_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout {
                operation,
                timeout: self.operation_timeout,
            }),
        };

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.outcome(),
        };
        metrics::histogram!("chat_session_store_operation_duration_seconds", "operation" => operation)
            .record(start.elapsed().as_secs_f64());
        metrics::counter!("chat_session_store_operations_total", "operation" => operation, "outcome" => outcome)
            .increment(1);

        result
    }

    /// Persist a new session and return its store-assigned id.
    #[instrument(skip(self, session_name, conversation), fields(message_count = conversation.len()))]
    pub async fn create(
        &self,
        user_id: i64,
        session_name: &str,
        conversation: Vec<Message>,
    ) -> Result<i64, StoreError> {
        let new_session = NewSession {
            user_id,
            session_name: session_name.to_string(),
            conversation,
            created_at: Utc::now(),
        };

        let id = self
            .timed("create", self.backend.insert(new_session))
            .await?;

        info!(session_id = id, "Chat session created");
        Ok(id)
    }

    /// `Ok(None)` is the not-found signal; errors are reserved for store failures.
    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Session>, StoreError> {
        self.timed("get_by_id", self.backend.fetch(id)).await
    }

    #[instrument(skip(self))]
    pub async fn list_by_user(&self, user_id: i64) -> Result<Vec<Session>, StoreError> {
        let sessions = self
            .timed("list_by_user", self.backend.fetch_by_user(user_id))
            .await?;

        debug!(count = sessions.len(), "Listed chat sessions");
        Ok(sessions)
    }

    /// Extend the conversation tail with `new_messages`, in the given order.
    #[instrument(skip(self, new_messages), fields(message_count = new_messages.len()))]
    pub async fn append_messages(
        &self,
        id: i64,
        new_messages: Vec<Message>,
    ) -> Result<(), StoreError> {
        let appended = self
            .timed("append_messages", self.backend.append(id, &new_messages))
            .await?;

        if !appended {
            return Err(StoreError::NotFound(id));
        }

        info!(session_id = id, "Conversation extended");
        Ok(())
    }

    /// Hard delete. Missing ids are not an error.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let removed = self.timed("delete", self.backend.remove(id)).await?;

        if removed {
            info!(session_id = id, "Chat session deleted");
        } else {
            debug!(session_id = id, "Delete of unknown chat session ignored");
        }
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), StoreError> {
        self.timed("health_check", self.backend.health_check())
            .await
    }
}

//! PostgreSQL backend for the session store.

use crate::config::DatabaseConfig;
use crate::models::{Message, NewSession, Session};
use crate::services::store::{SessionBackend, StoreError};
use async_trait::async_trait;
use backoff::future::retry_notify;
use backoff::ExponentialBackoff;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{error, info, instrument, warn};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS chat_sessions (
        id BIGSERIAL PRIMARY KEY,
        user_id BIGINT NOT NULL,
        session_name TEXT NOT NULL,
        conversation JSONB NOT NULL DEFAULT '[]'::jsonb,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS chat_sessions_user_created_idx
        ON chat_sessions (user_id, created_at DESC)
    "#,
];

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: i64,
    user_id: i64,
    session_name: String,
    conversation: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl TryFrom<SessionRow> for Session {
    type Error = serde_json::Error;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        Ok(Session {
            id: row.id,
            user_id: row.user_id,
            session_name: row.session_name,
            conversation: serde_json::from_value(row.conversation)?,
            created_at: row.created_at,
        })
    }
}

/// Connection pool wrapper over the `chat_sessions` table.
#[derive(Clone)]
pub struct PgSessionBackend {
    pool: PgPool,
}

impl PgSessionBackend {
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect, retrying with exponential backoff until
    /// `connect_max_elapsed` runs out. Configuration errors fail immediately.
    #[instrument(skip(config), fields(service = "chat-session-service"))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Connecting to PostgreSQL"
        );

        let options = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800));

        let backoff = ExponentialBackoff {
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(5),
            max_elapsed_time: Some(config.connect_max_elapsed),
            ..Default::default()
        };

        let url = config.url.as_str();
        let pool = retry_notify(
            backoff,
            || {
                let options = options.clone();
                async move {
                    options.connect(url).await.map_err(|e| match e {
                        sqlx::Error::Configuration(_) => backoff::Error::permanent(e),
                        other => backoff::Error::transient(other),
                    })
                }
            },
            |e: sqlx::Error, wait: Duration| {
                warn!(
                    error = %e,
                    retry_in_ms = wait.as_millis() as u64,
                    "PostgreSQL not reachable yet, backing off"
                );
            },
        )
        .await
        .map_err(|e| {
            error!(error = %e, "Giving up on PostgreSQL connection");
            AppError::ServiceUnavailable
        })?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the table and index if missing. Safe to run on every start.
    #[instrument(skip(self))]
    pub async fn initialize_schema(&self) -> Result<(), AppError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Schema bootstrap failed: {}", e))
                })?;
        }
        info!("chat_sessions schema ready");
        Ok(())
    }
}

#[async_trait]
impl SessionBackend for PgSessionBackend {
    async fn insert(&self, session: NewSession) -> Result<i64, StoreError> {
        let conversation = serde_json::to_value(&session.conversation)?;

        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO chat_sessions (user_id, session_name, conversation, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(session.user_id)
        .bind(&session.session_name)
        .bind(conversation)
        .bind(session.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn fetch(&self, id: i64) -> Result<Option<Session>, StoreError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, user_id, session_name, conversation, created_at
            FROM chat_sessions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Session::try_from).transpose()?)
    }

    async fn fetch_by_user(&self, user_id: i64) -> Result<Vec<Session>, StoreError> {
        let rows = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, user_id, session_name, conversation, created_at
            FROM chat_sessions
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| Session::try_from(row).map_err(StoreError::from))
            .collect()
    }

    async fn append(&self, id: i64, messages: &[Message]) -> Result<bool, StoreError> {
        let tail = serde_json::to_value(messages)?;

        // Single statement: the row lock taken by UPDATE serializes concurrent appends.
        let updated = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE chat_sessions
            SET conversation = conversation || $1::jsonb
            WHERE id = $2
            RETURNING id
            "#,
        )
        .bind(tail)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(updated.is_some())
    }

    async fn remove(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM chat_sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

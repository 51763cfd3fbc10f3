use axum::async_trait;
use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use service_core::error::AppError;

/// `:id` path segment parsed as a session id.
#[derive(Debug, Clone, Copy)]
pub struct SessionId(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for SessionId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::BadRequest(anyhow::anyhow!("invalid session ID")))?;

        let id = raw
            .parse::<i64>()
            .map_err(|_| AppError::BadRequest(anyhow::anyhow!("invalid session ID")))?;

        Ok(SessionId(id))
    }
}

use crate::services::VerifiedIdentity;
use crate::startup::AppState;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use service_core::error::AppError;

/// Caller identity, verified from the `Authorization: Bearer` header.
///
/// Taking this as a handler argument is what gates a route: verification runs
/// during extraction and the identity is handed to the handler explicitly.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub VerifiedIdentity);

impl AuthenticatedUser {
    pub fn uid(&self) -> &str {
        &self.0.uid
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;

        let identity = state.verifier.verify(token).await.map_err(|e| {
            tracing::debug!(error = %e, "Token verification failed");
            AppError::from(e)
        })?;

        tracing::Span::current().record("user_id", identity.uid.as_str());

        Ok(AuthenticatedUser(identity))
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let value = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::AuthError(anyhow::anyhow!("missing authorization header")))?
        .to_str()
        .map_err(|_| AppError::AuthError(anyhow::anyhow!("invalid authorization header format")))?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::AuthError(anyhow::anyhow!("invalid authorization header format")))
}

//! Bearer token verification against an external identity provider.
//!
//! The service never issues tokens. A [`TokenVerifier`] turns a raw bearer
//! token into a [`VerifiedIdentity`] or rejects it.

mod firebase;
mod shared_secret;

pub use firebase::{FirebaseTokenVerifier, GOOGLE_SECURETOKEN_JWKS_URL};
pub use shared_secret::SharedSecretVerifier;

use crate::config::AuthProvider;
use async_trait::async_trait;
use service_core::error::AppError;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    /// Provider-side user id (`sub` claim).
    pub uid: String,
    pub email: Option<String>,
}

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("invalid or expired token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("token signed with an unknown key")]
    UnknownKey,

    #[error("token has no subject")]
    MissingSubject,

    #[error("failed to fetch identity provider keys: {0}")]
    KeyFetch(String),
}

impl From<VerifyError> for AppError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::KeyFetch(msg) => AppError::BadGateway(msg),
            other => AppError::AuthError(anyhow::anyhow!(other.to_string())),
        }
    }
}

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, VerifyError>;
}

pub(crate) fn identity_from_claims(
    sub: String,
    email: Option<String>,
) -> Result<VerifiedIdentity, VerifyError> {
    if sub.trim().is_empty() {
        return Err(VerifyError::MissingSubject);
    }
    Ok(VerifiedIdentity { uid: sub, email })
}

/// Build the verifier selected by configuration.
pub fn build_verifier(provider: &AuthProvider) -> Arc<dyn TokenVerifier> {
    match provider {
        AuthProvider::Firebase { project_id } => {
            tracing::info!(project_id = %project_id, "Using Firebase ID token verification");
            Arc::new(FirebaseTokenVerifier::new(project_id))
        }
        AuthProvider::SharedSecret { secret } => {
            tracing::warn!("Using shared-secret token verification; not for production");
            Arc::new(SharedSecretVerifier::new(secret))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn blank_subject_is_rejected() {
        assert!(matches!(
            identity_from_claims("  ".to_string(), None),
            Err(VerifyError::MissingSubject)
        ));
    }

    #[test]
    fn key_fetch_failure_is_a_gateway_error() {
        let err = AppError::from(VerifyError::KeyFetch("connection refused".into()));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);

        let err = AppError::from(VerifyError::UnknownKey);
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }
}

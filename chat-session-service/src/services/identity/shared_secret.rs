use super::{identity_from_claims, TokenVerifier, VerifiedIdentity, VerifyError};
use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct SharedSecretClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
}

/// HS256 verification with a locally configured secret.
///
/// Meant for local development and tests where no identity provider is reachable.
pub struct SharedSecretVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl SharedSecretVerifier {
    pub fn new(secret: &Secret<String>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            decoding_key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl TokenVerifier for SharedSecretVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, VerifyError> {
        let data = decode::<SharedSecretClaims>(token, &self.decoding_key, &self.validation)?;
        identity_from_claims(data.claims.sub, data.claims.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    const SECRET: &str = "unit-test-secret";

    fn verifier() -> SharedSecretVerifier {
        SharedSecretVerifier::new(&Secret::new(SECRET.to_string()))
    }

    fn token(claims: serde_json::Value, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn exp_in(minutes: i64) -> i64 {
        (Utc::now() + Duration::minutes(minutes)).timestamp()
    }

    #[tokio::test]
    async fn accepts_valid_token() {
        let jwt = token(
            json!({"sub": "uid-7", "email": "seven@example.com", "exp": exp_in(10)}),
            SECRET,
        );

        let identity = verifier().verify(&jwt).await.unwrap();
        assert_eq!(identity.uid, "uid-7");
        assert_eq!(identity.email.as_deref(), Some("seven@example.com"));
    }

    #[tokio::test]
    async fn rejects_expired_token() {
        let jwt = token(json!({"sub": "uid-7", "exp": exp_in(-10)}), SECRET);

        let err = verifier().verify(&jwt).await.unwrap_err();
        assert!(matches!(err, VerifyError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn rejects_wrong_signature() {
        let jwt = token(json!({"sub": "uid-7", "exp": exp_in(10)}), "another-secret");

        assert!(verifier().verify(&jwt).await.is_err());
    }

    #[tokio::test]
    async fn rejects_token_without_subject() {
        let jwt = token(json!({"exp": exp_in(10)}), SECRET);

        assert!(verifier().verify(&jwt).await.is_err());
    }

    #[tokio::test]
    async fn rejects_garbage() {
        assert!(verifier().verify("not-a-jwt").await.is_err());
    }
}

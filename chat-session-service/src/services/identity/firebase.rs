use super::{identity_from_claims, TokenVerifier, VerifiedIdentity, VerifyError};
use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::header::{HeaderMap, CACHE_CONTROL};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Public keys Google signs Firebase ID tokens with.
pub const GOOGLE_SECURETOKEN_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// Used when the key endpoint sends no `Cache-Control: max-age`.
const DEFAULT_KEY_TTL: Duration = Duration::from_secs(3600);

/// Minimum gap between refreshes triggered by an unknown `kid`.
const REFRESH_COOLDOWN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
}

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
    expires_at: Instant,
}

/// Answer from the cache when it can: a hit, or an unknown `kid` while the
/// keys are unexpired and were refreshed less than [`REFRESH_COOLDOWN`] ago.
/// `None` means the keys must be refetched.
fn cached_key(
    cached: Option<&CachedKeys>,
    kid: &str,
) -> Option<Result<DecodingKey, VerifyError>> {
    let now = Instant::now();
    let cached = cached.filter(|c| c.expires_at > now)?;

    match cached.keys.find(kid) {
        Some(jwk) => Some(DecodingKey::from_jwk(jwk).map_err(VerifyError::from)),
        None if now.duration_since(cached.fetched_at) < REFRESH_COOLDOWN => {
            Some(Err(VerifyError::UnknownKey))
        }
        None => None,
    }
}

/// Verifies Firebase ID tokens (RS256) for one project.
///
/// Signing keys are cached for as long as the key endpoint allows and
/// refetched when they expire. An unknown `kid` forces a refresh at most once
/// per [`REFRESH_COOLDOWN`].
pub struct FirebaseTokenVerifier {
    client: reqwest::Client,
    jwks_url: String,
    validation: Validation,
    cache: RwLock<Option<CachedKeys>>,
}

impl FirebaseTokenVerifier {
    pub fn new(project_id: &str) -> Self {
        Self::with_jwks_url(project_id, GOOGLE_SECURETOKEN_JWKS_URL)
    }

    pub fn with_jwks_url(project_id: &str, jwks_url: &str) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[project_id]);
        validation.set_issuer(&[format!("https://securetoken.google.com/{}", project_id)]);
        validation.set_required_spec_claims(&["exp", "aud", "iss", "sub"]);

        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .unwrap_or_default(),
            jwks_url: jwks_url.to_string(),
            validation,
            cache: RwLock::new(None),
        }
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, VerifyError> {
        if let Some(found) = cached_key(self.cache.read().await.as_ref(), kid) {
            return found;
        }

        // One refresh at a time; whoever waited may find the keys already fetched.
        let mut cache = self.cache.write().await;
        if let Some(found) = cached_key(cache.as_ref(), kid) {
            return found;
        }

        let fresh = self.fetch_keys().await?;
        let key = match fresh.keys.find(kid) {
            Some(jwk) => Ok(DecodingKey::from_jwk(jwk)?),
            None => {
                tracing::debug!(kid, "Token names a key the provider does not publish");
                Err(VerifyError::UnknownKey)
            }
        };
        *cache = Some(fresh);
        key
    }

    async fn fetch_keys(&self) -> Result<CachedKeys, VerifyError> {
        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                tracing::error!(url = %self.jwks_url, error = %e, "Failed to fetch signing keys");
                VerifyError::KeyFetch(e.to_string())
            })?;

        let ttl = max_age(response.headers()).unwrap_or(DEFAULT_KEY_TTL);
        let keys: JwkSet = response
            .json()
            .await
            .map_err(|e| VerifyError::KeyFetch(format!("malformed key set: {}", e)))?;

        tracing::debug!(
            key_count = keys.keys.len(),
            ttl_secs = ttl.as_secs(),
            "Refreshed identity provider signing keys"
        );

        let now = Instant::now();
        Ok(CachedKeys {
            keys,
            fetched_at: now,
            expires_at: now + ttl,
        })
    }
}

#[async_trait]
impl TokenVerifier for FirebaseTokenVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, VerifyError> {
        let header = decode_header(token)?;
        let kid = header.kid.ok_or(VerifyError::UnknownKey)?;
        let key = self.decoding_key(&kid).await?;

        let data = decode::<FirebaseClaims>(token, &key, &self.validation)?;
        identity_from_claims(data.claims.sub, data.claims.email)
    }
}

fn max_age(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(CACHE_CONTROL)?
        .to_str()
        .ok()?
        .split(',')
        .find_map(|directive| directive.trim().strip_prefix("max-age=")?.parse().ok())
        .map(Duration::from_secs)
}

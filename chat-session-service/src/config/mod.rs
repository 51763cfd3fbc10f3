//! Configuration module for chat-session-service.

use crate::services::DEFAULT_OPERATION_TIMEOUT;
use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ChatSessionConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub store: StoreConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    /// Empty means "mirror the request origin".
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub operation_timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Total time spent retrying the initial connection before giving up.
    pub connect_max_elapsed: Duration,
    pub init_schema: bool,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub provider: AuthProvider,
}

#[derive(Debug, Clone)]
pub enum AuthProvider {
    Firebase { project_id: String },
    SharedSecret { secret: Secret<String> },
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(format!("Invalid store backend: {}", s)),
        }
    }
}

impl ChatSessionConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        Self::from_lookup(common, |key| env::var(key).ok())
    }

    /// Build the service config from any key/value source.
    pub fn from_lookup<F>(common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend: StoreBackend = lookup("STORE_BACKEND")
            .unwrap_or_else(|| "postgres".to_string())
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let database_url = lookup("DATABASE_URL").unwrap_or_default();
        if backend == StoreBackend::Postgres && database_url.is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "DATABASE_URL is required when STORE_BACKEND=postgres"
            )));
        }

        let provider = match lookup("AUTH_PROVIDER")
            .unwrap_or_else(|| "firebase".to_string())
            .to_lowercase()
            .as_str()
        {
            "firebase" => AuthProvider::Firebase {
                project_id: required(&lookup, "FIREBASE_PROJECT_ID")?,
            },
            "shared-secret" | "shared_secret" => AuthProvider::SharedSecret {
                secret: Secret::new(required(&lookup, "AUTH_SHARED_SECRET")?),
            },
            other => {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Invalid auth provider: {}",
                    other
                )))
            }
        };

        Ok(Self {
            common,
            service_name: lookup("SERVICE_NAME")
                .unwrap_or_else(|| "chat-session-service".to_string()),
            store: StoreConfig {
                backend,
                operation_timeout: Duration::from_millis(parse_or(
                    &lookup,
                    "STORE_OPERATION_TIMEOUT_MS",
                    DEFAULT_OPERATION_TIMEOUT.as_millis() as u64,
                )?),
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
                min_connections: parse_or(&lookup, "DATABASE_MIN_CONNECTIONS", 2)?,
                connect_max_elapsed: Duration::from_secs(parse_or(
                    &lookup,
                    "DATABASE_CONNECT_MAX_ELAPSED_SECS",
                    30,
                )?),
                init_schema: parse_or(&lookup, "DATABASE_INIT_SCHEMA", true)?,
            },
            auth: AuthConfig { provider },
            cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|v| !v.is_empty()).ok_or_else(|| {
        AppError::ConfigError(anyhow::anyhow!(format!("{} is required but not set", key)))
    })
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| {
            AppError::ConfigError(anyhow::anyhow!(format!("{} has an invalid value: {}", key, raw)))
        }),
        None => Ok(default),
    }
}

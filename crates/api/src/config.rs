//! Process configuration, read from the environment.

use std::net::SocketAddr;

use axum::http::HeaderValue;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use taskgate_auth::{Keyring, SigningKey};

const DEFAULT_KEY_ID: &str = "primary";
const DEFAULT_EXPIRATION_HOURS: i64 = 24;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000";
const MIN_SECRET_BYTES: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub keyring: Keyring,
    pub token_ttl: Duration,
    /// Postgres URL; in-memory stores when absent.
    pub database_url: Option<String>,
    pub bind_addr: SocketAddr,
    /// Browser origins allowed by CORS; `*` allows any origin.
    pub cors_origins: Vec<String>,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let secret = var("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        if secret.len() < MIN_SECRET_BYTES {
            tracing::warn!(
                min_bytes = MIN_SECRET_BYTES,
                "JWT_SECRET is shorter than recommended"
            );
        }
        let key_id = var("JWT_KEY_ID").unwrap_or_else(|| DEFAULT_KEY_ID.to_string());
        let mut keyring = Keyring::new(SigningKey::new(key_id, secret));

        if let Some(previous) = var("JWT_PREVIOUS_SECRET") {
            let previous_id =
                var("JWT_PREVIOUS_KEY_ID").ok_or(ConfigError::Missing("JWT_PREVIOUS_KEY_ID"))?;
            let until = var("JWT_PREVIOUS_SECRET_UNTIL")
                .ok_or(ConfigError::Missing("JWT_PREVIOUS_SECRET_UNTIL"))?;
            let until = DateTime::parse_from_rfc3339(&until)
                .map_err(|e| ConfigError::Invalid {
                    var: "JWT_PREVIOUS_SECRET_UNTIL",
                    reason: e.to_string(),
                })?
                .with_timezone(&Utc);
            keyring = keyring
                .with_retired(SigningKey::new(previous_id, previous), until)
                .map_err(|e| ConfigError::Invalid {
                    var: "JWT_PREVIOUS_KEY_ID",
                    reason: e.to_string(),
                })?;
        }

        let hours = match var("JWT_EXPIRATION_HOURS") {
            Some(raw) => raw.trim().parse::<i64>().map_err(|e| ConfigError::Invalid {
                var: "JWT_EXPIRATION_HOURS",
                reason: e.to_string(),
            })?,
            None => DEFAULT_EXPIRATION_HOURS,
        };
        if hours <= 0 {
            return Err(ConfigError::Invalid {
                var: "JWT_EXPIRATION_HOURS",
                reason: "must be positive".to_string(),
            });
        }
        let token_ttl = Duration::try_hours(hours).ok_or(ConfigError::Invalid {
            var: "JWT_EXPIRATION_HOURS",
            reason: "out of range".to_string(),
        })?;

        let bind_addr = var("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                var: "BIND_ADDR",
                reason: e.to_string(),
            })?;

        let cors_origins = parse_origins(
            &var("CORS_ORIGINS").unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string()),
        )?;

        Ok(Self {
            keyring,
            token_ttl,
            database_url: var("DATABASE_URL"),
            bind_addr,
            cors_origins,
        })
    }

    /// In-memory configuration with a single signing key.
    pub fn for_tests(secret: &str) -> Self {
        Self {
            keyring: Keyring::new(SigningKey::new(DEFAULT_KEY_ID, secret)),
            token_ttl: Duration::hours(DEFAULT_EXPIRATION_HOURS),
            database_url: None,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            cors_origins: vec![DEFAULT_CORS_ORIGINS.to_string()],
        }
    }
}

/// Comma-separated origin list; each entry must be a valid header value.
fn parse_origins(raw: &str) -> Result<Vec<String>, ConfigError> {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_owned)
        .collect();

    if origins.is_empty() {
        return Err(ConfigError::Invalid {
            var: "CORS_ORIGINS",
            reason: "at least one origin is required".to_string(),
        });
    }
    if let Some(bad) = origins.iter().find(|o| HeaderValue::from_str(o).is_err()) {
        return Err(ConfigError::Invalid {
            var: "CORS_ORIGINS",
            reason: format!("`{bad}` is not a valid origin"),
        });
    }
    Ok(origins)
}

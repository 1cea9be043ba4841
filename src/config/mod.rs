//! Configuration loading with layered .env support
//!
//! Precedence (highest wins): process environment, `.env.{profile}.local`,
//! `.env.{profile}`, `.env.local`, `.env`, built-in defaults. All service
//! variables carry the `JIRADASH_` prefix.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

const ENV_PREFIX: &str = "JIRADASH_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(String),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

/// HTTP client retry and timeout knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpClientConfig {
    pub max_retries: u32,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub timeout_ms: u64,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            max_retries: 4,
            min_delay_ms: 500,
            max_delay_ms: 8_000,
            timeout_ms: 20_000,
        }
    }
}

/// Background sync scheduling knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    pub enabled: bool,
    pub interval_minutes: i64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_minutes: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub profile: String,
    pub log_level: String,
    pub log_format: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout_ms: u64,
    /// 32-byte AES key decoded from base64; absent means the vault fails closed.
    pub crypto_key: Option<Vec<u8>>,
    pub jira_client_id: Option<String>,
    pub jira_client_secret: Option<String>,
    pub jira_oauth_base: String,
    pub jira_api_base: String,
    pub sync: SyncConfig,
    pub http: HttpClientConfig,
}

/// Loads configuration from layered .env files plus the process environment.
pub struct ConfigLoader {
    root: PathBuf,
}

impl ConfigLoader {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let profile = std::env::var(format!("{ENV_PREFIX}PROFILE"))
            .unwrap_or_else(|_| "development".to_string());

        // Lowest layer first; dotenvy never overrides variables already set,
        // so process env wins and earlier files win over later ones.
        let layers = [
            format!(".env.{profile}.local"),
            format!(".env.{profile}"),
            ".env.local".to_string(),
            ".env".to_string(),
        ];
        for layer in &layers {
            let path = self.root.join(layer);
            if path.exists() {
                let _ = dotenvy::from_path(&path);
            }
        }

        self.build(profile)
    }

    fn build(&self, profile: String) -> Result<AppConfig, ConfigError> {
        let database_url = require("DATABASE_URL")?;

        let crypto_key = match optional("CRYPTO_KEY") {
            Some(encoded) => {
                let bytes = BASE64.decode(&encoded).map_err(|e| ConfigError::Invalid {
                    key: format!("{ENV_PREFIX}CRYPTO_KEY"),
                    reason: format!("not valid base64: {e}"),
                })?;
                if bytes.len() != 32 {
                    return Err(ConfigError::Invalid {
                        key: format!("{ENV_PREFIX}CRYPTO_KEY"),
                        reason: format!("must decode to 32 bytes, got {}", bytes.len()),
                    });
                }
                Some(bytes)
            }
            None => None,
        };

        Ok(AppConfig {
            log_level: optional("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_format: optional("LOG_FORMAT").unwrap_or_else(|| "json".to_string()),
            database_url,
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 10)?,
            db_acquire_timeout_ms: parse_or("DB_ACQUIRE_TIMEOUT_MS", 5_000)?,
            crypto_key,
            jira_client_id: optional("JIRA_CLIENT_ID"),
            jira_client_secret: optional("JIRA_CLIENT_SECRET"),
            jira_oauth_base: optional("JIRA_OAUTH_BASE")
                .unwrap_or_else(|| "https://auth.atlassian.com".to_string()),
            jira_api_base: optional("JIRA_API_BASE")
                .unwrap_or_else(|| "https://api.atlassian.com".to_string()),
            sync: SyncConfig {
                enabled: parse_or("SYNC_ENABLED", true)?,
                interval_minutes: resolve_interval(optional("SYNC_INTERVAL_MINUTES")),
            },
            http: HttpClientConfig {
                max_retries: parse_or("HTTP_MAX_RETRIES", 4)?,
                min_delay_ms: parse_or("HTTP_MIN_DELAY_MS", 500)?,
                max_delay_ms: parse_or("HTTP_MAX_DELAY_MS", 8_000)?,
                timeout_ms: parse_or("HTTP_TIMEOUT_MS", 20_000)?,
            },
            profile,
        })
    }
}

/// Resolve the sync interval: unset or unparsable or non-positive falls back
/// to the 10 minute default.
pub fn resolve_interval(raw: Option<String>) -> i64 {
    const DEFAULT_INTERVAL_MINUTES: i64 = 10;
    match raw.and_then(|v| v.trim().parse::<i64>().ok()) {
        Some(n) if n > 0 => n,
        _ => DEFAULT_INTERVAL_MINUTES,
    }
}

fn require(key: &str) -> Result<String, ConfigError> {
    optional(key).ok_or_else(|| ConfigError::Missing(format!("{ENV_PREFIX}{key}")))
}

fn optional(key: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{key}"))
        .ok()
        .filter(|v| !v.trim().is_empty())
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match optional(key) {
        Some(raw) => raw.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
            key: format!("{ENV_PREFIX}{key}"),
            reason: format!("could not parse {raw:?}"),
        }),
        None => Ok(default),
    }
}

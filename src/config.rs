// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the petition service.
//!
//! Every value has a default; `Config::from_env` overlays environment
//! variables (after loading a `.env` file, if present).

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Comma-separated CORS origin allow-list
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: String,

    /// Take the caller identity from `X-Forwarded-For` (default: false)
    #[serde(default)]
    pub trust_proxy_headers: bool,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitSettings,

    /// Admin authentication configuration
    #[serde(default)]
    pub admin: AdminConfig,

    /// Document store configuration
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Limits for a single sliding-window limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests admitted per window
    pub max_requests: u32,

    /// Window length in seconds
    pub window_secs: u64,
}

/// The two limiter policies plus the sweep cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Signature submissions (default: 3 per 300s)
    #[serde(default = "default_petition_limit")]
    pub petition: RateLimitConfig,

    /// General API reads (default: 60 per 60s)
    #[serde(default = "default_api_limit")]
    pub api: RateLimitConfig,

    /// Interval between background sweeps in seconds (default: 300)
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

/// Admin credential and token settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Admin username (default: admin)
    #[serde(default = "default_admin_username")]
    pub username: String,

    /// Plaintext password, hashed with Argon2id at startup
    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// Pre-computed Argon2 PHC string; takes precedence over `password`
    #[serde(default)]
    pub password_hash: Option<String>,

    /// Token lifetime in seconds (default: 86400)
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
}

/// SurrealDB connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `memory` or a RocksDB directory (requires the `rocksdb` feature)
    #[serde(default = "default_db_path")]
    pub path: String,

    #[serde(default = "default_db_namespace")]
    pub namespace: String,

    #[serde(default = "default_db_name")]
    pub database: String,

    /// Per-operation timeout in milliseconds (default: 5000)
    #[serde(default = "default_db_timeout_ms")]
    pub timeout_ms: u64,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_allowed_origins() -> String {
    "https://localhost".to_string()
}

fn default_petition_limit() -> RateLimitConfig {
    RateLimitConfig {
        max_requests: 3,
        window_secs: 300,
    }
}

fn default_api_limit() -> RateLimitConfig {
    RateLimitConfig {
        max_requests: 60,
        window_secs: 60,
    }
}

fn default_cleanup_interval_secs() -> u64 {
    300
}

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_token_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_db_path() -> String {
    "memory".to_string()
}

fn default_db_namespace() -> String {
    "petition".to_string()
}

fn default_db_name() -> String {
    "petition".to_string()
}

fn default_db_timeout_ms() -> u64 {
    5000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            allowed_origins: default_allowed_origins(),
            trust_proxy_headers: false,
            rate_limit: RateLimitSettings::default(),
            admin: AdminConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            petition: default_petition_limit(),
            api: default_api_limit(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: default_admin_username(),
            password: None,
            password_hash: None,
            token_ttl_secs: default_token_ttl_secs(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            namespace: default_db_namespace(),
            database: default_db_name(),
            timeout_ms: default_db_timeout_ms(),
        }
    }
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("password_hash", &self.password_hash.as_ref().map(|_| "<redacted>"))
            .field("token_ttl_secs", &self.token_ttl_secs)
            .finish()
    }
}

impl RateLimitConfig {
    /// Get the window duration
    pub fn window_duration(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl RateLimitSettings {
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(1))
    }
}

impl AdminConfig {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }
}

impl DatabaseConfig {
    /// In-memory store with default names, used by tests and local runs.
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let parsed = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Config {
            bind_addr: parsed("BIND_ADDR").unwrap_or(defaults.bind_addr),
            allowed_origins: parsed("ALLOWED_ORIGINS").unwrap_or(defaults.allowed_origins),
            trust_proxy_headers: parse_or(&lookup, "TRUST_PROXY_HEADERS", false),
            rate_limit: RateLimitSettings {
                petition: RateLimitConfig {
                    max_requests: parse_or(
                        &lookup,
                        "PETITION_MAX_REQUESTS",
                        defaults.rate_limit.petition.max_requests,
                    ),
                    window_secs: parse_or(
                        &lookup,
                        "PETITION_WINDOW_SECS",
                        defaults.rate_limit.petition.window_secs,
                    ),
                },
                api: RateLimitConfig {
                    max_requests: parse_or(
                        &lookup,
                        "API_MAX_REQUESTS",
                        defaults.rate_limit.api.max_requests,
                    ),
                    window_secs: parse_or(
                        &lookup,
                        "API_WINDOW_SECS",
                        defaults.rate_limit.api.window_secs,
                    ),
                },
                cleanup_interval_secs: parse_or(
                    &lookup,
                    "CLEANUP_INTERVAL_SECS",
                    defaults.rate_limit.cleanup_interval_secs,
                ),
            },
            admin: AdminConfig {
                username: parsed("ADMIN_USERNAME").unwrap_or(defaults.admin.username),
                password: parsed("ADMIN_PASSWORD"),
                password_hash: parsed("ADMIN_PASSWORD_HASH"),
                token_ttl_secs: parse_or(&lookup, "TOKEN_TTL_SECS", defaults.admin.token_ttl_secs),
            },
            database: DatabaseConfig {
                path: parsed("DB_PATH").unwrap_or(defaults.database.path),
                namespace: parsed("DB_NAMESPACE").unwrap_or(defaults.database.namespace),
                database: parsed("DB_NAME").unwrap_or(defaults.database.database),
                timeout_ms: parse_or(&lookup, "DB_TIMEOUT_MS", defaults.database.timeout_ms),
            },
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(key, value = %raw, "Unparseable configuration value, using default");
                default
            }
        },
        _ => default,
    }
}

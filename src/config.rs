// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the waitlist service.
//!
//! Values are layered: built-in defaults, then an optional config file
//! (`WAITLIST_CONFIG`, default `waitlist.toml`), then `WAITLIST_*`
//! environment variables using `__` as the section separator, e.g.
//! `WAITLIST_RATE_LIMIT__MAX_ATTEMPTS=5`.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Recognized social-platform domains when none are configured.
pub const DEFAULT_PROFILE_DOMAINS: &[&str] = &["facebook.com", "fb.com"];

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration for the waitlist service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Take the caller address from the first `X-Forwarded-For` hop.
    /// Only enable behind a proxy that sets the header.
    #[serde(default)]
    pub trust_forwarded_for: bool,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub validation: ValidationConfig,

    #[serde(default)]
    pub notifier: NotifierConfig,

    #[serde(default)]
    pub admin: AdminConfig,

    #[serde(default)]
    pub cors: CorsConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Relational store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// sqlx connection URL, or `memory` for the in-process store
    /// (default: sqlite://waitlist.db)
    #[serde(default = "default_database_url")]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Upper bound on a single store round-trip (default: 5000)
    #[serde(default = "default_store_timeout_ms")]
    pub timeout_ms: u64,
}

/// Per-source signup throttling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Attempts admitted per source within the window (default: 5)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Trailing window length in seconds (default: 900)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

/// Signup input validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Hosts accepted for the social profile URL; subdomains match too.
    #[serde(default = "default_profile_domains")]
    pub profile_domains: Vec<String>,
}

/// Welcome email delivery through a transactional mail HTTP API.
///
/// The notifier is disabled unless `api_url`, `api_key` and
/// `sender_email` are all set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    #[serde(default)]
    pub api_url: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub sender_email: Option<String>,

    #[serde(default)]
    pub sender_name: Option<String>,

    #[serde(default = "default_subject")]
    pub subject: String,

    #[serde(default = "default_notifier_timeout_ms")]
    pub timeout_ms: u64,
}

/// Operator login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default = "default_admin_username")]
    pub username: String,

    /// Argon2 PHC string. Admin login is refused while unset.
    #[serde(default)]
    pub password_hash: Option<String>,

    /// Sliding session lifetime (default: 86400)
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    #[serde(default = "default_max_attempts")]
    pub login_max_attempts: u32,

    #[serde(default = "default_window_secs")]
    pub login_window_secs: u64,
}

/// Cross-origin access for the landing page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins; `*` allows any origin (default: *)
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_database_url() -> String {
    "sqlite://waitlist.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_store_timeout_ms() -> u64 {
    5000
}

fn default_max_attempts() -> u32 {
    5
}

fn default_window_secs() -> u64 {
    15 * 60
}

fn default_profile_domains() -> Vec<String> {
    DEFAULT_PROFILE_DOMAINS
        .iter()
        .map(|d| d.to_string())
        .collect()
}

fn default_subject() -> String {
    "Welcome to the waitlist".to_string()
}

fn default_notifier_timeout_ms() -> u64 {
    10_000
}

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_session_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            trust_forwarded_for: false,
            database: DatabaseConfig::default(),
            rate_limit: RateLimitConfig::default(),
            validation: ValidationConfig::default(),
            notifier: NotifierConfig::default(),
            admin: AdminConfig::default(),
            cors: CorsConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            timeout_ms: default_store_timeout_ms(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            window_secs: default_window_secs(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            profile_domains: default_profile_domains(),
        }
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            api_key: None,
            sender_email: None,
            sender_name: None,
            subject: default_subject(),
            timeout_ms: default_notifier_timeout_ms(),
        }
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: default_admin_username(),
            password_hash: None,
            session_ttl_secs: default_session_ttl_secs(),
            login_max_attempts: default_max_attempts(),
            login_window_secs: default_window_secs(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl Config {
    /// Load configuration from the optional file and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("WAITLIST_CONFIG").unwrap_or_else(|_| "waitlist".to_string());

        let loaded: Config = config::Config::builder()
            .add_source(config::File::with_name(&path).required(false))
            .add_source(
                config::Environment::with_prefix("WAITLIST")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("validation.profile_domains")
                    .with_list_parse_key("cors.allowed_origins"),
            )
            .build()?
            .try_deserialize()?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit.max_attempts == 0 || self.rate_limit.window_secs == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit.max_attempts and rate_limit.window_secs must be positive".into(),
            ));
        }
        if self.admin.login_max_attempts == 0 || self.admin.login_window_secs == 0 {
            return Err(ConfigError::Invalid(
                "admin.login_max_attempts and admin.login_window_secs must be positive".into(),
            ));
        }
        if self.admin.session_ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "admin.session_ttl_secs must be positive".into(),
            ));
        }
        if self.validation.profile_domains.iter().all(|d| d.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "validation.profile_domains must name at least one domain".into(),
            ));
        }
        if let Some(hash) = &self.admin.password_hash {
            argon2::PasswordHash::new(hash).map_err(|e| {
                ConfigError::Invalid(format!("admin.password_hash is not a PHC string: {e}"))
            })?;
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl DatabaseConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl RateLimitConfig {
    /// Get the rate window duration
    pub fn window_duration(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl NotifierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// True when every field needed to reach the mail API is present.
    pub fn is_configured(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.api_url) && present(&self.api_key) && present(&self.sender_email)
    }
}

impl AdminConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Login throttling reuses the signup limiter shape.
    pub fn login_rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_attempts: self.login_max_attempts,
            window_secs: self.login_window_secs,
        }
    }
}

// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Handles environment variables, deployment modes, and runtime configuration parsing
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Environment-based configuration management for production deployment

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Default CSRF token lifetime in seconds (1 hour)
pub const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;

/// Default issuance rate limit (requests per window per client)
pub const DEFAULT_ISSUANCE_LIMIT: u32 = 100;

/// Default validation rate limit (requests per window per client)
pub const DEFAULT_VALIDATION_LIMIT: u32 = 50;

/// Default fixed-window length in seconds
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Environment type gating allow-list selection and cookie attributes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development: localhost origins permitted, no Secure cookies
    #[default]
    Development,
    /// Production: explicit allow-lists only, Secure cookies emitted
    Production,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// CSRF token and cookie configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsrfConfig {
    /// Token lifetime in seconds
    pub token_lifetime_secs: u64,
    /// Cookie name carrying the double-submit token
    pub cookie_name: String,
    /// Header name carrying the double-submit token
    pub header_name: String,
    /// Cookie Domain attribute, emitted in production only
    pub cookie_domain: Option<String>,
    /// Path prefixes exempt from CSRF validation (issuance endpoints,
    /// health checks)
    pub exempt_paths: Vec<String>,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            token_lifetime_secs: DEFAULT_TOKEN_LIFETIME_SECS,
            cookie_name: "__Host-csrf-token".into(),
            header_name: "x-csrf-token".into(),
            cookie_domain: None,
            exempt_paths: vec![
                "/csrf/token".into(),
                "/uuid/generate".into(),
                "/health".into(),
                "/ready".into(),
            ],
        }
    }
}

impl CsrfConfig {
    /// Token lifetime as a [`Duration`]
    #[must_use]
    pub const fn token_lifetime(&self) -> Duration {
        Duration::from_secs(self.token_lifetime_secs)
    }
}

/// Fixed-window rate limit settings for both limiter instances
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Max token-issuance requests per window per client
    pub issuance_max: u32,
    /// Max token-validation attempts per window per client
    pub validation_max: u32,
    /// Fixed-window length in seconds
    pub window_secs: u64,
    /// Map size past which stale-entry cleanup runs
    pub cleanup_threshold: usize,
    /// Age in seconds after which an idle counter is evictable
    pub stale_entry_timeout_secs: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            issuance_max: DEFAULT_ISSUANCE_LIMIT,
            validation_max: DEFAULT_VALIDATION_LIMIT,
            window_secs: DEFAULT_RATE_LIMIT_WINDOW_SECS,
            cleanup_threshold: 10_000,
            stale_entry_timeout_secs: 600,
        }
    }
}

impl RateLimitSettings {
    /// Window length as a [`Duration`]
    #[must_use]
    pub const fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// CORS and origin-validation configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Explicit origin allow-list (exact string match). Empty in
    /// development means localhost origins are accepted instead.
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    /// Parse a comma-separated origin list, dropping empty entries
    #[must_use]
    pub fn parse_origins(raw: &str) -> Vec<String> {
        raw.split(',')
            .filter_map(|s| {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.trim_end_matches('/').to_owned())
                }
            })
            .collect()
    }
}

/// Upstream UUID-issuance endpoint configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpstreamUuidConfig {
    /// Base URL of the trusted issuance service; `None` disables the
    /// network path entirely (local generation only)
    pub url: Option<String>,
    /// Bearer token presented to the upstream service
    pub bearer_token: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Delay before the single retry after an upstream 429, milliseconds
    pub retry_delay_ms: u64,
}

impl UpstreamUuidConfig {
    /// Request timeout as a [`Duration`]
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Retry delay as a [`Duration`]
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Whether the network issuance path is configured at all
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.url.is_some() && self.bearer_token.is_some()
    }
}

/// Complete server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Deployment environment
    pub environment: Environment,
    /// HTTP listen port
    pub http_port: u16,
    /// CSRF token and cookie settings
    pub csrf: CsrfConfig,
    /// Rate limiter settings
    pub rate_limits: RateLimitSettings,
    /// Origin allow-list settings
    pub cors: CorsConfig,
    /// Upstream UUID issuance settings
    pub upstream_uuid: UpstreamUuidConfig,
    /// Bearer token required by the UUID issuance endpoint
    pub uuid_api_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            http_port: 8080,
            csrf: CsrfConfig::default(),
            rate_limits: RateLimitSettings::default(),
            cors: CorsConfig::default(),
            upstream_uuid: UpstreamUuidConfig {
                url: None,
                bearer_token: None,
                timeout_secs: 5,
                retry_delay_ms: 250,
            },
            uuid_api_token: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable is present but unparseable.
    pub fn from_env() -> Result<Self> {
        let environment =
            Environment::from_str_or_default(&env::var("ENVIRONMENT").unwrap_or_default());

        let http_port = parse_env_or("HTTP_PORT", 8080)?;

        let mut csrf = CsrfConfig {
            token_lifetime_secs: parse_env_or("CSRF_TOKEN_LIFETIME_SECS", DEFAULT_TOKEN_LIFETIME_SECS)?,
            ..CsrfConfig::default()
        };
        csrf.cookie_domain = env::var("CSRF_COOKIE_DOMAIN").ok().filter(|d| !d.is_empty());

        let rate_limits = RateLimitSettings {
            issuance_max: parse_env_or("RATE_LIMIT_ISSUANCE_MAX", DEFAULT_ISSUANCE_LIMIT)?,
            validation_max: parse_env_or("RATE_LIMIT_VALIDATION_MAX", DEFAULT_VALIDATION_LIMIT)?,
            window_secs: parse_env_or("RATE_LIMIT_WINDOW_SECS", DEFAULT_RATE_LIMIT_WINDOW_SECS)?,
            ..RateLimitSettings::default()
        };

        let cors = CorsConfig {
            allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .map(|raw| CorsConfig::parse_origins(&raw))
                .unwrap_or_default(),
        };

        let upstream_uuid = UpstreamUuidConfig {
            url: env::var("UUID_UPSTREAM_URL").ok().filter(|u| !u.is_empty()),
            bearer_token: env::var("UUID_UPSTREAM_TOKEN")
                .ok()
                .filter(|t| !t.is_empty()),
            timeout_secs: parse_env_or("UUID_UPSTREAM_TIMEOUT_SECS", 5)?,
            retry_delay_ms: parse_env_or("UUID_UPSTREAM_RETRY_DELAY_MS", 250)?,
        };

        let uuid_api_token = env::var("UUID_API_TOKEN").ok().filter(|t| !t.is_empty());

        Ok(Self {
            environment,
            http_port,
            csrf,
            rate_limits,
            cors,
            upstream_uuid,
            uuid_api_token,
        })
    }

    /// Check if this is a production deployment
    #[must_use]
    pub const fn is_production(&self) -> bool {
        self.environment.is_production()
    }
}

/// Parse an environment variable, falling back to a default when unset
fn parse_env_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {name}: {raw}")),
        Err(_) => Ok(default),
    }
}

//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables.
//!
//! See [`ProviderConfig`](authgate_platform_access::ProviderConfig) for
//! identity provider configuration.

use authgate_platform_access::{CatalogError, ProviderConfig, SourceCatalog};
use serde::{Deserialize, Deserializer};

/// Longest rolling session lifetime accepted, in days.
pub const MAX_SESSION_AGE_DAYS: i64 = 3650;

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// PostgreSQL database connection URL.
    /// Only required by the `postgres` session backend.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Address to listen on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Public origin of this deployment (e.g. "https://nextstrain.org").
    /// Used for the OAuth2 callback URL, Referer checks and logout.
    pub public_origin: String,

    /// Directory served to requests that pass the gate.
    #[serde(default = "default_content_dir")]
    pub content_dir: String,

    /// Session configuration.
    #[serde(default)]
    pub session: SessionConfig,

    /// Identity provider configuration.
    pub provider: ProviderConfig,

    /// Source catalog configuration.
    #[serde(default)]
    pub catalog: CatalogConfig,
}

fn default_bind_addr() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_content_dir() -> String {
    "public".to_string()
}

/// Where session records are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    /// Shared, durable PostgreSQL table.
    Postgres,
    /// Process memory; lost on restart.
    Memory,
}

/// Session-related configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Name of the session cookie.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Rolling session lifetime in days, from 1 to [`MAX_SESSION_AGE_DAYS`].
    #[serde(
        default = "default_max_age_days",
        deserialize_with = "deserialize_max_age_days"
    )]
    pub max_age_days: i64,

    /// Interval between expired-session sweeps, in seconds.
    #[serde(default = "default_cleanup_interval_seconds")]
    pub cleanup_interval_seconds: u64,

    /// Whether to set the Secure flag on cookies (requires HTTPS).
    /// Defaults to true for production safety; set to false for local HTTP development.
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,

    /// Session storage backend.
    #[serde(default = "default_backend")]
    pub backend: SessionBackend,
}

fn default_cookie_name() -> String {
    "authgate".to_string()
}

fn default_max_age_days() -> i64 {
    30
}

fn deserialize_max_age_days<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let days = i64::deserialize(deserializer)?;
    if !(1..=MAX_SESSION_AGE_DAYS).contains(&days) {
        return Err(serde::de::Error::custom(format!(
            "session max_age_days must be between 1 and {MAX_SESSION_AGE_DAYS}, got {days}"
        )));
    }
    Ok(days)
}

fn default_cleanup_interval_seconds() -> u64 {
    3600
}

fn default_secure_cookies() -> bool {
    true
}

fn default_backend() -> SessionBackend {
    SessionBackend::Postgres
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            max_age_days: default_max_age_days(),
            cleanup_interval_seconds: default_cleanup_interval_seconds(),
            secure_cookies: default_secure_cookies(),
            backend: default_backend(),
        }
    }
}

impl SessionConfig {
    /// Returns the rolling session lifetime.
    #[must_use]
    pub fn max_age(&self) -> chrono::Duration {
        chrono::Duration::days(self.max_age_days)
    }
}

/// Source catalog configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogConfig {
    /// Comma-separated source specs: `name`, `name=*` or `name=g1|g2`.
    #[serde(default)]
    pub sources: String,
}

impl CatalogConfig {
    /// Parses the configured sources.
    ///
    /// # Errors
    ///
    /// Returns an error if any source spec is malformed.
    pub fn catalog(&self) -> Result<SourceCatalog, CatalogError> {
        SourceCatalog::parse_list(&self.sources)
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_environment(config::Environment::default())
    }

    fn from_environment(environment: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(environment.separator("__").try_parsing(true))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_config_has_correct_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.cookie_name, "authgate");
        assert_eq!(config.max_age_days, 30);
        assert_eq!(config.max_age(), chrono::Duration::days(30));
        assert_eq!(config.cleanup_interval_seconds, 3600);
        assert!(config.secure_cookies);
        assert_eq!(config.backend, SessionBackend::Postgres);
    }

    #[test]
    fn server_config_deserializes_with_defaults() {
        let json = r#"{
            "public_origin": "https://nextstrain.org",
            "provider": {
                "base_url": "https://login.nextstrain.org",
                "client_id": "client",
                "user_pool_id": "us-east-1_Cg5rcTged"
            },
            "session": { "backend": "memory", "secure_cookies": false },
            "catalog": { "sources": "community,groups/blab=blab" }
        }"#;

        let config: ServerConfig = serde_json::from_str(json).expect("deserialize");

        assert!(config.database_url.is_none());
        assert_eq!(config.bind_addr, "127.0.0.1:5000");
        assert_eq!(config.content_dir, "public");
        assert_eq!(config.session.backend, SessionBackend::Memory);
        assert!(!config.session.secure_cookies);
        assert_eq!(config.session.max_age_days, 30);
        assert_eq!(
            config.catalog.catalog().expect("catalog").non_public_paths().prefixes(),
            ["/groups/blab".to_string()]
        );
    }

    fn environment(vars: &[(&str, &str)]) -> config::Environment {
        let mut map = config::Map::new();
        for (name, value) in [
            ("PUBLIC_ORIGIN", "https://nextstrain.org"),
            ("PROVIDER__BASE_URL", "https://login.nextstrain.org"),
            ("PROVIDER__CLIENT_ID", "client"),
            ("PROVIDER__USER_POOL_ID", "us-east-1_Cg5rcTged"),
        ]
        .iter()
        .chain(vars)
        {
            map.insert(name.to_string(), value.to_string());
        }
        config::Environment::default().source(Some(map))
    }

    #[test]
    fn environment_overrides_session_settings() {
        let config = ServerConfig::from_environment(environment(&[
            ("SESSION__MAX_AGE_DAYS", "7"),
            ("SESSION__BACKEND", "memory"),
        ]))
        .expect("valid config");

        assert_eq!(config.public_origin, "https://nextstrain.org");
        assert_eq!(config.session.max_age(), chrono::Duration::days(7));
        assert_eq!(config.session.backend, SessionBackend::Memory);
    }

    #[test]
    fn session_lifetime_must_be_in_range() {
        for days in ["0", "-3", "3651", "9223372036854775807"] {
            let result =
                ServerConfig::from_environment(environment(&[("SESSION__MAX_AGE_DAYS", days)]));
            assert!(result.is_err(), "{days}");
        }

        for days in [1, MAX_SESSION_AGE_DAYS] {
            let json = format!(r#"{{ "max_age_days": {days} }}"#);
            let config: SessionConfig = serde_json::from_str(&json).expect("in range");
            assert_eq!(config.max_age(), chrono::Duration::days(days));
        }
        assert!(serde_json::from_str::<SessionConfig>(r#"{ "max_age_days": 0 }"#).is_err());
    }
}

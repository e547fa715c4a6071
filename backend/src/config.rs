//! Application configuration loaded via OrthoConfig.
//!
//! Values merge from CLI arguments, `CATALOG_`-prefixed environment
//! variables, and configuration files, in OrthoConfig's usual precedence
//! order.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::Error;

/// Default lifetime of cached lookup responses, in milliseconds.
const DEFAULT_CACHE_TTL_MS: u64 = 60 * 60 * 1000;
/// Default import-worker idle poll interval, in seconds.
const DEFAULT_WORKER_POLL_SECS: u64 = 5;
/// Default database pool size.
const DEFAULT_DB_POOL_SIZE: u32 = 10;

/// Runtime settings for the catalog services and the import worker.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "CATALOG")]
pub struct AppConfig {
    /// PostgreSQL connection URL.
    pub database_url: Option<String>,
    /// Redis connection URL for the lookup cache.
    pub redis_url: Option<String>,
    /// Lifetime of cached lookup responses, in milliseconds.
    #[ortho_config(default = 3_600_000)]
    pub cache_ttl_ms: u64,
    /// Import-worker idle poll interval, in seconds.
    #[ortho_config(default = 5)]
    pub worker_poll_secs: u64,
    /// Maximum database pool size.
    #[ortho_config(default = 10)]
    pub db_pool_size: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            redis_url: None,
            cache_ttl_ms: DEFAULT_CACHE_TTL_MS,
            worker_poll_secs: DEFAULT_WORKER_POLL_SECS,
            db_pool_size: DEFAULT_DB_POOL_SIZE,
        }
    }
}

impl AppConfig {
    /// Database URL, required for any persistence-backed process.
    ///
    /// # Errors
    ///
    /// Returns a `MissingParameter` error when no URL is configured.
    pub fn require_database_url(&self) -> Result<&str, Error> {
        self.database_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| Error::missing_parameter("CATALOG_DATABASE_URL is required"))
    }

    /// Redis URL, required for the Redis-backed lookup cache.
    ///
    /// # Errors
    ///
    /// Returns a `MissingParameter` error when no URL is configured.
    pub fn require_redis_url(&self) -> Result<&str, Error> {
        self.redis_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| Error::missing_parameter("CATALOG_REDIS_URL is required"))
    }

    /// Cache lifetime as a [`Duration`].
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    /// Worker idle poll interval as a [`Duration`].
    #[must_use]
    pub const fn worker_poll_interval(&self) -> Duration {
        Duration::from_secs(self.worker_poll_secs)
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for configuration parsing and accessors.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    fn load_from_empty_args() -> AppConfig {
        AppConfig::load_from_iter([OsString::from("backend")]).expect("config should load")
    }

    #[rstest]
    fn defaults_apply_without_environment() {
        let _guard = lock_env([
            ("CATALOG_DATABASE_URL", None::<&str>),
            ("CATALOG_REDIS_URL", None),
            ("CATALOG_CACHE_TTL_MS", None),
        ]);
        let config = load_from_empty_args();

        assert_eq!(config.cache_ttl(), Duration::from_secs(3600));
        assert_eq!(config.worker_poll_interval(), Duration::from_secs(5));
        assert_eq!(config.db_pool_size, 10);
        assert!(config.require_database_url().is_err());
        assert!(config.require_redis_url().is_err());
    }

    #[rstest]
    fn environment_overrides_defaults() {
        let _guard = lock_env([
            ("CATALOG_DATABASE_URL", Some("postgres://localhost/catalog")),
            ("CATALOG_REDIS_URL", Some("redis://localhost:6379")),
            ("CATALOG_CACHE_TTL_MS", Some("60000")),
        ]);
        let config = load_from_empty_args();

        assert_eq!(
            config.require_database_url().expect("configured"),
            "postgres://localhost/catalog"
        );
        assert_eq!(
            config.require_redis_url().expect("configured"),
            "redis://localhost:6379"
        );
        assert_eq!(config.cache_ttl(), Duration::from_secs(60));
    }

    #[rstest]
    fn blank_urls_are_treated_as_missing() {
        let config = AppConfig {
            database_url: Some("  ".to_owned()),
            ..AppConfig::default()
        };
        assert!(config.require_database_url().is_err());
    }
}

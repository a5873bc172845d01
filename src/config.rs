//! Process configuration for the orchestration core.
//!
//! Defaults first, environment overrides second. There is no configuration
//! file layer: the deployments this core targets inject settings through
//! the environment.

use crate::error::{CoreError, Result};

/// Top-level configuration handed to [`crate::database::DatabaseConnection`]
/// and [`crate::resilience::RetryExecutor`].
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub database: DatabaseConfig,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_ms: u64,
}

/// Bounds for the transactional retry executor.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/geopipe_development".to_string(),
            max_connections: 10,
            acquire_timeout_ms: 5_000,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_ms: 100,
            backoff_max_ms: 10_000,
        }
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl CoreConfig {
    /// Build a configuration from defaults plus environment overrides.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database.url = url;
        }

        if let Ok(max) = std::env::var("GEOPIPE_MAX_CONNECTIONS") {
            config.database.max_connections = max.parse().map_err(|e| {
                CoreError::configuration(format!("invalid GEOPIPE_MAX_CONNECTIONS: {e}"))
            })?;
        }

        if let Ok(timeout) = std::env::var("GEOPIPE_ACQUIRE_TIMEOUT_MS") {
            config.database.acquire_timeout_ms = timeout.parse().map_err(|e| {
                CoreError::configuration(format!("invalid GEOPIPE_ACQUIRE_TIMEOUT_MS: {e}"))
            })?;
        }

        if let Ok(attempts) = std::env::var("GEOPIPE_RETRY_MAX_ATTEMPTS") {
            config.retry.max_attempts = attempts.parse().map_err(|e| {
                CoreError::configuration(format!("invalid GEOPIPE_RETRY_MAX_ATTEMPTS: {e}"))
            })?;
        }

        if let Ok(base) = std::env::var("GEOPIPE_BACKOFF_BASE_MS") {
            config.retry.backoff_base_ms = base.parse().map_err(|e| {
                CoreError::configuration(format!("invalid GEOPIPE_BACKOFF_BASE_MS: {e}"))
            })?;
        }

        if let Ok(max) = std::env::var("GEOPIPE_BACKOFF_MAX_MS") {
            config.retry.backoff_max_ms = max.parse().map_err(|e| {
                CoreError::configuration(format!("invalid GEOPIPE_BACKOFF_MAX_MS: {e}"))
            })?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = CoreConfig::default();
        assert_eq!(config.retry.max_attempts, 3);
        assert!(config.retry.backoff_base_ms < config.retry.backoff_max_ms);
        assert!(config.database.max_connections > 0);
    }

    #[test]
    fn env_overrides_and_rejects_garbage() {
        std::env::set_var("GEOPIPE_RETRY_MAX_ATTEMPTS", "7");
        let config = CoreConfig::from_env().unwrap();
        assert_eq!(config.retry.max_attempts, 7);

        std::env::set_var("GEOPIPE_RETRY_MAX_ATTEMPTS", "not-a-number");
        let err = CoreConfig::from_env().unwrap_err();
        assert!(matches!(err, CoreError::Configuration { .. }));

        std::env::remove_var("GEOPIPE_RETRY_MAX_ATTEMPTS");
    }
}

//! Postgres connection pool construction and schema migration.
//!
//! The pool is the explicitly constructed session object every component
//! receives by reference; there is no process-wide implicit provider.

use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::error::{classify_storage_error, CoreError, Result};

pub struct DatabaseConnection {
    pool: PgPool,
}

impl DatabaseConnection {
    /// Build a connection pool from the given configuration.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_millis(config.acquire_timeout_ms))
            .connect(&config.url)
            .await
            .map_err(|e| classify_storage_error("DatabaseConnect", e))?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the embedded schema migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| CoreError::operation("RunMigrations", e.to_string()))
    }

    pub async fn health_check(&self) -> Result<bool> {
        let row = sqlx::query("SELECT 1 AS health")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify_storage_error("HealthCheck", e))?;

        let health: i32 = row
            .try_get("health")
            .map_err(|e| classify_storage_error("HealthCheck", e))?;
        Ok(health == 1)
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

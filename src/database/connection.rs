use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::{LeadflowError, Result};

/// Migrator for every table the PostgreSQL store reads and writes
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Build a connection pool from configuration
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    info!(
        url_prefix = %config.url.chars().take(30).collect::<String>(),
        max_connections = config.max_connections,
        "Connecting to database"
    );

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout())
        .connect(&config.url)
        .await
        .map_err(|e| {
            LeadflowError::DatabaseError(format!("Failed to connect to database with config: {e}"))
        })
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    info!("Running leadflow migrations");
    MIGRATOR.run(pool).await?;
    info!("Migrations complete");
    Ok(())
}

pub struct DatabaseConnection {
    pool: PgPool,
}

impl DatabaseConnection {
    /// Connect and, when configured, bring the schema up to date
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let pool = connect(config).await?;
        if config.run_migrations {
            run_migrations(&pool).await?;
        }
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<bool> {
        let row = sqlx::query("SELECT 1 AS health")
            .fetch_one(&self.pool)
            .await?;

        let health: i32 = row.try_get("health")?;
        Ok(health == 1)
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

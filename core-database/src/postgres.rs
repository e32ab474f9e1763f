// =====================================================================================
// File: core-database/src/postgres.rs
// Description: PostgreSQL connection pool management
// Author: arkSong (arksong2018@gmail.com)
// =====================================================================================

use crate::DatabaseError;
use core_config::DatabaseConfig;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::info;

/// Create a PostgreSQL connection pool from configuration
pub async fn create_pool(config: &DatabaseConfig) -> Result<Pool<Postgres>, DatabaseError> {
    info!(
        max_connections = config.max_connections,
        "Creating PostgreSQL connection pool"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout))
        .idle_timeout(Duration::from_secs(config.idle_timeout))
        .connect(&config.url)
        .await
        .map_err(|e| DatabaseError::Connection(e.to_string()))?;

    Ok(pool)
}

/// Health check for the pool
pub async fn health_check(pool: &Pool<Postgres>) -> Result<(), DatabaseError> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(DatabaseError::from)?;
    Ok(())
}

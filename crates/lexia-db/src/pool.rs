//! Connection pool setup for the record store.

use lexia_core::AppError;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// Connect to the record store.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(database_url)
        .await?;

    tracing::info!(max_connections, "Connected to record store");

    Ok(pool)
}

/// Apply the logical schema. Idempotent.
pub async fn apply_schema(pool: &PgPool) -> Result<(), AppError> {
    for statement in crate::SCHEMA_SQL.split(';') {
        // Skip fragments that hold nothing but whitespace and comments.
        let has_sql = statement
            .lines()
            .map(str::trim)
            .any(|l| !l.is_empty() && !l.starts_with("--"));
        if !has_sql {
            continue;
        }
        sqlx::query(statement.trim()).execute(pool).await?;
    }
    Ok(())
}

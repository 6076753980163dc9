use anyhow::{anyhow, Context, Result};
use sqlx::{pool::PoolConnection, postgres::PgPoolOptions, PgPool, Postgres};

use crate::config::Config;
use crate::error::{AppError, AppResult};

pub async fn connect_to_db(config: &Config) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("Failed to run database migrations")?;
    Ok(())
}

pub async fn acquire(pool: &PgPool) -> AppResult<PoolConnection<Postgres>> {
    pool.acquire().await.map_err(|e| {
        tracing::error!(error = %e, "failed to acquire database connection");
        AppError::InternalServerError(anyhow!(
            "Failed to acquire database connection: {}",
            e
        ))
    })
}

pub async fn begin(pool: &PgPool) -> AppResult<sqlx::Transaction<'static, Postgres>> {
    pool.begin().await.map_err(|e| {
        tracing::error!(error = %e, "failed to start transaction");
        AppError::InternalServerError(anyhow!("Database transaction failed: {}", e))
    })
}

pub async fn commit(tx: sqlx::Transaction<'static, Postgres>) -> AppResult<()> {
    tx.commit().await.map_err(|e| {
        tracing::error!(error = %e, "failed to commit transaction");
        AppError::InternalServerError(anyhow!("Database commit failed: {}", e))
    })
}

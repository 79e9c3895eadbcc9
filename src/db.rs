use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use crate::config::AppConfig;

/// Opens the pool and brings the schema up to date. A failed migration aborts startup.
pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let db = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("run migrations")?;
    info!("database ready");

    Ok(db)
}

/// Migrated pool for tests that need a real database. `None` (test skipped)
/// when `DATABASE_URL` is unset.
#[cfg(test)]
pub(crate) async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping Postgres test");
        return None;
    };
    let config = AppConfig {
        database_url,
        max_connections: 2,
        ..AppConfig::for_tests()
    };
    Some(connect(&config).await.expect("connect to test database"))
}

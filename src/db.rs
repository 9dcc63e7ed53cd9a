use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .context("connect to database")
}

/// Applies embedded migrations. Failure is logged, not fatal.
pub async fn migrate(db: &PgPool) {
    match sqlx::migrate!("./migrations").run(db).await {
        Ok(()) => tracing::info!("migrations applied"),
        Err(e) => tracing::warn!(error = %e, "migration failed; continuing"),
    }
}

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Connects the session/audit pool. Interview turns run two to three
/// queries each, so a small pool is enough; the size is configurable
/// through `DB_MAX_CONNECTIONS`.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    info!(max_connections, "PostgreSQL connection pool established");
    Ok(pool)
}

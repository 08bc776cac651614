//! Database pool and migrations.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Create a pool for `database_url` and run migrations.
pub async fn create_pool_and_migrate(
    database_url: &str,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

/// Run embedded migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

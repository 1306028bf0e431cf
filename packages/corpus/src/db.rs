use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool};

use crate::config::CorpusConfig;
use crate::error::Result;

pub async fn create_pool(config: &CorpusConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Serialize writers on `key` until the surrounding transaction ends.
///
/// Keys are namespaced strings such as `scrape:<url>:<source_id>`; the lock is
/// released automatically on commit or rollback.
pub(crate) async fn lock_key(conn: &mut PgConnection, key: &str) -> Result<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(key)
        .execute(conn)
        .await?;

    tracing::debug!(key = %key, "acquired advisory lock");
    Ok(())
}

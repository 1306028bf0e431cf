//! Source registry.
//!
//! A source is superseded (never deleted) when its settings change; the new
//! version takes over the scrapes of the old one so that scrape versions stay
//! monotonic per URL.

use serde_json::{json, Map, Value};
use sqlx::PgPool;

use crate::db::lock_key;
use crate::error::{conflict_on_unique, CorpusError, Result};
use crate::models::Source;

/// User agent announced by the fetch collaborator unless configured otherwise.
pub const DEFAULT_USER_AGENT: &str = "afs-corpus/0.1";

/// Settings every source starts from.
pub fn default_settings() -> Value {
    json!({
        "enabled": true,
        "scrape_frequency": "daily",
        "user_agent": DEFAULT_USER_AGENT,
        "timeout": 30,
        "language": "sv-SE",
    })
}

/// Overlay `overrides` on `base`, key by key.
pub fn merge_settings(base: &Value, overrides: &Value) -> Result<Value> {
    let Some(overrides) = overrides.as_object() else {
        return Err(CorpusError::InvalidInput(
            "source settings must be a JSON object".into(),
        ));
    };

    let mut merged: Map<String, Value> = base.as_object().cloned().unwrap_or_default();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    Ok(Value::Object(merged))
}

/// Source URLs must be absolute http(s) URLs.
pub fn validate_source_url(raw: &str) -> Result<()> {
    let parsed = url::Url::parse(raw)
        .map_err(|e| CorpusError::InvalidInput(format!("invalid source url '{raw}': {e}")))?;

    match parsed.scheme() {
        "http" | "https" if parsed.host().is_some() => Ok(()),
        scheme => Err(CorpusError::InvalidInput(format!(
            "invalid source url '{raw}': unsupported scheme '{scheme}'"
        ))),
    }
}

/// Register a new source. Fails with `DuplicateKey` if a current source for
/// the URL already exists.
#[tracing::instrument(skip(pool, settings))]
pub async fn create_source(pool: &PgPool, url: &str, settings: Option<&Value>) -> Result<Source> {
    validate_source_url(url)?;
    let settings = match settings {
        Some(overrides) => merge_settings(&default_settings(), overrides)?,
        None => default_settings(),
    };

    let mut tx = pool.begin().await?;
    lock_key(&mut tx, &format!("source:{url}")).await?;

    if current_source(&mut *tx, url).await?.is_some() {
        return Err(CorpusError::DuplicateKey(format!("current source for {url}")));
    }

    let next_version: i32 =
        sqlx::query_scalar(r#"SELECT COALESCE(MAX(version), 0) + 1 FROM sources WHERE url = $1"#)
            .bind(url)
            .fetch_one(&mut *tx)
            .await?;

    let source = sqlx::query_as::<_, Source>(
        r#"
        INSERT INTO sources (url, settings, version)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(url)
    .bind(&settings)
    .bind(next_version)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            CorpusError::DuplicateKey(format!("current source for {url}"))
        }
        _ => CorpusError::Database(e),
    })?;

    tx.commit().await?;

    tracing::info!(source_id = source.id, version = source.version, "source created");
    Ok(source)
}

/// Supersede the current source for `url` with a new version carrying the
/// merged settings. Existing scrapes move to the new version.
#[tracing::instrument(skip(pool, settings))]
pub async fn update_source_settings(pool: &PgPool, url: &str, settings: &Value) -> Result<Source> {
    let mut tx = pool.begin().await?;
    lock_key(&mut tx, &format!("source:{url}")).await?;

    let previous = current_source(&mut *tx, url)
        .await?
        .ok_or_else(|| CorpusError::NotFound(format!("source {url}")))?;
    let merged = merge_settings(&previous.settings, settings)?;

    sqlx::query(
        r#"
        UPDATE sources
        SET current = FALSE, superseded_at = now(), updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(previous.id)
    .execute(&mut *tx)
    .await?;

    let source = sqlx::query_as::<_, Source>(
        r#"
        INSERT INTO sources (url, settings, version)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(url)
    .bind(&merged)
    .bind(previous.version + 1)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| conflict_on_unique(e, || format!("source {url}")))?;

    sqlx::query(r#"UPDATE scrapes SET source_id = $2 WHERE source_id = $1"#)
        .bind(previous.id)
        .bind(source.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(
        source_id = source.id,
        superseded = previous.id,
        version = source.version,
        "source settings updated"
    );
    Ok(source)
}

/// Get a source by ID, current or historical.
pub async fn get_source<'e, E>(executor: E, source_id: i64) -> Result<Source>
where
    E: sqlx::PgExecutor<'e>,
{
    let source = sqlx::query_as::<_, Source>(r#"SELECT * FROM sources WHERE id = $1"#)
        .bind(source_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| CorpusError::NotFound(format!("source {source_id}")))?;

    Ok(source)
}

/// The current source for a URL, if any.
pub async fn current_source<'e, E>(executor: E, url: &str) -> Result<Option<Source>>
where
    E: sqlx::PgExecutor<'e>,
{
    let source =
        sqlx::query_as::<_, Source>(r#"SELECT * FROM sources WHERE url = $1 AND current"#)
            .bind(url)
            .fetch_optional(executor)
            .await?;

    Ok(source)
}

/// All current sources, ordered by URL.
pub async fn list_current_sources<'e, E>(executor: E) -> Result<Vec<Source>>
where
    E: sqlx::PgExecutor<'e>,
{
    let sources =
        sqlx::query_as::<_, Source>(r#"SELECT * FROM sources WHERE current ORDER BY url"#)
            .fetch_all(executor)
            .await?;

    Ok(sources)
}

/// Every version of the source for a URL, oldest first.
pub async fn source_versions<'e, E>(executor: E, url: &str) -> Result<Vec<Source>>
where
    E: sqlx::PgExecutor<'e>,
{
    let sources =
        sqlx::query_as::<_, Source>(r#"SELECT * FROM sources WHERE url = $1 ORDER BY version"#)
            .bind(url)
            .fetch_all(executor)
            .await?;

    Ok(sources)
}

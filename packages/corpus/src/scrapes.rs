//! Scrape revisions.
//!
//! At most one scrape is current per (url, source). A fetch with new content
//! supersedes the current scrape and its elements and creates the next
//! version; a fetch with identical content changes nothing.

use afs_harvester::DocumentMetadata;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::{PgConnection, PgPool};

use crate::db::lock_key;
use crate::error::{conflict_on_unique, CorpusError, Result};
use crate::models::Scrape;

/// SHA-256 of the raw HTML, hex encoded.
pub fn content_hash(raw_html: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_html.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub struct NewScrape {
    pub source_id: i64,
    pub url: String,
    pub raw_html: String,
    pub fetched_at: DateTime<Utc>,
    pub title: Option<String>,
    pub plain_text: Option<String>,
}

impl NewScrape {
    pub fn new(
        source_id: i64,
        url: impl Into<String>,
        raw_html: impl Into<String>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            source_id,
            url: url.into(),
            raw_html: raw_html.into(),
            fetched_at,
            title: None,
            plain_text: None,
        }
    }

    pub fn with_metadata(mut self, metadata: &DocumentMetadata) -> Self {
        self.title = metadata.title.clone();
        self.plain_text = Some(metadata.plain_text.clone());
        self
    }
}

/// What [`record_scrape`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevisionOutcome {
    /// First scrape for the (url, source) key.
    Created,
    /// Content changed; the previous current scrape was superseded.
    Superseded { previous_id: i64 },
    /// Content identical to the current scrape; nothing was written.
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct ScrapeRevision {
    /// The current scrape after the operation.
    pub scrape: Scrape,
    pub outcome: RevisionOutcome,
}

impl ScrapeRevision {
    /// A new version was written and needs indexing.
    pub fn is_new(&self) -> bool {
        self.outcome != RevisionOutcome::Unchanged
    }
}

/// Record a fetched snapshot.
///
/// The compare-and-write runs in one transaction serialized per
/// (url, source) key, so two concurrent fetches cannot both create the next
/// version.
pub async fn record_scrape(pool: &PgPool, req: NewScrape) -> Result<ScrapeRevision> {
    let mut tx = pool.begin().await?;
    let revision = record_scrape_in(&mut tx, req).await?;
    tx.commit().await?;
    Ok(revision)
}

/// [`record_scrape`] inside the caller's transaction. The per-key lock is
/// held until that transaction ends.
#[tracing::instrument(skip(conn, req), fields(source_id = req.source_id, url = %req.url))]
pub(crate) async fn record_scrape_in(
    conn: &mut PgConnection,
    req: NewScrape,
) -> Result<ScrapeRevision> {
    let hash = content_hash(&req.raw_html);

    lock_key(conn, &format!("scrape:{}:{}", req.url, req.source_id)).await?;

    let previous = current_scrape(&mut *conn, req.source_id, &req.url).await?;

    if let Some(previous) = &previous {
        if previous.content_hash == hash && previous.raw_html == req.raw_html {
            tracing::info!(
                scrape_id = previous.id,
                version = previous.version,
                "content unchanged, keeping current scrape"
            );
            return Ok(ScrapeRevision {
                scrape: previous.clone(),
                outcome: RevisionOutcome::Unchanged,
            });
        }

        sqlx::query(
            r#"
            UPDATE scrapes
            SET current = FALSE, superseded_at = now(), updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(previous.id)
        .execute(&mut *conn)
        .await?;

        let historical = sqlx::query(
            r#"
            UPDATE elements
            SET current = FALSE, superseded_at = now()
            WHERE scrape_id = $1 AND current
            "#,
        )
        .bind(previous.id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

        tracing::debug!(scrape_id = previous.id, elements = historical, "scrape superseded");
    }

    let version = previous.as_ref().map_or(1, |p| p.version + 1);

    let scrape = sqlx::query_as::<_, Scrape>(
        r#"
        INSERT INTO scrapes (source_id, url, title, raw_html, plain_text, content_hash, fetched_at, version)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(req.source_id)
    .bind(&req.url)
    .bind(&req.title)
    .bind(&req.raw_html)
    .bind(&req.plain_text)
    .bind(&hash)
    .bind(req.fetched_at)
    .bind(version)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| conflict_on_unique(e, || format!("scrape {} version {version}", req.url)))?;

    let outcome = match previous {
        Some(previous) => RevisionOutcome::Superseded {
            previous_id: previous.id,
        },
        None => RevisionOutcome::Created,
    };

    tracing::info!(scrape_id = scrape.id, version = scrape.version, ?outcome, "scrape recorded");
    Ok(ScrapeRevision { scrape, outcome })
}

/// Get a scrape by ID, current or historical.
pub async fn get_scrape<'e, E>(executor: E, scrape_id: i64) -> Result<Scrape>
where
    E: sqlx::PgExecutor<'e>,
{
    let scrape = sqlx::query_as::<_, Scrape>(r#"SELECT * FROM scrapes WHERE id = $1"#)
        .bind(scrape_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| CorpusError::NotFound(format!("scrape {scrape_id}")))?;

    Ok(scrape)
}

/// The current scrape for a (source, url) key, if any.
pub async fn current_scrape<'e, E>(executor: E, source_id: i64, url: &str) -> Result<Option<Scrape>>
where
    E: sqlx::PgExecutor<'e>,
{
    let scrape = sqlx::query_as::<_, Scrape>(
        r#"SELECT * FROM scrapes WHERE source_id = $1 AND url = $2 AND current"#,
    )
    .bind(source_id)
    .bind(url)
    .fetch_optional(executor)
    .await?;

    Ok(scrape)
}

/// All current scrapes, oldest first.
pub async fn current_scrapes<'e, E>(executor: E) -> Result<Vec<Scrape>>
where
    E: sqlx::PgExecutor<'e>,
{
    let scrapes = sqlx::query_as::<_, Scrape>(r#"SELECT * FROM scrapes WHERE current ORDER BY id"#)
        .fetch_all(executor)
        .await?;

    Ok(scrapes)
}

/// Every version recorded for a (source, url) key, oldest first.
pub async fn scrape_versions<'e, E>(executor: E, source_id: i64, url: &str) -> Result<Vec<Scrape>>
where
    E: sqlx::PgExecutor<'e>,
{
    let scrapes = sqlx::query_as::<_, Scrape>(
        r#"SELECT * FROM scrapes WHERE source_id = $1 AND url = $2 ORDER BY version"#,
    )
    .bind(source_id)
    .bind(url)
    .fetch_all(executor)
    .await?;

    Ok(scrapes)
}

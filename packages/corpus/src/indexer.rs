//! Indexing: from a fetched page to a current, parsed scrape.
//!
//! The fetch collaborator hands over `(source_id, raw_html, fetched_at)`;
//! [`ingest`] parses the page, then records the scrape revision and, when a
//! new version was created, its element batch in the same transaction.

use afs_harvester::{DocumentMetadata, ParseOutput, ParsePolicy, StructuralParser};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tokio::task::JoinSet;

use crate::elements::{count_current_elements, reindex_elements, replace_elements};
use crate::error::{CorpusError, Result};
use crate::models::Scrape;
use crate::scrapes::{current_scrapes, record_scrape_in, NewScrape, RevisionOutcome};
use crate::sources::get_source;

/// Reindex tasks running at once in [`reindex_all_current`].
pub const DEFAULT_REINDEX_CONCURRENCY: usize = 4;

/// Result of indexing one scrape.
#[derive(Debug, Clone, Serialize)]
pub struct IndexReport {
    pub scrape_id: i64,
    pub version: i32,
    /// Elements inserted; `None` when nothing was reindexed.
    pub elements: Option<u64>,
    pub warnings: Vec<String>,
}

/// Result of [`ingest`].
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub outcome: RevisionOutcome,
    pub index: IndexReport,
}

/// Summary of [`reindex_all_current`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReindexSummary {
    pub reindexed: usize,
    pub elements: u64,
    pub failed: Vec<(i64, String)>,
}

async fn parse_blocking(policy: ParsePolicy, url: String, html: String) -> Result<ParseOutput> {
    let output = tokio::task::spawn_blocking(move || {
        StructuralParser::new(policy).parse(&url, &html)
    })
    .await?;
    Ok(output)
}

/// Record a fetched page and index it when its content changed.
///
/// The page is parsed first; the scrape revision and its elements are then
/// written in one transaction, so a failed insert leaves the previous
/// version current with all its elements. An unchanged page whose scrape has
/// no current elements is indexed again.
#[tracing::instrument(skip(pool, raw_html), fields(bytes = raw_html.len()))]
pub async fn ingest(
    pool: &PgPool,
    policy: ParsePolicy,
    source_id: i64,
    raw_html: String,
    fetched_at: DateTime<Utc>,
) -> Result<IngestReport> {
    let source = get_source(pool, source_id).await?;
    if !source.current {
        return Err(CorpusError::Conflict(format!(
            "source {source_id} was superseded, fetch it again through the current source"
        )));
    }

    let url = source.url.clone();
    let (metadata, output, raw_html) = {
        let url = url.clone();
        tokio::task::spawn_blocking(move || {
            let metadata = DocumentMetadata::extract(&url, &raw_html);
            let output = StructuralParser::new(policy).parse(&url, &raw_html);
            (metadata, output, raw_html)
        })
        .await?
    };

    let mut tx = pool.begin().await?;
    let revision = record_scrape_in(
        &mut tx,
        NewScrape::new(source_id, url, raw_html, fetched_at).with_metadata(&metadata),
    )
    .await?;

    let needs_index = revision.is_new()
        || (!output.elements.is_empty()
            && count_current_elements(&mut *tx, revision.scrape.id).await? == 0);
    if needs_index && !revision.is_new() {
        tracing::warn!(
            scrape_id = revision.scrape.id,
            "unchanged scrape has no current elements, indexing it again"
        );
    }

    let elements = if needs_index {
        log_parse_warnings(&revision.scrape, &output);
        Some(replace_elements(&mut tx, &revision.scrape, &output.elements).await?)
    } else {
        None
    };

    tx.commit().await?;

    Ok(IngestReport {
        outcome: revision.outcome,
        index: IndexReport {
            scrape_id: revision.scrape.id,
            version: revision.scrape.version,
            elements,
            warnings: if needs_index { output.warnings } else { Vec::new() },
        },
    })
}

fn log_parse_warnings(scrape: &Scrape, output: &ParseOutput) {
    for warning in &output.warnings {
        tracing::warn!(scrape_id = scrape.id, "{warning}");
    }
    if output.regulation.is_none() {
        tracing::warn!(url = %scrape.url, "no regulation code found for scrape");
    }
}

/// Parse a scrape and replace its element batch.
#[tracing::instrument(skip(pool, scrape), fields(scrape_id = scrape.id, version = scrape.version))]
pub async fn reindex(pool: &PgPool, policy: ParsePolicy, scrape: &Scrape) -> Result<IndexReport> {
    let output = parse_blocking(policy, scrape.url.clone(), scrape.raw_html.clone()).await?;

    log_parse_warnings(scrape, &output);

    let inserted = reindex_elements(pool, scrape, &output.elements).await?;

    Ok(IndexReport {
        scrape_id: scrape.id,
        version: scrape.version,
        elements: Some(inserted),
        warnings: output.warnings,
    })
}

/// Reindex every current scrape, at most `concurrency` at a time.
///
/// A failing scrape is reported in the summary and does not stop the others.
#[tracing::instrument(skip(pool))]
pub async fn reindex_all_current(
    pool: &PgPool,
    policy: ParsePolicy,
    concurrency: usize,
) -> Result<ReindexSummary> {
    let scrapes = current_scrapes(pool).await?;
    let concurrency = concurrency.max(1);
    tracing::info!(scrapes = scrapes.len(), concurrency, "reindexing current scrapes");

    let mut summary = ReindexSummary::default();
    let mut tasks = JoinSet::new();
    let mut pending = scrapes.into_iter();

    loop {
        while tasks.len() < concurrency {
            let Some(scrape) = pending.next() else {
                break;
            };
            let pool = pool.clone();
            tasks.spawn(async move {
                let result = reindex(&pool, policy, &scrape).await;
                (scrape.id, result)
            });
        }

        let Some(joined) = tasks.join_next().await else {
            break;
        };

        match joined? {
            (_, Ok(report)) => {
                summary.reindexed += 1;
                summary.elements += report.elements.unwrap_or(0);
            }
            (scrape_id, Err(e)) => {
                tracing::error!(scrape_id, error = %e, "reindex failed");
                summary.failed.push((scrape_id, e.to_string()));
            }
        }
    }

    tracing::info!(
        reindexed = summary.reindexed,
        elements = summary.elements,
        failed = summary.failed.len(),
        "reindex finished"
    );
    Ok(summary)
}

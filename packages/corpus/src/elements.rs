//! Element batches.
//!
//! A scrape's elements are always replaced as a whole: the old batch is
//! deleted and the new one inserted in a single transaction, so readers see
//! either the previous or the new set, never a mix. During ingest that
//! transaction is the one that records the scrape revision.

use afs_harvester::ParsedElement;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use crate::db::lock_key;
use crate::error::{CorpusError, Result};
use crate::models::{Element, Scrape};

/// Rows per INSERT statement (16 binds each, well below the protocol limit).
const INSERT_BATCH_SIZE: usize = 1000;

/// Replace the current elements of `scrape` with `elements`.
///
/// Returns the number of inserted elements. On failure the previous batch is
/// left untouched.
#[tracing::instrument(skip(pool, scrape, elements), fields(scrape_id = scrape.id, version = scrape.version, count = elements.len()))]
pub async fn reindex_elements(
    pool: &PgPool,
    scrape: &Scrape,
    elements: &[ParsedElement],
) -> Result<u64> {
    let mut tx = pool.begin().await?;
    let inserted = replace_elements(&mut tx, scrape, elements).await?;
    tx.commit().await?;
    Ok(inserted)
}

/// [`reindex_elements`] inside the caller's transaction.
///
/// Fails with `Conflict` unless `scrape` is current as seen by that
/// transaction.
pub(crate) async fn replace_elements(
    conn: &mut PgConnection,
    scrape: &Scrape,
    elements: &[ParsedElement],
) -> Result<u64> {
    lock_key(conn, &format!("reindex:{}:{}", scrape.id, scrape.version)).await?;

    let current: Option<bool> =
        sqlx::query_scalar(r#"SELECT current FROM scrapes WHERE id = $1 FOR SHARE"#)
            .bind(scrape.id)
            .fetch_optional(&mut *conn)
            .await?;
    match current {
        None => return Err(CorpusError::NotFound(format!("scrape {}", scrape.id))),
        Some(false) => {
            return Err(CorpusError::Conflict(format!(
                "scrape {} was superseded before it could be indexed",
                scrape.id
            )))
        }
        Some(true) => {}
    }

    let removed = sqlx::query(r#"DELETE FROM elements WHERE scrape_id = $1 AND version = $2"#)
        .bind(scrape.id)
        .bind(scrape.version)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    let mut inserted = 0;
    for batch in elements.chunks(INSERT_BATCH_SIZE) {
        inserted += insert_batch(scrape, batch)
            .build()
            .execute(&mut *conn)
            .await?
            .rows_affected();
    }

    tracing::info!(scrape_id = scrape.id, removed, inserted, "elements replaced");
    Ok(inserted)
}

fn insert_batch<'a>(scrape: &Scrape, batch: &'a [ParsedElement]) -> QueryBuilder<'a, Postgres> {
    let mut builder = QueryBuilder::new(
        "\
INSERT INTO elements (
    scrape_id, tag_name, element_class, element_id, text_content, html_snippet,
    regulation_year, regulation_number, chapter, section, appendix,
    is_transitional, is_general_recommendation, css_path, position_in_parent, version
) ",
    );

    let scrape_id = scrape.id;
    let version = scrape.version;
    builder.push_values(batch, |mut b, element| {
        let hierarchy = &element.hierarchy;
        b.push_bind(scrape_id)
            .push_bind(&element.tag_name)
            .push_bind(&element.element_class)
            .push_bind(&element.element_id)
            .push_bind(&element.text_content)
            .push_bind(&element.html_snippet)
            .push_bind(element.regulation.map(|r| r.year))
            .push_bind(element.regulation.map(|r| r.number))
            .push_bind(hierarchy.chapter())
            .push_bind(hierarchy.section_number())
            .push_bind(hierarchy.appendix_id())
            .push_bind(hierarchy.is_transitional())
            .push_bind(hierarchy.is_general_recommendation)
            .push_bind(&element.css_path)
            .push_bind(element.position_in_parent)
            .push_bind(version);
    });

    builder
}

/// Current elements of one scrape in reconstruction order.
pub async fn current_elements<'e, E>(executor: E, scrape_id: i64) -> Result<Vec<Element>>
where
    E: sqlx::PgExecutor<'e>,
{
    let elements = sqlx::query_as::<_, Element>(
        r#"
        SELECT * FROM elements
        WHERE scrape_id = $1 AND current
        ORDER BY position_in_parent ASC NULLS FIRST, id ASC
        "#,
    )
    .bind(scrape_id)
    .fetch_all(executor)
    .await?;

    Ok(elements)
}

/// Number of current elements of one scrape.
pub async fn count_current_elements<'e, E>(executor: E, scrape_id: i64) -> Result<i64>
where
    E: sqlx::PgExecutor<'e>,
{
    let count = sqlx::query_scalar(
        r#"SELECT COUNT(*) FROM elements WHERE scrape_id = $1 AND current"#,
    )
    .bind(scrape_id)
    .fetch_one(executor)
    .await?;

    Ok(count)
}

/// Number of historical elements of one scrape.
pub async fn count_historical_elements<'e, E>(executor: E, scrape_id: i64) -> Result<i64>
where
    E: sqlx::PgExecutor<'e>,
{
    let count = sqlx::query_scalar(
        r#"SELECT COUNT(*) FROM elements WHERE scrape_id = $1 AND NOT current"#,
    )
    .bind(scrape_id)
    .fetch_one(executor)
    .await?;

    Ok(count)
}

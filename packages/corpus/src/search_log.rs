//! Append-only log of successful substring searches.
//!
//! The log feeds the "recent" and "popular" listings only; search itself
//! never reads it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::LoggedSearch;

/// Window of the recent and popular listings, in days.
pub const REPORT_WINDOW_DAYS: i32 = 30;

/// Entries returned by the recent and popular listings.
pub const REPORT_LIMIT: i64 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RecentSearch {
    pub query: String,
    pub match_count: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PopularSearch {
    pub query: String,
    pub search_count: i64,
    pub match_count: i32,
    pub last_searched: DateTime<Utc>,
}

/// Record a search with its result count.
///
/// Blank queries and searches without matches are not logged; returns
/// `None` for those.
#[tracing::instrument(skip(executor))]
pub async fn log_search<'e, E>(
    executor: E,
    query: &str,
    match_count: usize,
) -> Result<Option<LoggedSearch>>
where
    E: sqlx::PgExecutor<'e>,
{
    let query = query.trim();
    let match_count = i32::try_from(match_count).unwrap_or(i32::MAX);
    if query.is_empty() || match_count <= 0 {
        return Ok(None);
    }

    let logged = sqlx::query_as::<_, LoggedSearch>(
        r#"
        INSERT INTO search_queries (query, match_count)
        VALUES ($1, $2)
        RETURNING *
        "#,
    )
    .bind(query)
    .bind(match_count)
    .fetch_one(executor)
    .await?;

    tracing::debug!(id = logged.id, "search logged");
    Ok(Some(logged))
}

/// Distinct queries of the last 30 days, most recently searched first.
pub async fn recent_searches<'e, E>(executor: E) -> Result<Vec<RecentSearch>>
where
    E: sqlx::PgExecutor<'e>,
{
    let searches = sqlx::query_as::<_, RecentSearch>(
        r#"
        SELECT query, MAX(match_count) AS match_count, MAX(created_at) AS created_at
        FROM search_queries
        WHERE created_at >= now() - make_interval(days => $1)
        GROUP BY query
        ORDER BY MAX(created_at) DESC, query
        LIMIT $2
        "#,
    )
    .bind(REPORT_WINDOW_DAYS)
    .bind(REPORT_LIMIT)
    .fetch_all(executor)
    .await?;

    Ok(searches)
}

/// Most searched queries of the last 30 days.
pub async fn popular_searches<'e, E>(executor: E) -> Result<Vec<PopularSearch>>
where
    E: sqlx::PgExecutor<'e>,
{
    let searches = sqlx::query_as::<_, PopularSearch>(
        r#"
        SELECT query,
               COUNT(*) AS search_count,
               MAX(match_count) AS match_count,
               MAX(created_at) AS last_searched
        FROM search_queries
        WHERE created_at >= now() - make_interval(days => $1)
        GROUP BY query
        ORDER BY search_count DESC, last_searched DESC, query
        LIMIT $2
        "#,
    )
    .bind(REPORT_WINDOW_DAYS)
    .bind(REPORT_LIMIT)
    .fetch_all(executor)
    .await?;

    Ok(searches)
}

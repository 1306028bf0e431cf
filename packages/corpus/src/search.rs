//! Substring search over the current corpus.
//!
//! Matching is case-insensitive on element text. Identical texts within one
//! (regulation, chapter, section, advisory) scope collapse to a single hit,
//! chosen by tag preference, then position, then id.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use afs_harvester::{
    format_complete_reference, hierarchy_label, reference_path, regulation_subject, Hierarchy,
    RegulationCode, Scope,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::{CorpusError, Result};
use crate::models::Element;
use crate::structure::compare_appendix_ids;

/// Longest accepted query, in characters.
pub const MAX_QUERY_LENGTH: usize = 100;

/// Rank of a tag when identical texts compete; lower wins.
///
/// Paragraphs beat list items, table cells and headers, then any other tag,
/// and generic `div` containers come last.
pub fn tag_preference(tag_name: &str) -> u8 {
    match tag_name {
        "p" => 0,
        "li" => 1,
        "td" => 2,
        "th" => 3,
        "div" => 5,
        _ => 4,
    }
}

/// SQL twin of [`tag_preference`].
const TAG_PREFERENCE_SQL: &str = "CASE e.tag_name \
    WHEN 'p' THEN 0 WHEN 'li' THEN 1 WHEN 'td' THEN 2 WHEN 'th' THEN 3 \
    WHEN 'div' THEN 5 ELSE 4 END";

/// Trim a query and check its length.
///
/// Returns `None` for blank queries, which match nothing.
pub fn clean_query(query: &str) -> Result<Option<String>> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > MAX_QUERY_LENGTH {
        return Err(CorpusError::InvalidInput(format!(
            "query too long (max {MAX_QUERY_LENGTH} characters)"
        )));
    }
    Ok(Some(trimmed.to_string()))
}

/// Escape ILIKE metacharacters so the query matches literally.
///
/// # Examples
/// ```
/// use afs_corpus::search::escape_like;
///
/// assert_eq!(escape_like("100%_a\\b"), "100\\%\\_a\\\\b");
/// ```
pub fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Result ordering for substring search.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SearchSort {
    /// Regulation, then chapter, section, appendix.
    #[default]
    Reference,
    ReferenceDesc,
    /// Regulation, then sections before appendices before transitional
    /// provisions.
    Relevance,
    RelevanceDesc,
}

/// A matching element with its display references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub element: Element,
    pub regulation: Option<RegulationCode>,
    pub complete_reference: Option<String>,
    pub hierarchy_label: String,
    pub reference_path: Option<String>,
    /// Regulation title without its code.
    pub subject: Option<String>,
}

impl SearchHit {
    pub fn new(element: Element, title: Option<&str>) -> Self {
        let hierarchy = element.hierarchy();
        let regulation = element.regulation();

        Self {
            complete_reference: regulation.map(|r| format_complete_reference(&r, &hierarchy)),
            hierarchy_label: hierarchy_label(&hierarchy),
            reference_path: regulation.and_then(|r| reference_path(&r, &hierarchy)),
            subject: title.map(regulation_subject),
            regulation,
            element,
        }
    }
}

#[derive(sqlx::FromRow)]
struct HitRow {
    #[sqlx(flatten)]
    element: Element,
    scrape_title: Option<String>,
}

/// Result limits must be positive; zero or negative limits are rejected.
pub(crate) fn check_limit(limit: i64) -> Result<i64> {
    if limit <= 0 {
        return Err(CorpusError::InvalidInput(format!(
            "search limit must be positive, got {limit}"
        )));
    }
    Ok(limit)
}

/// Case-insensitive substring search over current elements of current
/// scrapes, de-duplicated per scope and bounded by `limit`.
///
/// Hits come back in scope order; use [`sort_hits`] for display orderings.
#[tracing::instrument(skip(pool))]
pub async fn search_elements(pool: &PgPool, query: &str, limit: i64) -> Result<Vec<SearchHit>> {
    let limit = check_limit(limit)?;
    let Some(query) = clean_query(query)? else {
        return Ok(Vec::new());
    };
    let pattern = format!("%{}%", escape_like(&query));

    let sql = format!(
        r#"
        SELECT DISTINCT ON (
            e.regulation_year, e.regulation_number, e.chapter, e.section,
            e.is_general_recommendation, e.text_content
        )
            e.*, s.title AS scrape_title
        FROM elements e
        JOIN scrapes s ON s.id = e.scrape_id
        WHERE e.current AND s.current
          AND e.text_content ILIKE $1 ESCAPE '\'
        ORDER BY
            e.regulation_year, e.regulation_number,
            e.chapter NULLS FIRST, e.section NULLS FIRST,
            e.is_general_recommendation, e.text_content,
            {TAG_PREFERENCE_SQL},
            e.position_in_parent ASC NULLS FIRST,
            e.id ASC
        LIMIT $2
        "#
    );

    let rows = sqlx::query_as::<_, HitRow>(&sql)
        .bind(&pattern)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    tracing::debug!(hits = rows.len(), "substring search finished");
    Ok(rows
        .into_iter()
        .map(|row| SearchHit::new(row.element, row.scrape_title.as_deref()))
        .collect())
}

/// Collapse identical texts within one scope, keeping the preferred element.
///
/// Keeps the input order of the surviving elements.
pub fn dedupe_by_scope(elements: Vec<Element>) -> Vec<Element> {
    type ScopeKey = (Option<i32>, Option<i32>, Option<i32>, Option<i32>, bool, String);
    let key = |e: &Element| -> ScopeKey {
        (
            e.regulation_year,
            e.regulation_number,
            e.chapter,
            e.section,
            e.is_general_recommendation,
            e.text_content.clone(),
        )
    };

    let mut winners: Vec<Element> = Vec::new();
    let mut index: HashMap<ScopeKey, usize> = HashMap::new();

    for element in elements {
        match index.get(&key(&element)) {
            Some(&slot) => {
                if prefer(&element, &winners[slot]) == Ordering::Less {
                    winners[slot] = element;
                }
            }
            None => {
                index.insert(key(&element), winners.len());
                winners.push(element);
            }
        }
    }

    winners
}

/// Tie-break between two elements with identical text: tag preference,
/// then position (nulls first), then id.
fn prefer(a: &Element, b: &Element) -> Ordering {
    tag_preference(&a.tag_name)
        .cmp(&tag_preference(&b.tag_name))
        .then_with(|| a.position_in_parent.cmp(&b.position_in_parent))
        .then_with(|| a.id.cmp(&b.id))
}

fn scope_rank(hierarchy: &Hierarchy) -> u8 {
    match &hierarchy.scope {
        Scope::Section { section: Some(_), .. } => 0,
        Scope::Appendix { .. } => 1,
        Scope::Transitional => 2,
        Scope::Section { section: None, .. } => 3,
    }
}

fn compare_reference(a: &Element, b: &Element) -> Ordering {
    a.regulation()
        .cmp(&b.regulation())
        .then_with(|| a.is_transitional.cmp(&b.is_transitional))
        .then_with(|| match (&a.appendix, &b.appendix) {
            (Some(x), Some(y)) => compare_appendix_ids(x, y),
            (x, y) => x.is_some().cmp(&y.is_some()),
        })
        .then_with(|| a.chapter.cmp(&b.chapter))
        .then_with(|| a.section.cmp(&b.section))
        .then_with(|| a.is_general_recommendation.cmp(&b.is_general_recommendation))
}

fn compare_relevance(a: &Element, b: &Element) -> Ordering {
    let (ha, hb) = (a.hierarchy(), b.hierarchy());
    a.regulation()
        .cmp(&b.regulation())
        .then_with(|| scope_rank(&ha).cmp(&scope_rank(&hb)))
        .then_with(|| match (&a.appendix, &b.appendix) {
            (Some(x), Some(y)) => compare_appendix_ids(x, y),
            _ => a.section.cmp(&b.section),
        })
        .then_with(|| a.is_general_recommendation.cmp(&b.is_general_recommendation))
}

/// Order hits for display. The sort is stable.
pub fn sort_hits(hits: &mut [SearchHit], sort: SearchSort) {
    match sort {
        SearchSort::Reference => hits.sort_by(|a, b| compare_reference(&a.element, &b.element)),
        SearchSort::ReferenceDesc => {
            hits.sort_by(|a, b| compare_reference(&b.element, &a.element));
        }
        SearchSort::Relevance => hits.sort_by(|a, b| compare_relevance(&a.element, &b.element)),
        SearchSort::RelevanceDesc => {
            hits.sort_by(|a, b| compare_relevance(&b.element, &a.element));
        }
    }
}

/// Canonical paths of the hits, first occurrence first.
///
/// Hits outside any section or appendix are skipped.
pub fn reference_paths(hits: &[SearchHit]) -> Vec<String> {
    let mut seen = HashSet::new();
    hits.iter()
        .filter_map(|hit| hit.reference_path.clone())
        .filter(|path| seen.insert(path.clone()))
        .collect()
}

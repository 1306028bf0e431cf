//! Reference lookup: "AFS 2023:10, 13 kap., 10 §, AR" to elements, with
//! previous/next section navigation.

use afs_harvester::{ReferenceKey, RegulationCode};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::{CorpusError, Result};
use crate::models::Element;
use crate::reconstruct::{join_snippets, wrap_advisory};
use crate::search::dedupe_by_scope;

/// Elements and rendered content addressed by a reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedReference {
    pub key: ReferenceKey,
    pub elements: Vec<Element>,
    pub html: String,
    pub text: String,
    pub prev_reference: Option<String>,
    pub next_reference: Option<String>,
}

/// Parse a reference string.
pub fn parse_reference(text: &str) -> Result<ReferenceKey> {
    Ok(text.trim().parse::<ReferenceKey>()?)
}

/// Neighbours of `current` in the sorted, distinct list of section keys.
///
/// `keys` need not be sorted; `None` chapters sort first. Returns `(None,
/// None)` when `current` is not in the list.
pub fn adjacent_sections(
    keys: &[(Option<i32>, i32)],
    current: (Option<i32>, i32),
) -> (Option<(Option<i32>, i32)>, Option<(Option<i32>, i32)>) {
    let mut sorted = keys.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    match sorted.binary_search(&current) {
        Ok(index) => {
            let prev = index.checked_sub(1).map(|i| sorted[i]);
            let next = sorted.get(index + 1).copied();
            (prev, next)
        }
        Err(_) => (None, None),
    }
}

/// Render resolved elements: normative snippets first, advisory snippets
/// wrapped in their container after them.
fn render(elements: &[Element]) -> String {
    let (advisory, normative): (Vec<&Element>, Vec<&Element>) =
        elements.iter().partition(|e| e.is_general_recommendation);

    let mut parts = Vec::new();
    if !normative.is_empty() {
        let snippets: Vec<&str> = normative.iter().map(|e| e.html_snippet.as_str()).collect();
        parts.push(join_snippets(&snippets));
    }
    if !advisory.is_empty() {
        let snippets: Vec<&str> = advisory.iter().map(|e| e.html_snippet.as_str()).collect();
        parts.push(wrap_advisory(&join_snippets(&snippets)));
    }
    parts.join("\n")
}

/// Resolve a reference string against the current corpus.
///
/// Without "AR" the section's normative and advisory elements are both
/// returned; with "AR" only the advisory ones.
#[tracing::instrument(skip(pool))]
pub async fn resolve_reference(pool: &PgPool, text: &str) -> Result<ResolvedReference> {
    let key = parse_reference(text)?;

    let elements = sqlx::query_as::<_, Element>(
        r#"
        SELECT e.*
        FROM elements e
        JOIN scrapes s ON s.id = e.scrape_id
        WHERE e.current AND s.current
          AND e.regulation_year = $1 AND e.regulation_number = $2
          AND e.chapter IS NOT DISTINCT FROM $3
          AND ($4::INT IS NULL OR e.section = $4)
          AND (NOT $5 OR e.is_general_recommendation)
          AND NOT e.is_transitional
          AND e.appendix IS NULL
          AND e.text_content <> ''
        ORDER BY e.position_in_parent ASC NULLS FIRST, e.id ASC
        "#,
    )
    .bind(key.regulation.year)
    .bind(key.regulation.number)
    .bind(key.chapter)
    .bind(key.section)
    .bind(key.is_advisory)
    .fetch_all(pool)
    .await?;

    let elements = dedupe_by_scope(elements);
    if elements.is_empty() {
        return Err(CorpusError::NotFound(format!("Reference not found: {key}")));
    }

    let (prev_reference, next_reference) = match key.section {
        Some(section) => {
            let keys = section_keys(pool, key.regulation).await?;
            let (prev, next) = adjacent_sections(&keys, (key.chapter, section));
            let to_reference = |(chapter, section): (Option<i32>, i32)| {
                ReferenceKey::section(key.regulation, chapter, section).to_string()
            };
            (prev.map(to_reference), next.map(to_reference))
        }
        None => (None, None),
    };

    let text = elements
        .iter()
        .map(|e| e.text_content.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    tracing::debug!(elements = elements.len(), "reference resolved");
    Ok(ResolvedReference {
        html: render(&elements),
        text,
        elements,
        key,
        prev_reference,
        next_reference,
    })
}

/// Every (chapter, section) pair of a regulation's current elements.
pub async fn section_keys<'e, E>(
    executor: E,
    regulation: RegulationCode,
) -> Result<Vec<(Option<i32>, i32)>>
where
    E: sqlx::PgExecutor<'e>,
{
    let keys = sqlx::query_as::<_, (Option<i32>, i32)>(
        r#"
        SELECT DISTINCT e.chapter, e.section
        FROM elements e
        JOIN scrapes s ON s.id = e.scrape_id
        WHERE e.current AND s.current
          AND e.regulation_year = $1 AND e.regulation_number = $2
          AND e.section IS NOT NULL
        ORDER BY e.chapter NULLS FIRST, e.section
        "#,
    )
    .bind(regulation.year)
    .bind(regulation.number)
    .fetch_all(executor)
    .await?;

    Ok(keys)
}

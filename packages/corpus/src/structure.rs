//! Regulation listings and outlines built from the current corpus.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use afs_harvester::RegulationCode;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::{CorpusError, Result};

/// One entry of [`list_regulations`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegulationSummary {
    pub code: String,
    pub year: i32,
    pub number: i32,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterOutline {
    pub chapter: i32,
    pub sections: Vec<i32>,
}

/// Outline of one regulation: chapters with their sections, chapter-less
/// sections and appendices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegulationStructure {
    pub regulation: RegulationCode,
    pub chapters: Vec<ChapterOutline>,
    pub sections_without_chapter: Vec<i32>,
    pub appendices: Vec<String>,
}

/// Compare appendix identifiers naturally: "1" < "2" < "2A" < "10" < "A".
pub fn compare_appendix_ids(a: &str, b: &str) -> Ordering {
    appendix_sort_key(a).cmp(&appendix_sort_key(b))
}

fn appendix_sort_key(id: &str) -> (bool, u64, String) {
    let digits: String = id.chars().take_while(char::is_ascii_digit).collect();
    let suffix = id[digits.len()..].to_uppercase();
    match digits.parse::<u64>() {
        Ok(n) => (false, n, suffix),
        Err(_) => (true, 0, suffix),
    }
}

/// Build the outline from `(chapter, section, appendix)` rows.
pub fn build_structure(
    regulation: RegulationCode,
    rows: impl IntoIterator<Item = (Option<i32>, Option<i32>, Option<String>)>,
) -> RegulationStructure {
    let mut chapters: BTreeMap<i32, BTreeSet<i32>> = BTreeMap::new();
    let mut loose_sections = BTreeSet::new();
    let mut appendices: Vec<String> = Vec::new();

    for (chapter, section, appendix) in rows {
        if let Some(appendix) = appendix {
            if !appendices.contains(&appendix) {
                appendices.push(appendix);
            }
            continue;
        }
        match (chapter, section) {
            (Some(chapter), Some(section)) => {
                chapters.entry(chapter).or_default().insert(section);
            }
            (Some(chapter), None) => {
                chapters.entry(chapter).or_default();
            }
            (None, Some(section)) => {
                loose_sections.insert(section);
            }
            (None, None) => {}
        }
    }

    appendices.sort_by(|a, b| compare_appendix_ids(a, b));

    RegulationStructure {
        regulation,
        chapters: chapters
            .into_iter()
            .map(|(chapter, sections)| ChapterOutline {
                chapter,
                sections: sections.into_iter().collect(),
            })
            .collect(),
        sections_without_chapter: loose_sections.into_iter().collect(),
        appendices,
    }
}

/// Regulations with a current scrape, sorted by (year, number).
///
/// The code comes from the scrape URL, falling back to the stored title.
/// Scrapes whose regulation cannot be determined are skipped.
#[tracing::instrument(skip(pool))]
pub async fn list_regulations(pool: &PgPool) -> Result<Vec<RegulationSummary>> {
    let rows: Vec<(String, Option<String>)> = sqlx::query_as(
        r#"SELECT url, title FROM scrapes WHERE current ORDER BY fetched_at DESC, id DESC"#,
    )
    .fetch_all(pool)
    .await?;

    let mut regulations: BTreeMap<RegulationCode, Option<String>> = BTreeMap::new();
    for (url, title) in rows {
        let code = RegulationCode::from_url(&url)
            .or_else(|| title.as_deref().and_then(RegulationCode::find_in));
        match code {
            // Newest scrape wins when several sources carry one regulation
            Some(code) => {
                regulations.entry(code).or_insert(title);
            }
            None => tracing::warn!(url = %url, "current scrape without regulation code"),
        }
    }

    Ok(regulations
        .into_iter()
        .map(|(code, title)| RegulationSummary {
            code: code.to_string(),
            year: code.year,
            number: code.number,
            title,
        })
        .collect())
}

/// Outline of a regulation. Fails with `NotFound` when it has no current
/// elements.
#[tracing::instrument(skip(pool), fields(regulation = %regulation))]
pub async fn regulation_structure(
    pool: &PgPool,
    regulation: RegulationCode,
) -> Result<RegulationStructure> {
    let rows: Vec<(Option<i32>, Option<i32>, Option<String>)> = sqlx::query_as(
        r#"
        SELECT DISTINCT e.chapter, e.section, e.appendix
        FROM elements e
        JOIN scrapes s ON s.id = e.scrape_id
        WHERE e.current AND s.current
          AND e.regulation_year = $1 AND e.regulation_number = $2
          AND NOT e.is_transitional
        "#,
    )
    .bind(regulation.year)
    .bind(regulation.number)
    .fetch_all(pool)
    .await?;

    if rows.is_empty() {
        let has_elements: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM elements e
                JOIN scrapes s ON s.id = e.scrape_id
                WHERE e.current AND s.current
                  AND e.regulation_year = $1 AND e.regulation_number = $2
            )
            "#,
        )
        .bind(regulation.year)
        .bind(regulation.number)
        .fetch_one(pool)
        .await?;

        if !has_elements {
            return Err(CorpusError::NotFound(format!("Regulation not found: {regulation}")));
        }
    }

    Ok(build_structure(regulation, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn code() -> RegulationCode {
        RegulationCode {
            year: 2023,
            number: 1,
        }
    }

    #[test]
    fn test_appendix_ids_sort_naturally() {
        let mut ids = vec!["A", "10", "2A", "1", "2", "b"];
        ids.sort_by(|a, b| compare_appendix_ids(a, b));
        assert_eq!(ids, vec!["1", "2", "2A", "10", "A", "b"]);
    }

    #[test]
    fn test_build_structure() {
        let structure = build_structure(
            code(),
            vec![
                (Some(2), Some(5), None),
                (Some(1), Some(2), None),
                (Some(1), Some(1), None),
                (Some(2), None, None),
                (None, Some(3), None),
                (None, None, None),
                (None, None, Some("2A".to_string())),
                (None, None, Some("1".to_string())),
            ],
        );

        assert_eq!(
            structure.chapters,
            vec![
                ChapterOutline {
                    chapter: 1,
                    sections: vec![1, 2],
                },
                ChapterOutline {
                    chapter: 2,
                    sections: vec![5],
                },
            ]
        );
        assert_eq!(structure.sections_without_chapter, vec![3]);
        assert_eq!(structure.appendices, vec!["1".to_string(), "2A".to_string()]);
    }
}

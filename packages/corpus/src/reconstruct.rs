//! Reconstruction of sections, appendices and transitional provisions from
//! their stored element snippets.
//!
//! Every reconstruction orders elements by `position_in_parent` (nulls first)
//! and then by element id, and joins the snippets with newlines.

use afs_harvester::config::{GENERAL_RECOMMENDATION_CLASS, SECTION_SIGN_CLASS};
use afs_harvester::html::fragment_text;
use afs_harvester::RegulationCode;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::Result;
use crate::models::Element;

/// Default length of a section preview, in characters.
pub const PREVIEW_LENGTH: usize = 200;

/// Normative and advisory HTML of one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionContent {
    pub normative_html: String,
    pub advisory_html: Option<String>,
}

impl SectionContent {
    /// Normative text followed by the advisory block.
    pub fn html(&self) -> String {
        match &self.advisory_html {
            Some(advisory) => format!("{}\n{advisory}", self.normative_html),
            None => self.normative_html.clone(),
        }
    }
}

/// Reconstructed unit an element belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconstruction {
    Section(SectionContent),
    Appendix(String),
    Transitional(String),
}

/// Join snippets in the order given.
pub fn join_snippets<S: AsRef<str>>(snippets: &[S]) -> String {
    snippets
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Wrap advisory HTML in a general recommendation container unless it
/// already carries one.
pub fn wrap_advisory(html: &str) -> String {
    let marker = format!("class=\"{GENERAL_RECOMMENDATION_CLASS}\"");
    if html.contains(&marker) {
        html.to_string()
    } else {
        format!("<div class=\"{GENERAL_RECOMMENDATION_CLASS}\">\n{html}\n</div>")
    }
}

/// Split ordered `(is_general_recommendation, snippet)` rows into a section.
///
/// Returns `None` when the section has no normative text.
pub fn assemble_section(rows: Vec<(bool, String)>) -> Option<SectionContent> {
    let (advisory, normative): (Vec<_>, Vec<_>) = rows.into_iter().partition(|(gr, _)| *gr);
    if normative.is_empty() {
        return None;
    }

    let normative: Vec<String> = normative.into_iter().map(|(_, html)| html).collect();
    let advisory: Vec<String> = advisory.into_iter().map(|(_, html)| html).collect();
    let advisory_html = join_snippets(&advisory);

    Some(SectionContent {
        normative_html: join_snippets(&normative),
        advisory_html: (!advisory_html.trim().is_empty()).then(|| wrap_advisory(&advisory_html)),
    })
}

/// Plain-text preview: "N § text", cut to `limit` characters with "...".
pub fn preview_text(section: i32, html: &str, limit: usize) -> Option<String> {
    let text = fragment_text(html);
    if text.is_empty() {
        return None;
    }

    let preview = format!("{section} § {text}");
    if preview.chars().count() <= limit {
        return Some(preview);
    }
    let cut: String = preview.chars().take(limit.saturating_sub(3)).collect();
    Some(format!("{cut}..."))
}

/// Reconstruct a section of a current regulation.
///
/// `chapter = None` selects the section outside any chapter. Returns `None`
/// when no normative element exists for the key.
#[tracing::instrument(skip(pool), fields(regulation = %regulation))]
pub async fn reconstruct_section(
    pool: &PgPool,
    regulation: RegulationCode,
    chapter: Option<i32>,
    section: i32,
) -> Result<Option<SectionContent>> {
    let rows: Vec<(bool, String)> = sqlx::query_as(
        r#"
        SELECT e.is_general_recommendation, e.html_snippet
        FROM elements e
        JOIN scrapes s ON s.id = e.scrape_id
        WHERE e.current AND s.current
          AND e.regulation_year = $1 AND e.regulation_number = $2
          AND e.chapter IS NOT DISTINCT FROM $3
          AND e.section = $4
          AND e.text_content <> ''
        ORDER BY e.position_in_parent ASC NULLS FIRST, e.id ASC
        "#,
    )
    .bind(regulation.year)
    .bind(regulation.number)
    .bind(chapter)
    .bind(section)
    .fetch_all(pool)
    .await?;

    tracing::debug!(elements = rows.len(), "section elements loaded");
    Ok(assemble_section(rows))
}

/// Reconstruct an appendix of a current regulation.
#[tracing::instrument(skip(pool), fields(regulation = %regulation))]
pub async fn reconstruct_appendix(
    pool: &PgPool,
    regulation: RegulationCode,
    appendix: &str,
) -> Result<Option<String>> {
    let snippets: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT e.html_snippet
        FROM elements e
        JOIN scrapes s ON s.id = e.scrape_id
        WHERE e.current AND s.current
          AND e.regulation_year = $1 AND e.regulation_number = $2
          AND e.appendix = $3
          AND e.text_content <> ''
        ORDER BY e.position_in_parent ASC NULLS FIRST, e.id ASC
        "#,
    )
    .bind(regulation.year)
    .bind(regulation.number)
    .bind(appendix)
    .fetch_all(pool)
    .await?;

    Ok((!snippets.is_empty()).then(|| join_snippets(&snippets)))
}

/// Reconstruct the transitional provisions of one scrape.
#[tracing::instrument(skip(pool))]
pub async fn reconstruct_transitional(pool: &PgPool, scrape_id: i64) -> Result<Option<String>> {
    let snippets: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT html_snippet
        FROM elements
        WHERE scrape_id = $1 AND current AND is_transitional
        ORDER BY position_in_parent ASC NULLS FIRST, id ASC
        "#,
    )
    .bind(scrape_id)
    .fetch_all(pool)
    .await?;

    Ok((!snippets.is_empty()).then(|| join_snippets(&snippets)))
}

/// Reconstruct whatever unit `element` belongs to.
///
/// Returns `None` for root-level content and elements without a regulation.
pub async fn reconstruct_for_element(
    pool: &PgPool,
    element: &Element,
) -> Result<Option<Reconstruction>> {
    if element.is_transitional {
        let html = reconstruct_transitional(pool, element.scrape_id).await?;
        return Ok(html.map(Reconstruction::Transitional));
    }

    let Some(regulation) = element.regulation() else {
        return Ok(None);
    };

    if let Some(appendix) = &element.appendix {
        let html = reconstruct_appendix(pool, regulation, appendix).await?;
        return Ok(html.map(Reconstruction::Appendix));
    }

    match element.section {
        Some(section) => {
            let content = reconstruct_section(pool, regulation, element.chapter, section).await?;
            Ok(content.map(Reconstruction::Section))
        }
        None => Ok(None),
    }
}

/// Body elements of a section: headings and the section sign itself are left
/// out of previews.
fn is_preview_body(tag_name: &str, class: Option<&str>) -> bool {
    let heading = matches!(tag_name, "h1" | "h2" | "h3" | "h4" | "h5" | "h6");
    let section_sign =
        class.is_some_and(|c| c.split_whitespace().any(|name| name == SECTION_SIGN_CLASS));
    !heading && !section_sign
}

/// Plain-text preview of a section of a current regulation.
///
/// Only normative body text is used. When several chapters carry the
/// section number, the first chapter wins.
pub async fn section_preview(
    pool: &PgPool,
    regulation: RegulationCode,
    section: i32,
    limit: usize,
) -> Result<Option<String>> {
    let rows: Vec<(Option<i32>, String, Option<String>, String)> = sqlx::query_as(
        r#"
        SELECT e.chapter, e.tag_name, e.element_class, e.html_snippet
        FROM elements e
        JOIN scrapes s ON s.id = e.scrape_id
        WHERE e.current AND s.current
          AND e.regulation_year = $1 AND e.regulation_number = $2
          AND e.section = $3
          AND NOT e.is_general_recommendation
        ORDER BY e.chapter ASC NULLS FIRST, e.position_in_parent ASC NULLS FIRST, e.id ASC
        "#,
    )
    .bind(regulation.year)
    .bind(regulation.number)
    .bind(section)
    .fetch_all(pool)
    .await?;

    let Some(chapter) = rows.first().map(|(chapter, ..)| *chapter) else {
        return Ok(None);
    };
    let snippets: Vec<&str> = rows
        .iter()
        .filter(|(c, tag, class, _)| *c == chapter && is_preview_body(tag, class.as_deref()))
        .map(|(.., html)| html.as_str())
        .collect();

    Ok(preview_text(section, &join_snippets(&snippets), limit))
}

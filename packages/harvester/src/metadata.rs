//! Document-level metadata: page title, regulation code, plain text and
//! structural statistics.

use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::config::{GENERAL_RECOMMENDATION_CLASS, SECTION_SIGN_CLASS, TITLE_SUFFIX};
use crate::html::{
    attribute, has_class, normalize_whitespace, tag_name, visible_text, IndexedDocument,
};
use crate::parser::content_root;
use crate::types::RegulationCode;

#[allow(clippy::expect_used)] // Static selector that is guaranteed to be valid
static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid selector"));

/// Trailing "(AFS 2023:1)" in a regulation title.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static TITLE_CODE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(AFS\s+\d{4}:\d+\)\s*$").expect("valid regex"));

/// Counts of structural markers in a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStats {
    pub section_count: usize,
    pub general_recommendation_count: usize,
    pub appendix_count: usize,
}

/// Metadata extracted from one fetched page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub regulation: Option<RegulationCode>,
    pub plain_text: String,
    pub stats: DocumentStats,
}

impl DocumentMetadata {
    /// Extract metadata from a page fetched from `url`.
    ///
    /// The regulation code comes from the URL; the title's code is used when
    /// the URL carries none.
    pub fn extract(url: &str, html: &str) -> Self {
        let document = Html::parse_document(html);
        let title = extract_title(&document);
        let regulation = RegulationCode::from_url(url)
            .or_else(|| title.as_deref().and_then(RegulationCode::find_in));

        let index = IndexedDocument::build(document.root_element());
        let root = content_root(&index);
        let plain_text = visible_text(index.node(root).element);

        Self {
            title,
            regulation,
            plain_text,
            stats: stats_for(&index),
        }
    }
}

/// Extract the regulation title from `<title>`.
///
/// The av.se suffix is stripped; titles without an AFS code are rejected.
///
/// # Examples
/// ```
/// use afs_harvester::metadata::extract_title;
/// use scraper::Html;
///
/// let doc = Html::parse_document(
///     "<title>Buller (AFS 2023:10), föreskrifter - Arbetsmiljöverket</title>",
/// );
/// assert_eq!(extract_title(&doc).as_deref(), Some("Buller (AFS 2023:10)"));
/// ```
pub fn extract_title(document: &Html) -> Option<String> {
    let raw: String = document.select(&TITLE_SELECTOR).next()?.text().collect();
    let title = normalize_whitespace(&raw);
    let title = title.strip_suffix(TITLE_SUFFIX).unwrap_or(&title).trim().to_string();

    RegulationCode::find_in(&title).map(|_| title)
}

/// Subject part of a regulation title, without the trailing "(AFS 2023:1)".
///
/// # Examples
/// ```
/// use afs_harvester::metadata::regulation_subject;
///
/// assert_eq!(regulation_subject("Buller (AFS 2023:10)"), "Buller");
/// ```
pub fn regulation_subject(title: &str) -> String {
    TITLE_CODE_SUFFIX.replace(title, "").trim().to_string()
}

fn stats_for(index: &IndexedDocument<'_>) -> DocumentStats {
    let mut stats = DocumentStats::default();
    for node in index.nodes() {
        let element = node.element;
        if has_class(element, SECTION_SIGN_CLASS) {
            stats.section_count += 1;
        }
        if tag_name(element) == "div" && has_class(element, GENERAL_RECOMMENDATION_CLASS) {
            stats.general_recommendation_count += 1;
        }
        let appendix_heading = tag_name(element) == "h2"
            && attribute(element, "id").is_some_and(|id| id.to_lowercase().starts_with("bilaga"));
        if appendix_heading {
            stats.appendix_count += 1;
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAGE: &str = r#"<html><head>
        <title>Systematiskt arbetsmiljöarbete (AFS 2023:1), föreskrifter - Arbetsmiljöverket</title>
        </head><body>
        <nav>Meny</nav>
        <div class="provision">
          <h2>1 kap.</h2>
          <span class="section-sign">1 §</span><p>Ett.</p>
          <span class="section-sign">2 §</span><p>Två.</p>
          <div class="general-recommendation"><p>Råd.</p></div>
          <h2 id="bilaga-1">Bilaga 1</h2><p>Bilagetext.</p>
        </div>
        </body></html>"#;

    #[test]
    fn test_extract_metadata() {
        let metadata = DocumentMetadata::extract("https://www.av.se/afs-20231/", PAGE);

        assert_eq!(
            metadata.title.as_deref(),
            Some("Systematiskt arbetsmiljöarbete (AFS 2023:1)")
        );
        assert_eq!(metadata.regulation.unwrap().to_string(), "AFS 2023:1");
        assert_eq!(
            metadata.stats,
            DocumentStats {
                section_count: 2,
                general_recommendation_count: 1,
                appendix_count: 1,
            }
        );
        assert!(metadata.plain_text.starts_with("1 kap. 1 § Ett."));
        assert!(!metadata.plain_text.contains("Meny"));
    }

    #[test]
    fn test_regulation_from_title_when_url_has_none() {
        let metadata = DocumentMetadata::extract("https://example.org/page", PAGE);
        assert_eq!(metadata.regulation.unwrap().to_string(), "AFS 2023:1");
    }

    #[test]
    fn test_title_without_code_is_rejected() {
        let doc = Html::parse_document("<title>Start - Arbetsmiljöverket</title>");
        assert_eq!(extract_title(&doc), None);
    }

    #[test]
    fn test_regulation_subject() {
        assert_eq!(
            regulation_subject("Systematiskt arbetsmiljöarbete (AFS 2023:1)"),
            "Systematiskt arbetsmiljöarbete"
        );
        assert_eq!(regulation_subject("Utan kod"), "Utan kod");
    }
}

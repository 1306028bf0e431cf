//! Recognition of structural markers in heading and span text.
//!
//! All functions expect whitespace-normalized text (see
//! [`normalize_whitespace`](crate::html::normalize_whitespace)); a no-break
//! space between "2" and "kap." would otherwise defeat the patterns.

use regex::Regex;
use std::sync::LazyLock;

/// Chapter heading: "2 kap." or "13 kap Allmänna bestämmelser".
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static CHAPTER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d+)\s+kap\b\.?").expect("valid regex"));

/// Section sign text: "5 §", "12§".
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static SECTION_TEXT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*§").expect("valid regex"));

/// Section sign id fallback: "K2P5§" style anchors.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static SECTION_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)§").expect("valid regex"));

/// Appendix heading text: "Bilaga 2A", "Bilaga B Förteckning".
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static APPENDIX_TEXT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^bilaga\s+(\d+[a-z]?|[a-z])\b").expect("valid regex"));

/// Appendix anchor id: "bilaga-2a", "bilaga_b", "bilaga3".
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static APPENDIX_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^bilaga[-_]?(\d+[a-z]?|[a-z])\b").expect("valid regex"));

/// Check if a heading text announces a chapter.
pub fn is_chapter_heading(text: &str) -> bool {
    CHAPTER_PATTERN.is_match(text)
}

/// Extract the chapter number from a chapter heading.
///
/// Returns `None` for non-chapter text and for numbers that are zero or do
/// not fit `i32`.
///
/// # Examples
/// ```
/// use afs_harvester::classify::chapter_number;
///
/// assert_eq!(chapter_number("13 kap. Allmänna bestämmelser"), Some(13));
/// assert_eq!(chapter_number("Kapitel 2"), None);
/// assert_eq!(chapter_number("0 kap."), None);
/// ```
pub fn chapter_number(text: &str) -> Option<i32> {
    positive(&CHAPTER_PATTERN.captures(text)?[1])
}

/// Extract the section number from a section sign, falling back to its id.
///
/// A number in the text wins over the id; zero is never a section number.
///
/// # Examples
/// ```
/// use afs_harvester::classify::section_number;
///
/// assert_eq!(section_number("5 §", None), Some(5));
/// assert_eq!(section_number("", Some("K2P7§")), Some(7));
/// ```
pub fn section_number(text: &str, id: Option<&str>) -> Option<i32> {
    if let Some(caps) = SECTION_TEXT_PATTERN.captures(text) {
        return positive(&caps[1]);
    }
    let caps = SECTION_ID_PATTERN.captures(id?)?;
    positive(&caps[1])
}

fn positive(digits: &str) -> Option<i32> {
    digits.parse().ok().filter(|n: &i32| *n > 0)
}

/// Check if a heading starts an appendix (id or text begins with "bilaga").
pub fn is_appendix_heading(text: &str, id: Option<&str>) -> bool {
    let by_id = id.is_some_and(|id| id.to_lowercase().starts_with("bilaga"));
    by_id || text.to_lowercase().starts_with("bilaga")
}

/// Extract the appendix identifier, keeping alphanumeric suffixes ("2A").
///
/// # Examples
/// ```
/// use afs_harvester::classify::appendix_identifier;
///
/// assert_eq!(appendix_identifier("Bilaga 2A Gränsvärden", None), Some("2A".to_string()));
/// assert_eq!(appendix_identifier("Bilaga", Some("bilaga-c")), Some("C".to_string()));
/// ```
pub fn appendix_identifier(text: &str, id: Option<&str>) -> Option<String> {
    APPENDIX_TEXT_PATTERN
        .captures(text)
        .or_else(|| id.and_then(|id| APPENDIX_ID_PATTERN.captures(id)))
        .map(|caps| caps[1].to_uppercase())
}

/// Check if a heading starts the transitional provisions.
pub fn is_transitional_heading(text: &str, id: Option<&str>) -> bool {
    let by_id = id.is_some_and(|id| id.to_lowercase().contains("overgang"));
    by_id || text.to_lowercase().contains("övergång")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_chapter_number() {
        assert_eq!(chapter_number("2 kap."), Some(2));
        assert_eq!(chapter_number("2 KAP Allmänt"), Some(2));
        assert_eq!(chapter_number("Om 2 kap."), None);
        assert_eq!(chapter_number("2 kapitel"), None);
    }

    #[test]
    fn test_chapter_number_overflow() {
        assert!(is_chapter_heading("99999999999 kap."));
        assert_eq!(chapter_number("99999999999 kap."), None);
    }

    #[test]
    fn test_zero_is_not_a_number() {
        assert!(is_chapter_heading("0 kap. Inledande"));
        assert_eq!(chapter_number("0 kap. Inledande"), None);
        assert_eq!(section_number("0 §", None), None);
        assert_eq!(section_number("0 §", Some("K1P4§")), None);
        assert_eq!(section_number("§", Some("K1P0§")), None);
    }

    #[test]
    fn test_section_number() {
        assert_eq!(section_number("10 §", Some("K13P10")), Some(10));
        assert_eq!(section_number("12§", None), Some(12));
        assert_eq!(section_number("§", Some("P3§")), Some(3));
        assert_eq!(section_number("§", None), None);
    }

    #[test]
    fn test_appendix_detection() {
        assert!(is_appendix_heading("Bilaga 1", None));
        assert!(is_appendix_heading("Förteckning", Some("Bilaga-1")));
        assert!(!is_appendix_heading("3 kap.", Some("kap3")));
    }

    #[test]
    fn test_appendix_identifier() {
        assert_eq!(appendix_identifier("Bilaga 2A", None), Some("2A".to_string()));
        assert_eq!(appendix_identifier("Bilaga 12 Mätning", None), Some("12".to_string()));
        assert_eq!(appendix_identifier("bilaga b", None), Some("B".to_string()));
        assert_eq!(appendix_identifier("Bilagor", None), None);
    }

    #[test]
    fn test_transitional_detection() {
        assert!(is_transitional_heading("Övergångsbestämmelser", None));
        assert!(is_transitional_heading("Bestämmelser", Some("overgangsbestammelser")));
        assert!(!is_transitional_heading("Ikraftträdande", Some("ikraft")));
    }
}

//! Configuration constants and validation functions for the harvester.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{HarvesterError, Result};

/// Class of the container holding the regulation text on av.se pages.
pub const PROVISION_CLASS: &str = "provision";

/// Class of the span announcing a section ("5 §").
pub const SECTION_SIGN_CLASS: &str = "section-sign";

/// Class of the container wrapping general recommendations (allmänna råd).
pub const GENERAL_RECOMMENDATION_CLASS: &str = "general-recommendation";

/// Class of the block preceding the first chapter or section.
pub const PREAMBLE_CLASS: &str = "preamble";

/// Tags whose subtree never carries regulation content.
pub const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "button", "head", "svg",
];

/// Suffix that av.se appends to every page title.
pub const TITLE_SUFFIX: &str = ", föreskrifter - Arbetsmiljöverket";

/// Base path of the regulation API used for canonical reference paths.
pub const API_BASE_PATH: &str = "/api/v1/regulations";

/// Lowest accepted regulation year.
pub const MIN_YEAR: i32 = 2000;

/// Highest accepted regulation year.
pub const MAX_YEAR: i32 = 2100;

/// Lowest accepted regulation number within a year.
pub const MIN_NUMBER: i32 = 1;

/// Highest accepted regulation number within a year.
pub const MAX_NUMBER: i32 = 999;

/// Regulation code anywhere in a text: "AFS 2023:1", "afs2023:10".
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
pub(crate) static REGULATION_CODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)AFS\s*(\d{4}):(\d+)").expect("valid regex"));

/// Regulation code encoded in an av.se URL: ".../afs-202310/" is AFS 2023:10.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
pub(crate) static REGULATION_URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"afs-(\d{4})(\d+)").expect("valid regex"));

/// Validate a regulation year.
///
/// # Examples
/// ```
/// use afs_harvester::config::validate_year;
///
/// assert!(validate_year(2023).is_ok());
/// assert!(validate_year(1999).is_err());
/// ```
pub fn validate_year(year: i32) -> Result<()> {
    if (MIN_YEAR..=MAX_YEAR).contains(&year) {
        Ok(())
    } else {
        Err(HarvesterError::InvalidYear(year))
    }
}

/// Validate a regulation number.
///
/// # Examples
/// ```
/// use afs_harvester::config::validate_number;
///
/// assert!(validate_number(10).is_ok());
/// assert!(validate_number(0).is_err());
/// assert!(validate_number(1000).is_err());
/// ```
pub fn validate_number(number: i32) -> Result<()> {
    if (MIN_NUMBER..=MAX_NUMBER).contains(&number) {
        Ok(())
    } else {
        Err(HarvesterError::InvalidNumber(number))
    }
}

/// Validate a chapter number (must be positive).
pub fn validate_chapter(chapter: i32) -> Result<()> {
    if chapter >= 1 {
        Ok(())
    } else {
        Err(HarvesterError::InvalidChapter(chapter))
    }
}

/// Validate a section number (must be positive).
pub fn validate_section(section: i32) -> Result<()> {
    if section >= 1 {
        Ok(())
    } else {
        Err(HarvesterError::InvalidSection(section))
    }
}

/// Validate and normalize an appendix identifier.
///
/// Identifiers are digits with an optional letter suffix ("2", "2A") or a
/// single letter ("A"). Letters are upper-cased.
///
/// # Examples
/// ```
/// use afs_harvester::config::validate_appendix;
///
/// assert_eq!(validate_appendix(" 2a ").unwrap(), "2A");
/// assert!(validate_appendix("").is_err());
/// ```
pub fn validate_appendix(appendix: &str) -> Result<String> {
    let trimmed = appendix.trim();
    let valid = !trimmed.is_empty()
        && trimmed.len() <= 8
        && trimmed.chars().all(|c| c.is_ascii_alphanumeric());

    if valid {
        Ok(trimmed.to_ascii_uppercase())
    } else {
        Err(HarvesterError::InvalidAppendix(appendix.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_year_bounds() {
        assert!(validate_year(MIN_YEAR).is_ok());
        assert!(validate_year(MAX_YEAR).is_ok());
        assert_eq!(validate_year(2101), Err(HarvesterError::InvalidYear(2101)));
    }

    #[test]
    fn test_validate_chapter_and_section() {
        assert!(validate_chapter(1).is_ok());
        assert!(validate_chapter(0).is_err());
        assert!(validate_section(12).is_ok());
        assert!(validate_section(-3).is_err());
    }

    #[test]
    fn test_validate_appendix() {
        assert_eq!(validate_appendix("2A").unwrap(), "2A");
        assert_eq!(validate_appendix("b").unwrap(), "B");
        assert!(validate_appendix("   ").is_err());
        assert!(validate_appendix("2<A>").is_err());
    }

    #[test]
    fn test_url_pattern() {
        let caps = REGULATION_URL_PATTERN
            .captures("https://www.av.se/arbetsmiljoarbete-och-inspektioner/publikationer/foreskrifter/afs-202310/")
            .unwrap();
        assert_eq!(&caps[1], "2023");
        assert_eq!(&caps[2], "10");
    }
}

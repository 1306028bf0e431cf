//! Error types for the harvester.
//!
//! Parsing a document never fails as a whole: malformed nodes are skipped and
//! reported as warnings. The variants below cover the inputs that callers hand
//! in directly (regulation codes, reference strings, identifiers).

use thiserror::Error;

/// Main error type for the harvester library.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HarvesterError {
    /// Invalid regulation code format.
    #[error("Invalid regulation code: '{0}'. Expected AFS YYYY:N (e.g., AFS 2023:1)")]
    InvalidRegulationCode(String),

    /// Reference string could not be parsed.
    #[error("Invalid reference: '{0}'. Expected AFS YYYY:N[, C kap.][, S §][, AR]")]
    InvalidReference(String),

    /// Year outside the accepted range.
    #[error("Invalid year: {0}. Expected a year between {min} and {max}", min = crate::config::MIN_YEAR, max = crate::config::MAX_YEAR)]
    InvalidYear(i32),

    /// Regulation number outside the accepted range.
    #[error("Invalid regulation number: {0}. Expected a number between {min} and {max}", min = crate::config::MIN_NUMBER, max = crate::config::MAX_NUMBER)]
    InvalidNumber(i32),

    /// Chapter number must be positive.
    #[error("Invalid chapter: {0}. Expected a positive number")]
    InvalidChapter(i32),

    /// Section number must be positive.
    #[error("Invalid section: {0}. Expected a positive number")]
    InvalidSection(i32),

    /// Appendix identifier is blank or malformed.
    #[error("Invalid appendix identifier: '{0}'")]
    InvalidAppendix(String),

    /// Unknown node selection policy name.
    #[error("Unknown parse policy: '{0}'. Expected 'fine-grained' or 'boundary-walk'")]
    UnknownPolicy(String),
}

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, HarvesterError>;

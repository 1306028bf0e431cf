use std::time::Duration;

use afs_harvester::HarvesterError;
use thiserror::Error;

/// Failure classes exposed to callers of the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    Timeout,
    Conflict,
    StorageFailure,
}

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Harvester(#[from] HarvesterError),

    #[error("regular expression is empty")]
    RegexEmpty,

    #[error("invalid regular expression: {0}")]
    RegexInvalid(String),

    #[error("regular expression search exceeded {}ms", .0.as_millis())]
    RegexTimeout(Duration),

    #[error("concurrent revision conflict: {0}")]
    Conflict(String),

    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl CorpusError {
    /// Classify the error for the presentation layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidInput(_)
            | Self::Harvester(_)
            | Self::RegexEmpty
            | Self::RegexInvalid(_) => ErrorKind::InvalidInput,
            Self::RegexTimeout(_) => ErrorKind::Timeout,
            Self::Conflict(_) | Self::DuplicateKey(_) => ErrorKind::Conflict,
            Self::Database(_) | Self::Migration(_) | Self::Config(_) | Self::Task(_) => {
                ErrorKind::StorageFailure
            }
        }
    }

    /// HTTP status code equivalent of [`CorpusError::kind`].
    pub fn http_status(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            ErrorKind::InvalidInput => 400,
            ErrorKind::Timeout => 408,
            ErrorKind::Conflict => 409,
            ErrorKind::StorageFailure => 503,
        }
    }
}

/// Map a unique-index violation to [`CorpusError::Conflict`], leaving every
/// other error as is.
pub(crate) fn conflict_on_unique(error: sqlx::Error, what: impl FnOnce() -> String) -> CorpusError {
    match &error {
        sqlx::Error::Database(db) if db.is_unique_violation() => CorpusError::Conflict(what()),
        _ => CorpusError::Database(error),
    }
}

pub type Result<T> = std::result::Result<T, CorpusError>;

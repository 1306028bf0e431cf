//! AFS Corpus - versioned storage, reconstruction and search for parsed AFS
//! regulations.
//!
//! Sources own scrapes (fetched page revisions), scrapes own elements (the
//! output of [`afs_harvester::StructuralParser`]). Every table keeps its
//! history; at most one row per key is current, and every read path filters
//! on `current` explicitly.

pub mod config;
pub mod db;
pub mod elements;
pub mod error;
pub mod indexer;
pub mod lookup;
pub mod models;
pub mod reconstruct;
pub mod regex_search;
pub mod scrapes;
pub mod search;
pub mod search_log;
pub mod service;
pub mod sources;
pub mod structure;

pub use config::CorpusConfig;
pub use db::{create_pool, run_migrations};
pub use error::{CorpusError, ErrorKind, Result};
pub use models::{Element, LoggedSearch, Scrape, Source};
pub use reconstruct::SectionContent;
pub use scrapes::{RevisionOutcome, ScrapeRevision};
pub use search::{SearchHit, SearchSort};
pub use service::{Corpus, SearchResults};

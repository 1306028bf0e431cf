//! The corpus as seen by the presentation layer.
//!
//! [`Corpus`] validates identifiers, turns absent units into `NotFound`
//! errors carrying the attempted reference, and decides which searches are
//! logged.

use afs_harvester::config::{validate_appendix, validate_chapter, validate_section};
use afs_harvester::{ReferenceKey, RegulationCode};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;

use crate::config::CorpusConfig;
use crate::db;
use crate::error::{CorpusError, Result};
use crate::indexer::{self, IngestReport, ReindexSummary};
use crate::lookup::{self, ResolvedReference};
use crate::models::Source;
use crate::reconstruct::{self, SectionContent, PREVIEW_LENGTH};
use crate::regex_search::{self, is_regex_query, RegexSearch};
use crate::search::{self, clean_query, SearchHit, SearchSort};
use crate::search_log::{self, PopularSearch, RecentSearch};
use crate::sources;
use crate::structure::{self, RegulationStructure, RegulationSummary};

/// Outcome of a free-text query.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "results", rename_all = "snake_case")]
pub enum SearchResults {
    Elements(Vec<SearchHit>),
    Regex(RegexSearch),
}

#[derive(Clone)]
pub struct Corpus {
    pool: PgPool,
    config: CorpusConfig,
}

impl Corpus {
    pub fn new(pool: PgPool, config: CorpusConfig) -> Self {
        Self { pool, config }
    }

    /// Connect to the configured database and apply pending migrations.
    pub async fn connect(config: CorpusConfig) -> Result<Self> {
        let pool = db::create_pool(&config).await?;
        db::run_migrations(&pool).await?;
        Ok(Self::new(pool, config))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn config(&self) -> &CorpusConfig {
        &self.config
    }

    pub async fn create_source(&self, url: &str, settings: Option<&Value>) -> Result<Source> {
        sources::create_source(&self.pool, url, settings).await
    }

    pub async fn update_source_settings(&self, url: &str, settings: &Value) -> Result<Source> {
        sources::update_source_settings(&self.pool, url, settings).await
    }

    /// Entry point for the fetch collaborator.
    pub async fn ingest(
        &self,
        source_id: i64,
        raw_html: String,
        fetched_at: DateTime<Utc>,
    ) -> Result<IngestReport> {
        indexer::ingest(
            &self.pool,
            self.config.parse_policy,
            source_id,
            raw_html,
            fetched_at,
        )
        .await
    }

    pub async fn reindex_all(&self, concurrency: usize) -> Result<ReindexSummary> {
        indexer::reindex_all_current(&self.pool, self.config.parse_policy, concurrency).await
    }

    pub async fn list_regulations(&self) -> Result<Vec<RegulationSummary>> {
        structure::list_regulations(&self.pool).await
    }

    pub async fn get_structure(&self, year: i32, number: i32) -> Result<RegulationStructure> {
        let regulation = regulation_code(year, number)?;
        structure::regulation_structure(&self.pool, regulation).await
    }

    pub async fn get_section(
        &self,
        year: i32,
        number: i32,
        chapter: Option<i32>,
        section: i32,
    ) -> Result<SectionContent> {
        let regulation = regulation_code(year, number)?;
        if let Some(chapter) = chapter {
            validate_chapter(chapter)?;
        }
        validate_section(section)?;

        reconstruct::reconstruct_section(&self.pool, regulation, chapter, section)
            .await?
            .ok_or_else(|| {
                CorpusError::NotFound(format!(
                    "Section not found: {}",
                    ReferenceKey::section(regulation, chapter, section)
                ))
            })
    }

    pub async fn get_appendix(&self, year: i32, number: i32, appendix: &str) -> Result<String> {
        let regulation = regulation_code(year, number)?;
        let appendix = validate_appendix(appendix)?;

        reconstruct::reconstruct_appendix(&self.pool, regulation, &appendix)
            .await?
            .ok_or_else(|| {
                CorpusError::NotFound(format!("Appendix not found: {regulation}, Bilaga {appendix}"))
            })
    }

    /// Preview of a section, "1 §" when `section` is `None`.
    pub async fn section_preview(
        &self,
        year: i32,
        number: i32,
        section: Option<i32>,
    ) -> Result<Option<String>> {
        let regulation = regulation_code(year, number)?;
        let section = section.unwrap_or(1);
        validate_section(section)?;
        reconstruct::section_preview(&self.pool, regulation, section, PREVIEW_LENGTH).await
    }

    /// Canonical paths of the units matching `query`, first hit first.
    pub async fn search(&self, query: &str) -> Result<Vec<String>> {
        let hits = search::search_elements(&self.pool, query, self.config.search_limit).await?;
        Ok(search::reference_paths(&hits))
    }

    /// Run a free-text query: `/pattern/` queries go to regex search,
    /// everything else to substring search.
    ///
    /// A substring search with results is logged unless `sort` is set, which
    /// marks a re-display of an earlier search. Regex searches are never
    /// logged.
    pub async fn query(&self, query: &str, sort: Option<SearchSort>) -> Result<SearchResults> {
        let Some(query) = clean_query(query)? else {
            return Ok(SearchResults::Elements(Vec::new()));
        };

        if is_regex_query(&query) {
            let results = regex_search::regex_search(
                &self.pool,
                &query,
                self.config.search_limit,
                self.config.regex_timeout,
            )
            .await?;
            return Ok(SearchResults::Regex(results));
        }

        let mut hits = search::search_elements(&self.pool, &query, self.config.search_limit).await?;
        search::sort_hits(&mut hits, sort.unwrap_or_default());

        if sort.is_none() && !hits.is_empty() {
            if let Err(e) = search_log::log_search(&self.pool, &query, hits.len()).await {
                tracing::warn!(error = %e, "failed to log search query");
            }
        }

        Ok(SearchResults::Elements(hits))
    }

    pub async fn resolve_reference(&self, text: &str) -> Result<ResolvedReference> {
        lookup::resolve_reference(&self.pool, text).await
    }

    pub async fn recent_searches(&self) -> Result<Vec<RecentSearch>> {
        search_log::recent_searches(&self.pool).await
    }

    pub async fn popular_searches(&self) -> Result<Vec<PopularSearch>> {
        search_log::popular_searches(&self.pool).await
    }
}

fn regulation_code(year: i32, number: i32) -> Result<RegulationCode> {
    Ok(RegulationCode::new(year, number)?)
}

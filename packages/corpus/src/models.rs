use afs_harvester::{Hierarchy, RegulationCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A fetchable document location with its fetch settings.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Source {
    pub id: i64,
    pub url: String,
    pub settings: serde_json::Value,
    pub version: i32,
    pub current: bool,
    pub superseded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One fetched snapshot of a source document.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Scrape {
    pub id: i64,
    pub source_id: i64,
    pub url: String,
    pub title: Option<String>,
    pub raw_html: String,
    pub plain_text: Option<String>,
    pub content_hash: String,
    pub fetched_at: DateTime<Utc>,
    pub version: i32,
    pub current: bool,
    pub superseded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored, hierarchy-tagged content element.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Element {
    pub id: i64,
    pub scrape_id: i64,
    pub tag_name: String,
    pub element_class: Option<String>,
    pub element_id: Option<String>,
    pub text_content: String,
    pub html_snippet: String,
    pub regulation_year: Option<i32>,
    pub regulation_number: Option<i32>,
    pub chapter: Option<i32>,
    pub section: Option<i32>,
    pub appendix: Option<String>,
    pub is_transitional: bool,
    pub is_general_recommendation: bool,
    pub css_path: Option<String>,
    pub position_in_parent: Option<i32>,
    pub version: i32,
    pub current: bool,
    pub superseded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Element {
    pub fn regulation(&self) -> Option<RegulationCode> {
        Some(RegulationCode {
            year: self.regulation_year?,
            number: self.regulation_number?,
        })
    }

    pub fn hierarchy(&self) -> Hierarchy {
        Hierarchy::from_columns(
            self.chapter,
            self.section,
            self.appendix.clone(),
            self.is_transitional,
            self.is_general_recommendation,
        )
    }
}

/// One row of the search-query log.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LoggedSearch {
    pub id: i64,
    pub query: String,
    pub match_count: i32,
    pub created_at: DateTime<Utc>,
}

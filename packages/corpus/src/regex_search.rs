//! Regular-expression search: `/pattern/` queries.
//!
//! Matches are extracted from every current element text, counted per
//! distinct matched string and returned alphabetically. The search runs under
//! a query-scoped deadline; an expired search returns
//! [`CorpusError::RegexTimeout`] and nothing else.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::{CorpusError, Result};
use crate::search::check_limit;

/// Compiled program size limit, keeps pathological patterns out.
const REGEX_SIZE_LIMIT: usize = 1 << 20;

/// Texts scanned between two deadline checks.
const DEADLINE_CHECK_INTERVAL: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegexMatch {
    pub matched_string: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegexSearch {
    pub results: Vec<RegexMatch>,
    pub total_unique: usize,
    pub total_occurrences: u64,
}

/// Whether a query asks for a regex search: `/.../` with a non-empty body.
///
/// # Examples
/// ```
/// use afs_corpus::regex_search::is_regex_query;
///
/// assert!(is_regex_query("/abc\\d+/"));
/// assert!(!is_regex_query("//"));
/// assert!(!is_regex_query("abc"));
/// ```
pub fn is_regex_query(query: &str) -> bool {
    query.len() > 2 && query.starts_with('/') && query.ends_with('/')
}

/// Pattern between the delimiters of a `/pattern/` query.
pub fn extract_pattern(query: &str) -> Result<&str> {
    let pattern = query
        .strip_prefix('/')
        .and_then(|rest| rest.strip_suffix('/'))
        .unwrap_or_default();

    if pattern.trim().is_empty() {
        return Err(CorpusError::RegexEmpty);
    }
    Ok(pattern)
}

/// Compile a case-insensitive pattern.
pub fn compile_pattern(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .size_limit(REGEX_SIZE_LIMIT)
        .build()
        .map_err(|e| CorpusError::RegexInvalid(e.to_string()))
}

/// Count every match of `regex` in `texts`, alphabetically, keeping the
/// first `limit` distinct strings.
///
/// Fails with `RegexTimeout` once `deadline` has passed; nothing partial is
/// returned.
pub fn aggregate_matches<S: AsRef<str>>(
    regex: &Regex,
    texts: &[S],
    limit: usize,
    deadline: Instant,
    budget: Duration,
) -> Result<RegexSearch> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();

    for (i, text) in texts.iter().enumerate() {
        if i % DEADLINE_CHECK_INTERVAL == 0 && Instant::now() >= deadline {
            return Err(CorpusError::RegexTimeout(budget));
        }
        for found in regex.find_iter(text.as_ref()) {
            if found.as_str().is_empty() {
                continue;
            }
            *counts.entry(found.as_str().to_string()).or_default() += 1;
        }
    }

    if Instant::now() >= deadline {
        return Err(CorpusError::RegexTimeout(budget));
    }

    let results: Vec<RegexMatch> = counts
        .into_iter()
        .take(limit)
        .map(|(matched_string, count)| RegexMatch {
            matched_string,
            count,
        })
        .collect();

    Ok(RegexSearch {
        total_unique: results.len(),
        total_occurrences: results.iter().map(|m| m.count).sum(),
        results,
    })
}

/// Run a `/pattern/` query against the current corpus.
#[tracing::instrument(skip(pool))]
pub async fn regex_search(
    pool: &PgPool,
    query: &str,
    limit: i64,
    timeout: Duration,
) -> Result<RegexSearch> {
    let pattern = extract_pattern(query.trim())?;
    let regex = compile_pattern(pattern)?;
    let deadline = Instant::now() + timeout;
    let limit = usize::try_from(check_limit(limit)?).unwrap_or(usize::MAX);

    let search = async {
        let texts: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT e.text_content
            FROM elements e
            JOIN scrapes s ON s.id = e.scrape_id
            WHERE e.current AND s.current AND e.text_content <> ''
            ORDER BY e.id
            "#,
        )
        .fetch_all(pool)
        .await?;

        tracing::debug!(texts = texts.len(), "scanning element texts");
        tokio::task::spawn_blocking(move || {
            aggregate_matches(&regex, &texts, limit, deadline, timeout)
        })
        .await?
    };

    match tokio::time::timeout(timeout, search).await {
        Ok(result) => {
            if let Err(CorpusError::RegexTimeout(_)) = &result {
                tracing::warn!(pattern = %pattern, "regex search timed out");
            }
            result
        }
        Err(_) => {
            tracing::warn!(pattern = %pattern, "regex search timed out");
            Err(CorpusError::RegexTimeout(timeout))
        }
    }
}

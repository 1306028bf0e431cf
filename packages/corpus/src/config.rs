use std::time::Duration;

use afs_harvester::ParsePolicy;

use crate::error::{CorpusError, Result};

/// Default number of pooled database connections.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Default bound on substring and regex search results.
pub const DEFAULT_SEARCH_LIMIT: i64 = 500;

/// Default query-scoped deadline for regex searches.
pub const DEFAULT_REGEX_TIMEOUT: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone)]
pub struct CorpusConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub search_limit: i64,
    pub regex_timeout: Duration,
    pub parse_policy: ParsePolicy,
}

impl CorpusConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| CorpusError::Config("DATABASE_URL not set".into()))?;

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);

        let search_limit = std::env::var("AFS_SEARCH_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|limit: &i64| *limit > 0)
            .unwrap_or(DEFAULT_SEARCH_LIMIT);

        let regex_timeout = std::env::var("AFS_REGEX_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_REGEX_TIMEOUT);

        let parse_policy = match std::env::var("AFS_PARSE_POLICY") {
            Ok(value) => value
                .parse()
                .map_err(|e| CorpusError::Config(format!("AFS_PARSE_POLICY: {e}")))?,
            Err(_) => ParsePolicy::default(),
        };

        Ok(Self {
            database_url,
            max_connections,
            search_limit,
            regex_timeout,
            parse_policy,
        })
    }

    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            search_limit: DEFAULT_SEARCH_LIMIT,
            regex_timeout: DEFAULT_REGEX_TIMEOUT,
            parse_policy: ParsePolicy::default(),
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_search_limit(mut self, search_limit: i64) -> Self {
        self.search_limit = search_limit.max(1);
        self
    }

    pub fn with_regex_timeout(mut self, regex_timeout: Duration) -> Self {
        self.regex_timeout = regex_timeout;
        self
    }

    pub fn with_parse_policy(mut self, parse_policy: ParsePolicy) -> Self {
        self.parse_policy = parse_policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builder_defaults() {
        let config = CorpusConfig::new("postgres://localhost/afs");
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.search_limit, 500);
        assert_eq!(config.regex_timeout, Duration::from_secs(2));
        assert_eq!(config.parse_policy, ParsePolicy::FineGrained);
    }

    #[test]
    fn test_builder_overrides() {
        let config = CorpusConfig::new("postgres://localhost/afs")
            .with_max_connections(10)
            .with_search_limit(0)
            .with_regex_timeout(Duration::from_millis(50))
            .with_parse_policy(ParsePolicy::BoundaryWalk);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.search_limit, 1);
        assert_eq!(config.regex_timeout, Duration::from_millis(50));
        assert_eq!(config.parse_policy, ParsePolicy::BoundaryWalk);
    }
}

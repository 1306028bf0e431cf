//! Reparse every current scrape and replace its elements.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use afs_corpus::indexer::DEFAULT_REINDEX_CONCURRENCY;
use afs_corpus::{Corpus, CorpusConfig};

/// Rebuild the element index of all current AFS scrapes.
#[derive(Parser)]
#[command(name = "afs-reindex")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Scrapes reindexed at the same time
    #[arg(short, long, env = "AFS_REINDEX_CONCURRENCY", default_value_t = DEFAULT_REINDEX_CONCURRENCY)]
    concurrency: usize,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match CorpusConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            std::process::exit(1);
        }
    };

    let concurrency = cli.concurrency;
    tracing::info!(policy = %config.parse_policy, concurrency, "starting reindex");

    let corpus = match Corpus::connect(config).await {
        Ok(corpus) => corpus,
        Err(e) => {
            tracing::error!(error = %e, "failed to connect to database");
            std::process::exit(1);
        }
    };

    let reindex = tokio::select! {
        result = corpus.reindex_all(concurrency) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("received SIGINT, aborting reindex");
            std::process::exit(130);
        }
    };

    match reindex {
        Ok(summary) if summary.failed.is_empty() => {
            tracing::info!(scrapes = summary.reindexed, elements = summary.elements, "done");
        }
        Ok(summary) => {
            tracing::error!(failed = summary.failed.len(), "some scrapes could not be reindexed");
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!(error = %e, "reindex failed");
            std::process::exit(1);
        }
    }
}

//! Site crawling and indexing
//!
//! This module implements the crawl side of the system: fetching pages,
//! following in-site links, extracting lemmas and persisting the resulting
//! index, under a single global run gate with cooperative cancellation.

pub mod fetcher;
pub mod orchestrator;
pub mod task;
pub mod url;

use std::sync::Arc;

pub use fetcher::{FetchedPage, HttpPageFetcher, PageFetcher};
pub use orchestrator::{IndexingOrchestrator, OrchestratorOptions, RunState};
pub use task::{CrawlContext, CrawlSnapshot, PendingOccurrence, SiteCrawl};

use crate::config::Config;
use crate::error::Result;
use crate::lemma::LemmaAnalyzer;
use crate::storage::SharedStorage;

/// Build an orchestrator with an HTTP fetcher from configuration
pub fn orchestrator_from_config(
    config: &Config,
    storage: SharedStorage,
    analyzer: LemmaAnalyzer,
) -> Result<IndexingOrchestrator> {
    let fetcher = HttpPageFetcher::new(&config.crawler)?;
    Ok(IndexingOrchestrator::new(
        config.sites.clone(),
        storage,
        Arc::new(fetcher),
        analyzer,
        OrchestratorOptions::from(config),
    ))
}

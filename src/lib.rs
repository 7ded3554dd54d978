//! sitesearch - site crawler and lemma-based search engine
//!
//! Crawls a configured set of websites, builds an inverted index from page
//! lemmas to pages, and answers ranked AND queries with highlighted snippets.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`crawler`] - Recursive site crawling and the indexing run gate
//! - [`lemma`] - Text to lemma analysis over a pluggable morphology
//! - [`parser`] - HTML parsing and data extraction
//! - [`models`] - Core data structures and types
//! - [`storage`] - Index persistence (SQLite, in-memory)
//! - [`search`] - Ranked search and snippets
//! - [`statistics`] - Per-site index statistics
//! - [`server`] - HTTP API
//! - [`metrics`] - Prometheus metrics
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sitesearch::config::Config;
//! use sitesearch::crawler::orchestrator_from_config;
//! use sitesearch::lemma::{DictionaryMorphology, LemmaAnalyzer};
//! use sitesearch::search::{SearchEngine, SearchOptions, SearchQuery};
//! use sitesearch::storage::create_sqlite_storage;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_file("config.toml".as_ref())?;
//!     let storage = create_sqlite_storage(&config.database.sqlite_path)?;
//!     let morphology = DictionaryMorphology::from_file(&config.morphology.dictionary_path)?;
//!     let analyzer = LemmaAnalyzer::new(Arc::new(morphology), config.morphology.alphabet);
//!
//!     let orchestrator = orchestrator_from_config(&config, storage.clone(), analyzer.clone())?;
//!     orchestrator.start_all()?;
//!     orchestrator.wait_idle().await;
//!
//!     let engine = SearchEngine::new(
//!         config.sites.clone(),
//!         storage,
//!         analyzer,
//!         SearchOptions::from(&config.search),
//!     );
//!     let results = engine.search(&SearchQuery::new("кошки"))?;
//!     println!("{} pages", results.count);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod crawler;
pub mod error;
pub mod lemma;
pub mod metrics;
pub mod models;
pub mod parser;
pub mod search;
pub mod server;
pub mod statistics;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Config, SiteConfig};
    pub use crate::crawler::IndexingOrchestrator;
    pub use crate::error::{Error, ErrorCategory, Result, SiteSearchErrorTrait};
    pub use crate::lemma::{Alphabet, LemmaAnalyzer, Morphology};
    pub use crate::models::{Lemma, Occurrence, Page, Site, SiteStatus};
    pub use crate::search::{SearchEngine, SearchQuery, SearchResponse};
    pub use crate::storage::{SharedStorage, Storage};
}

// Direct re-exports for convenience
pub use models::{Lemma, Occurrence, Page, Site, SiteStatus};

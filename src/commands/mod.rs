pub mod crawl;
pub mod search;
pub mod serve;

use anyhow::{Context, Result};
use std::sync::Arc;

use sitesearch::config::Config;
use sitesearch::lemma::{DictionaryMorphology, LemmaAnalyzer};
use sitesearch::storage::{create_memory_storage, create_sqlite_storage, SharedStorage};

// Re-export command functions for convenience
pub use crawl::{crawl, stats};
pub use search::search;
pub use serve::serve;

/// Open the index storage, in memory when requested
pub fn open_storage(config: &Config, memory: bool) -> Result<SharedStorage> {
    if memory {
        tracing::info!("Using in-memory storage");
        return Ok(create_memory_storage());
    }

    let path = &config.database.sqlite_path;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create database directory: {}", parent.display()))?;
    }

    create_sqlite_storage(path)
        .with_context(|| format!("Failed to open database: {}", path.display()))
}

/// Load the morphology dictionary and build the analyzer
pub fn load_analyzer(config: &Config) -> Result<LemmaAnalyzer> {
    let morphology = DictionaryMorphology::from_file(&config.morphology.dictionary_path)?
        .with_unknown_words(config.morphology.keep_unknown_words);

    Ok(LemmaAnalyzer::new(
        Arc::new(morphology),
        config.morphology.alphabet,
    ))
}

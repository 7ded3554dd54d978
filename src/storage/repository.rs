//! Repository pattern for the index storage
//!
//! The crawler, the search engine and the statistics endpoint talk to storage
//! only through the [`Storage`] trait, enabling:
//! - In-memory storage for tests and throwaway runs
//! - SQLite storage for durable indexes
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │      IndexingOrchestrator / SearchEngine / statistics       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Storage trait                          │
//! └─────────────────────────────────────────────────────────────┘
//!                   ┌──────────┴──────────┐
//!                   ▼                     ▼
//!          ┌─────────────────┐   ┌─────────────────┐
//!          │  SqliteStorage  │   │  MemoryStorage  │
//!          └─────────────────┘   └─────────────────┘
//! ```
//!
//! All bulk saves assign storage ids to the records passed in, so callers can
//! resolve references (occurrence → page, lemma) after saving.

use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use crate::models::{EntityId, Lemma, Occurrence, Page, Site};

use super::memory::MemoryStorage;
use super::sqlite::SqliteStorage;

/// Storage gateway for sites, pages, lemmas and occurrences
pub trait Storage: Send + Sync {
    // ---- Sites ----

    /// Find the site record with this root URL
    fn find_site_by_url(&self, url: &str) -> Result<Option<Site>>;

    /// All site records, ordered by id
    fn find_all_sites(&self) -> Result<Vec<Site>>;

    /// Insert a site (id 0, id gets assigned) or update it
    fn save_site(&self, site: &mut Site) -> Result<()>;

    /// Delete a site with all of its pages, lemmas and occurrences
    fn delete_site(&self, site_id: EntityId) -> Result<()>;

    // ---- Pages ----

    /// Insert pages and assign their ids
    fn save_all_pages(&self, pages: &mut [Page]) -> Result<()>;

    /// Delete the pages of a site, returning how many were removed
    fn delete_pages_by_site(&self, site_id: EntityId) -> Result<usize>;

    /// Load pages by id; unknown ids are skipped
    fn find_pages_by_ids(&self, ids: &[EntityId]) -> Result<Vec<Page>>;

    /// Number of pages stored for a site
    fn count_pages_by_site(&self, site_id: EntityId) -> Result<usize>;

    // ---- Lemmas ----

    /// Lemma records of a site whose word is one of `lemmas`
    fn find_lemmas_by_lemma_and_site(&self, lemmas: &[String], site_id: EntityId)
        -> Result<Vec<Lemma>>;

    /// Insert lemmas and assign their ids
    fn save_all_lemmas(&self, lemmas: &mut [Lemma]) -> Result<()>;

    /// Delete the lemmas of a site, returning how many were removed
    fn delete_lemmas_by_site(&self, site_id: EntityId) -> Result<usize>;

    /// Number of lemmas stored for a site
    fn count_lemmas_by_site(&self, site_id: EntityId) -> Result<usize>;

    // ---- Occurrences ----

    /// All occurrences of one lemma record
    fn find_occurrences_by_lemma(&self, lemma_id: EntityId) -> Result<Vec<Occurrence>>;

    /// Insert occurrences and assign their ids
    fn save_all_occurrences(&self, occurrences: &mut [Occurrence]) -> Result<()>;

    /// Delete the occurrences of a site's pages, returning how many were removed
    fn delete_occurrences_by_site(&self, site_id: EntityId) -> Result<usize>;
}

// ============================================================================
// Shared Storage Types
// ============================================================================

/// Thread-safe shared storage handle
pub type SharedStorage = Arc<dyn Storage>;

/// Create a shared SQLite storage
pub fn create_sqlite_storage(path: impl AsRef<Path>) -> Result<SharedStorage> {
    let storage = SqliteStorage::new(path)?;
    Ok(Arc::new(storage))
}

/// Create a shared in-memory storage
pub fn create_memory_storage() -> SharedStorage {
    Arc::new(MemoryStorage::new())
}

// ============================================================================
// Tests
// ============================================================================

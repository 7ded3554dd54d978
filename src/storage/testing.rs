//! Storage wrapper with injectable misbehavior for unit tests

use std::collections::HashSet;
use std::time::Duration;

use crate::error::Result;
use crate::models::{EntityId, Lemma, Occurrence, Page, Site};

use super::{SharedStorage, Storage};

/// Delegates to an inner storage, hiding some pages and slowing site scans
pub(crate) struct HookedStorage {
    inner: SharedStorage,
    hidden_paths: HashSet<String>,
    scan_delay: Duration,
}

impl HookedStorage {
    pub(crate) fn new(inner: SharedStorage) -> Self {
        Self {
            inner,
            hidden_paths: HashSet::new(),
            scan_delay: Duration::ZERO,
        }
    }

    /// Page lookups miss these paths, as if a re-index removed them
    pub(crate) fn hide_path(mut self, path: &str) -> Self {
        self.hidden_paths.insert(path.to_string());
        self
    }

    /// `find_all_sites` blocks the calling thread this long
    pub(crate) fn slow_site_scan(mut self, delay: Duration) -> Self {
        self.scan_delay = delay;
        self
    }
}

impl Storage for HookedStorage {
    fn find_site_by_url(&self, url: &str) -> Result<Option<Site>> {
        self.inner.find_site_by_url(url)
    }

    fn find_all_sites(&self) -> Result<Vec<Site>> {
        if !self.scan_delay.is_zero() {
            std::thread::sleep(self.scan_delay);
        }
        self.inner.find_all_sites()
    }

    fn save_site(&self, site: &mut Site) -> Result<()> {
        self.inner.save_site(site)
    }

    fn delete_site(&self, site_id: EntityId) -> Result<()> {
        self.inner.delete_site(site_id)
    }

    fn save_all_pages(&self, pages: &mut [Page]) -> Result<()> {
        self.inner.save_all_pages(pages)
    }

    fn delete_pages_by_site(&self, site_id: EntityId) -> Result<usize> {
        self.inner.delete_pages_by_site(site_id)
    }

    fn find_pages_by_ids(&self, ids: &[EntityId]) -> Result<Vec<Page>> {
        let mut pages = self.inner.find_pages_by_ids(ids)?;
        pages.retain(|p| !self.hidden_paths.contains(&p.path));
        Ok(pages)
    }

    fn count_pages_by_site(&self, site_id: EntityId) -> Result<usize> {
        self.inner.count_pages_by_site(site_id)
    }

    fn find_lemmas_by_lemma_and_site(&self, lemmas: &[String], site_id: EntityId) -> Result<Vec<Lemma>> {
        self.inner.find_lemmas_by_lemma_and_site(lemmas, site_id)
    }

    fn save_all_lemmas(&self, lemmas: &mut [Lemma]) -> Result<()> {
        self.inner.save_all_lemmas(lemmas)
    }

    fn delete_lemmas_by_site(&self, site_id: EntityId) -> Result<usize> {
        self.inner.delete_lemmas_by_site(site_id)
    }

    fn count_lemmas_by_site(&self, site_id: EntityId) -> Result<usize> {
        self.inner.count_lemmas_by_site(site_id)
    }

    fn find_occurrences_by_lemma(&self, lemma_id: EntityId) -> Result<Vec<Occurrence>> {
        self.inner.find_occurrences_by_lemma(lemma_id)
    }

    fn save_all_occurrences(&self, occurrences: &mut [Occurrence]) -> Result<()> {
        self.inner.save_all_occurrences(occurrences)
    }

    fn delete_occurrences_by_site(&self, site_id: EntityId) -> Result<usize> {
        self.inner.delete_occurrences_by_site(site_id)
    }
}

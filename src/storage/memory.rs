//! In-memory implementation of [`Storage`]
//!
//! Used by tests and by `--memory` runs that do not need a durable index.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{Error, Result};
use crate::models::{EntityId, Lemma, Occurrence, Page, Site};

use super::repository::Storage;

#[derive(Debug, Default)]
struct Tables {
    sites: HashMap<EntityId, Site>,
    pages: HashMap<EntityId, Page>,
    lemmas: HashMap<EntityId, Lemma>,
    occurrences: HashMap<EntityId, Occurrence>,
    last_id: EntityId,
}

impl Tables {
    fn next_id(&mut self) -> EntityId {
        self.last_id += 1;
        self.last_id
    }

    fn site_page_ids(&self, site_id: EntityId) -> Vec<EntityId> {
        self.pages
            .values()
            .filter(|p| p.site_id == site_id)
            .map(|p| p.id)
            .collect()
    }

    fn remove_occurrences_of_site(&mut self, site_id: EntityId) -> usize {
        let page_ids = self.site_page_ids(site_id);
        let before = self.occurrences.len();
        self.occurrences.retain(|_, o| !page_ids.contains(&o.page_id));
        before - self.occurrences.len()
    }

    fn remove_pages_of_site(&mut self, site_id: EntityId) -> usize {
        let before = self.pages.len();
        self.pages.retain(|_, p| p.site_id != site_id);
        before - self.pages.len()
    }

    fn remove_lemmas_of_site(&mut self, site_id: EntityId) -> usize {
        let before = self.lemmas.len();
        self.lemmas.retain(|_, l| l.site_id != site_id);
        before - self.lemmas.len()
    }
}

/// In-memory storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Storage for MemoryStorage {
    fn find_site_by_url(&self, url: &str) -> Result<Option<Site>> {
        Ok(self.read().sites.values().find(|s| s.url == url).cloned())
    }

    fn find_all_sites(&self) -> Result<Vec<Site>> {
        let mut sites: Vec<Site> = self.read().sites.values().cloned().collect();
        sites.sort_by_key(|s| s.id);
        Ok(sites)
    }

    fn save_site(&self, site: &mut Site) -> Result<()> {
        let mut tables = self.write();

        if site.id == 0 {
            if tables.sites.values().any(|s| s.url == site.url) {
                return Err(Error::other(format!("site {} already exists", site.url)));
            }
            site.id = tables.next_id();
        } else if !tables.sites.contains_key(&site.id) {
            return Err(Error::other(format!("site {} does not exist", site.id)));
        }

        tables.sites.insert(site.id, site.clone());
        Ok(())
    }

    fn delete_site(&self, site_id: EntityId) -> Result<()> {
        let mut tables = self.write();
        tables.remove_occurrences_of_site(site_id);
        tables.remove_pages_of_site(site_id);
        tables.remove_lemmas_of_site(site_id);
        tables.sites.remove(&site_id);
        Ok(())
    }

    fn save_all_pages(&self, pages: &mut [Page]) -> Result<()> {
        let mut tables = self.write();
        for page in pages.iter_mut() {
            page.id = tables.next_id();
            tables.pages.insert(page.id, page.clone());
        }
        Ok(())
    }

    fn delete_pages_by_site(&self, site_id: EntityId) -> Result<usize> {
        Ok(self.write().remove_pages_of_site(site_id))
    }

    fn find_pages_by_ids(&self, ids: &[EntityId]) -> Result<Vec<Page>> {
        let tables = self.read();
        let mut pages: Vec<Page> = ids
            .iter()
            .filter_map(|id| tables.pages.get(id).cloned())
            .collect();
        pages.sort_by_key(|p| p.id);
        pages.dedup_by_key(|p| p.id);
        Ok(pages)
    }

    fn count_pages_by_site(&self, site_id: EntityId) -> Result<usize> {
        Ok(self
            .read()
            .pages
            .values()
            .filter(|p| p.site_id == site_id)
            .count())
    }

    fn find_lemmas_by_lemma_and_site(
        &self,
        lemmas: &[String],
        site_id: EntityId,
    ) -> Result<Vec<Lemma>> {
        Ok(self
            .read()
            .lemmas
            .values()
            .filter(|l| l.site_id == site_id && lemmas.contains(&l.lemma))
            .cloned()
            .collect())
    }

    fn save_all_lemmas(&self, lemmas: &mut [Lemma]) -> Result<()> {
        let mut tables = self.write();
        for lemma in lemmas.iter_mut() {
            lemma.id = tables.next_id();
            tables.lemmas.insert(lemma.id, lemma.clone());
        }
        Ok(())
    }

    fn delete_lemmas_by_site(&self, site_id: EntityId) -> Result<usize> {
        Ok(self.write().remove_lemmas_of_site(site_id))
    }

    fn count_lemmas_by_site(&self, site_id: EntityId) -> Result<usize> {
        Ok(self
            .read()
            .lemmas
            .values()
            .filter(|l| l.site_id == site_id)
            .count())
    }

    fn find_occurrences_by_lemma(&self, lemma_id: EntityId) -> Result<Vec<Occurrence>> {
        Ok(self
            .read()
            .occurrences
            .values()
            .filter(|o| o.lemma_id == lemma_id)
            .copied()
            .collect())
    }

    fn save_all_occurrences(&self, occurrences: &mut [Occurrence]) -> Result<()> {
        let mut tables = self.write();

        let dangling = occurrences.iter().find(|o| {
            !tables.pages.contains_key(&o.page_id) || !tables.lemmas.contains_key(&o.lemma_id)
        });
        if let Some(o) = dangling {
            return Err(Error::other(format!(
                "occurrence references missing page {} or lemma {}",
                o.page_id, o.lemma_id
            )));
        }

        for occurrence in occurrences.iter_mut() {
            occurrence.id = tables.next_id();
            tables.occurrences.insert(occurrence.id, *occurrence);
        }
        Ok(())
    }

    fn delete_occurrences_by_site(&self, site_id: EntityId) -> Result<usize> {
        Ok(self.write().remove_occurrences_of_site(site_id))
    }
}

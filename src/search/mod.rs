//! Ranked full-text search over the lemma index
//!
//! A query is reduced to its lemma set; every configured site contributes the
//! pages that contain *all* of those lemmas. Page relevance is the sum of the
//! per-lemma ranks, normalized so that the best page across all sites scores
//! `1.0`.
//!
//! Per site, lemma records are visited rarest first: the rarest lemma seeds
//! the candidate set and each following lemma only narrows it.

pub mod snippet;

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tracing::{debug, info, instrument};
use url::Url;

use crate::config::{SearchConfig, SiteConfig};
use crate::crawler::url::SiteScope;
use crate::lemma::LemmaAnalyzer;
use crate::metrics;
use crate::models::{EntityId, Occurrence, Page};
use crate::parser::HtmlPage;
use crate::storage::SharedStorage;
use crate::utils::error::SearchError;

/// Search request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Free-text query
    #[serde(default)]
    pub query: String,

    /// Restrict the search to one configured site root
    #[serde(default)]
    pub site: Option<String>,

    /// Number of results to skip
    #[serde(default)]
    pub offset: usize,

    /// Page size, 0 for the configured default
    #[serde(default)]
    pub limit: usize,
}

impl SearchQuery {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            ..Default::default()
        }
    }

    pub fn with_site(mut self, site: &str) -> Self {
        self.site = Some(site.to_string());
        self
    }

    pub fn with_page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }
}

/// One ranked page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Site root URL
    pub site: String,
    pub site_name: String,
    /// Page path within the site
    pub uri: String,
    pub title: String,
    /// Highlighted fragment of the page text
    pub snippet: String,
    /// Normalized relevance in `[0, 1]`
    pub relevance: f64,
}

/// Total match count and the requested slice of results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub count: usize,
    pub data: Vec<SearchResult>,
}

/// Search tuning
#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    pub snippet_max_len: usize,
    pub default_limit: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::from(&SearchConfig::default())
    }
}

impl From<&SearchConfig> for SearchOptions {
    fn from(config: &SearchConfig) -> Self {
        Self {
            snippet_max_len: config.snippet_max_len,
            default_limit: config.default_limit,
        }
    }
}

/// Page matching every query lemma on one site
#[derive(Debug, Clone)]
struct Candidate<'a> {
    site: &'a SiteConfig,
    page_id: EntityId,
    relevance: f64,
}

/// Sum page ranks over lemmas, keeping pages present in every list
///
/// The first list seeds the result; each following list drops the pages it
/// does not contain and adds its rank to the ones it does. Lists are expected
/// rarest first. No lists means no pages.
pub fn rank_pages(occurrence_lists: &[Vec<Occurrence>]) -> HashMap<EntityId, f64> {
    let ranked = occurrence_lists
        .iter()
        .fold(None::<HashMap<EntityId, f64>>, |acc, occurrences| {
            Some(match acc {
                None => occurrences
                    .iter()
                    .map(|o| (o.page_id, f64::from(o.rank)))
                    .collect(),
                Some(mut ranked) => {
                    let ranks: HashMap<EntityId, f32> =
                        occurrences.iter().map(|o| (o.page_id, o.rank)).collect();
                    ranked.retain(|page_id, _| ranks.contains_key(page_id));
                    for (page_id, relevance) in ranked.iter_mut() {
                        *relevance += f64::from(ranks[page_id]);
                    }
                    ranked
                }
            })
        });

    ranked.unwrap_or_default()
}

/// Divide every value by the maximum
pub fn normalize_relevance(values: &mut [f64]) {
    let max = values.iter().copied().fold(0.0_f64, f64::max);
    if max <= 0.0 {
        return;
    }
    for value in values.iter_mut() {
        *value /= max;
    }
}

/// Query engine over a shared storage
pub struct SearchEngine {
    sites: Vec<SiteConfig>,
    storage: SharedStorage,
    analyzer: LemmaAnalyzer,
    options: SearchOptions,
}

impl SearchEngine {
    pub fn new(
        sites: Vec<SiteConfig>,
        storage: SharedStorage,
        analyzer: LemmaAnalyzer,
        options: SearchOptions,
    ) -> Self {
        Self {
            sites,
            storage,
            analyzer,
            options,
        }
    }

    /// Run a search and record its outcome
    #[instrument(skip(self), fields(query = %query.query))]
    pub fn search(&self, query: &SearchQuery) -> Result<SearchResponse, SearchError> {
        let started = Instant::now();
        let result = self.execute(query);

        let outcome = match &result {
            Ok(_) => "ok",
            Err(SearchError::EmptyQuery) => "empty_query",
            Err(SearchError::NoResults) => "no_results",
            Err(SearchError::Storage(_)) => "error",
        };
        metrics::record_search(outcome, started.elapsed().as_secs_f64());

        match &result {
            Ok(response) => info!(count = response.count, "Search finished"),
            Err(e) => debug!(error = %e, "Search finished without results"),
        }
        result
    }

    fn execute(&self, query: &SearchQuery) -> Result<SearchResponse, SearchError> {
        if query.query.trim().is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let query_lemmas = self.analyzer.lemma_set(&query.query);
        if query_lemmas.is_empty() {
            return Err(SearchError::NoResults);
        }
        let mut lemmas: Vec<String> = query_lemmas.iter().cloned().collect();
        lemmas.sort();
        debug!(lemmas = ?lemmas, "Query lemmas");

        let mut candidates = Vec::new();
        for site in self.matching_sites(query.site.as_deref()) {
            candidates.extend(self.site_candidates(site, &lemmas)?);
        }
        if candidates.is_empty() {
            return Err(SearchError::NoResults);
        }

        let ids: Vec<EntityId> = candidates.iter().map(|c| c.page_id).collect();
        let pages: HashMap<EntityId, Page> = self
            .storage
            .find_pages_by_ids(&ids)?
            .into_iter()
            .map(|page| (page.id, page))
            .collect();

        // pages removed by a concurrent re-index drop out here
        candidates.retain(|c| pages.contains_key(&c.page_id));
        if candidates.is_empty() {
            return Err(SearchError::NoResults);
        }

        // normalize over the pages actually returned
        let mut relevance: Vec<f64> = candidates.iter().map(|c| c.relevance).collect();
        normalize_relevance(&mut relevance);
        for (candidate, value) in candidates.iter_mut().zip(relevance) {
            candidate.relevance = value;
        }

        candidates.sort_by(|a, b| {
            b.relevance
                .total_cmp(&a.relevance)
                .then_with(|| a.site.url.cmp(&b.site.url))
                .then_with(|| pages[&a.page_id].path.cmp(&pages[&b.page_id].path))
        });

        let count = candidates.len();
        let limit = match query.limit {
            0 => self.options.default_limit,
            n => n,
        };

        let data = candidates
            .iter()
            .skip(query.offset)
            .take(limit)
            .map(|c| self.to_result(c, &pages[&c.page_id], &query_lemmas))
            .collect();

        Ok(SearchResponse { count, data })
    }

    /// Configured sites selected by the optional filter
    fn matching_sites<'a>(&'a self, filter: Option<&'a str>) -> impl Iterator<Item = &'a SiteConfig> {
        self.sites.iter().filter(move |site| match filter {
            None => true,
            Some(filter) => is_same_site(&site.url, filter),
        })
    }

    fn site_candidates<'a>(
        &self,
        site: &'a SiteConfig,
        lemmas: &[String],
    ) -> Result<Vec<Candidate<'a>>, SearchError> {
        let Some(stored) = self.storage.find_site_by_url(&site.url)? else {
            debug!(site = %site.url, "Site has no index");
            return Ok(Vec::new());
        };

        let mut records = self.storage.find_lemmas_by_lemma_and_site(lemmas, stored.id)?;
        let found: HashSet<&str> = records.iter().map(|l| l.lemma.as_str()).collect();
        if found.len() < lemmas.len() {
            debug!(site = %site.url, found = found.len(), wanted = lemmas.len(), "Not every lemma is indexed on site");
            return Ok(Vec::new());
        }

        records.sort_by(|a, b| a.frequency.cmp(&b.frequency).then_with(|| a.lemma.cmp(&b.lemma)));

        let mut occurrence_lists = Vec::with_capacity(records.len());
        for lemma in &records {
            let occurrences = self.storage.find_occurrences_by_lemma(lemma.id)?;
            debug!(lemma = %lemma.lemma, pages = occurrences.len(), "Lemma pages");
            occurrence_lists.push(occurrences);
        }

        let ranked = rank_pages(&occurrence_lists);
        debug!(site = %site.url, candidates = ranked.len(), "Site candidates");

        Ok(ranked
            .into_iter()
            .map(|(page_id, relevance)| Candidate {
                site,
                page_id,
                relevance,
            })
            .collect())
    }

    fn to_result(&self, candidate: &Candidate<'_>, page: &Page, lemmas: &HashSet<String>) -> SearchResult {
        let html = HtmlPage::parse_content(&page.content);
        SearchResult {
            site: candidate.site.url.clone(),
            site_name: candidate.site.name.clone(),
            uri: page.path.clone(),
            title: html.title,
            snippet: snippet::build_snippet(
                &html.text,
                lemmas,
                &self.analyzer,
                self.options.snippet_max_len,
            ),
            relevance: candidate.relevance,
        }
    }
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine")
            .field("sites", &self.sites.len())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Compare a configured root with a user-supplied site filter
fn is_same_site(root: &str, filter: &str) -> bool {
    match (SiteScope::new(root), Url::parse(filter.trim())) {
        (Ok(scope), Ok(url)) => scope.is_root(&url),
        _ => root.trim_end_matches('/') == filter.trim().trim_end_matches('/'),
    }
}

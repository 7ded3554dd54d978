//! Recursive crawl of one site
//!
//! A [`SiteCrawl`] owns everything one site's run accumulates: the page set
//! (also the deduplication set), the lemma map and the pending occurrences.
//! Every page is handled by its own task; a task claims its path, fetches the
//! page, commits lemmas, then spawns one child task per new in-site link and
//! waits for all of them.
//!
//! Locking: each of the three collections is its own `Mutex`, and no task
//! holds more than one of them at a time or across an `.await`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use url::Url;

use crate::crawler::fetcher::PageFetcher;
use crate::crawler::url::{page_path, SiteScope};
use crate::lemma::LemmaAnalyzer;
use crate::metrics;
use crate::models::{EntityId, Lemma, Page, Site};
use crate::parser::HtmlPage;
use crate::utils::error::FetchError;

/// Services shared by the crawl tasks of a run
#[derive(Clone)]
pub struct CrawlContext {
    pub fetcher: Arc<dyn PageFetcher>,
    pub analyzer: LemmaAnalyzer,
    /// Bounds how many pages are processed at once
    pub permits: Arc<Semaphore>,
    /// Flips to `true` when the run is cancelled
    pub cancel: watch::Receiver<bool>,
}

impl CrawlContext {
    fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }
}

/// Occurrence whose page and lemma have no storage ids yet
#[derive(Debug, Clone, PartialEq)]
pub struct PendingOccurrence {
    pub path: String,
    pub lemma: String,
    pub rank: f32,
}

/// Everything a finished crawl produced
#[derive(Debug, Default)]
pub struct CrawlSnapshot {
    /// Pages sorted by path
    pub pages: Vec<Page>,
    /// Lemmas sorted by word
    pub lemmas: Vec<Lemma>,
    pub occurrences: Vec<PendingOccurrence>,
    /// Failure of the root page, formatted for the site record
    pub root_error: Option<String>,
}

/// Shared state of one site's crawl
pub struct SiteCrawl {
    site_id: EntityId,
    site_url: String,
    scope: SiteScope,
    ctx: CrawlContext,
    pages: Mutex<HashMap<String, Page>>,
    lemmas: Mutex<HashMap<String, Lemma>>,
    occurrences: Mutex<Vec<PendingOccurrence>>,
    root_error: Mutex<Option<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Resolves when the flag turns `true`; never resolves if the sender is gone
async fn cancelled(mut cancel: watch::Receiver<bool>) {
    if cancel.wait_for(|c| *c).await.is_err() {
        std::future::pending::<()>().await;
    }
}

impl SiteCrawl {
    pub fn new(site: &Site, scope: SiteScope, ctx: CrawlContext) -> Arc<Self> {
        Arc::new(Self {
            site_id: site.id,
            site_url: site.url.clone(),
            scope,
            ctx,
            pages: Mutex::new(HashMap::new()),
            lemmas: Mutex::new(HashMap::new()),
            occurrences: Mutex::new(Vec::new()),
            root_error: Mutex::new(None),
        })
    }

    /// Crawl the whole site from its root and hand over the results
    pub async fn run(self: Arc<Self>) -> CrawlSnapshot {
        let root = self.scope.root().clone();
        Arc::clone(&self).crawl_page(root, true).await;
        self.take_snapshot()
    }

    fn crawl_page(self: Arc<Self>, url: Url, is_root: bool) -> BoxFuture<'static, ()> {
        async move {
            let path = page_path(&url);
            if !self.claim(&path) || self.ctx.is_cancelled() {
                return;
            }

            let links = {
                let Ok(_permit) = self.ctx.permits.acquire().await else {
                    return;
                };
                match self.process(&url, &path, is_root).await {
                    Some(links) => links,
                    None => return,
                }
            };

            if links.is_empty() {
                return;
            }

            tracing::debug!(
                site = %self.site_url,
                path = %path,
                children = links.len(),
                "Spawning child crawl tasks"
            );

            let mut children = JoinSet::new();
            for link in links {
                children.spawn(Arc::clone(&self).crawl_page(link, false));
            }
            while let Some(joined) = children.join_next().await {
                if let Err(e) = joined {
                    if e.is_panic() {
                        tracing::error!(site = %self.site_url, "Crawl task panicked: {}", e);
                    }
                }
            }
        }
        .boxed()
    }

    /// Insert a placeholder page; `false` if the path was already claimed
    fn claim(&self, path: &str) -> bool {
        let mut pages = lock(&self.pages);
        if pages.contains_key(path) {
            return false;
        }
        pages.insert(path.to_string(), Page::new(self.site_id, path));
        true
    }

    /// Fetch and index one page, returning the links to follow
    async fn process(&self, url: &Url, path: &str, is_root: bool) -> Option<Vec<Url>> {
        let fetched = tokio::select! {
            biased;
            _ = cancelled(self.ctx.cancel.clone()) => Err(FetchError::Interrupted),
            result = self.ctx.fetcher.fetch(url) => result,
        };

        let fetched = match fetched {
            Ok(fetched) => fetched,
            Err(err) => {
                self.record_failure(url, path, is_root, &err);
                return None;
            }
        };

        metrics::record_page_fetched(&self.site_url);
        self.update_page(path, fetched.status, fetched.body.as_deref().unwrap_or_default());

        let body = fetched.body?;
        if self.ctx.is_cancelled() {
            return None;
        }

        let html = HtmlPage::parse(&body, url);
        let counts = self.ctx.analyzer.lemma_frequencies(&html.text);
        self.commit_lemmas(path, counts);

        let mut links = self.scope.follow_links(url, &html.links);
        {
            let pages = lock(&self.pages);
            links.retain(|link| !pages.contains_key(&page_path(link)));
        }

        tracing::debug!(
            site = %self.site_url,
            path = %path,
            status = fetched.status,
            links = links.len(),
            "Page indexed"
        );
        Some(links)
    }

    fn record_failure(&self, url: &Url, path: &str, is_root: bool, err: &FetchError) {
        metrics::record_fetch_error(err.kind());
        self.update_page(path, err.status_code().unwrap_or_default(), "");

        if is_root {
            tracing::warn!(site = %self.site_url, error = %err, "Root page failed");
            *lock(&self.root_error) = Some(err.site_message(url.as_str()));
        } else {
            tracing::debug!(site = %self.site_url, url = %url, error = %err, "Page fetch failed");
        }
    }

    fn update_page(&self, path: &str, code: u16, content: &str) {
        if let Some(page) = lock(&self.pages).get_mut(path) {
            page.code = code;
            page.content = content.to_string();
        }
    }

    /// Frequency counts once per page; rank is the in-page count
    fn commit_lemmas(&self, path: &str, counts: HashMap<String, u32>) {
        {
            let mut lemmas = lock(&self.lemmas);
            for lemma in counts.keys() {
                lemmas
                    .entry(lemma.clone())
                    .or_insert_with(|| Lemma::new(self.site_id, lemma))
                    .frequency += 1;
            }
        }

        let mut occurrences = lock(&self.occurrences);
        occurrences.extend(counts.into_iter().map(|(lemma, rank)| PendingOccurrence {
            path: path.to_string(),
            lemma,
            rank: rank as f32,
        }));
    }

    fn take_snapshot(&self) -> CrawlSnapshot {
        let mut pages: Vec<Page> = std::mem::take(&mut *lock(&self.pages)).into_values().collect();
        pages.sort_by(|a, b| a.path.cmp(&b.path));

        let mut lemmas: Vec<Lemma> = std::mem::take(&mut *lock(&self.lemmas))
            .into_values()
            .collect();
        lemmas.sort_by(|a, b| a.lemma.cmp(&b.lemma));

        CrawlSnapshot {
            pages,
            lemmas,
            occurrences: std::mem::take(&mut *lock(&self.occurrences)),
            root_error: lock(&self.root_error).take(),
        }
    }
}

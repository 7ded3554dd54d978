//! Indexing orchestrator
//!
//! Owns the single global run slot, the worker permits and the cancellation
//! flag. A run starts one crawl tree per site; each site is persisted on its
//! own as soon as its tree has joined.
//!
//! # Run lifecycle
//!
//! ```text
//!  start_all / index_one          site runs finish
//!  IDLE ───────────────► RUNNING ─────────────────► IDLE
//!                           │
//!                           │ stop_all
//!                           ▼
//!                        STOPPING ── cancel, drain up to the grace period,
//!                           │        abort leftovers, mark sites FAILED
//!                           ▼
//!                          IDLE
//! ```
//!
//! Storage calls are synchronous and run on the blocking pool.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use url::Url;

use crate::config::{Config, SiteConfig};
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::task::{CrawlContext, CrawlSnapshot, SiteCrawl};
use crate::crawler::url::SiteScope;
use crate::error::{Error, Result, CANCELLED_MESSAGE};
use crate::lemma::LemmaAnalyzer;
use crate::metrics;
use crate::models::{EntityId, Occurrence, Site, SiteStatus};
use crate::storage::{SharedStorage, Storage};
use crate::utils::error::IndexingError;
use crate::utils::resolve_workers;

/// Global run state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    /// `stop_all` is draining the run; new runs are rejected
    Stopping,
}

/// Orchestrator tuning
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Pages processed at once across all sites
    pub workers: usize,

    /// How long `stop_all` waits for tasks to drain before aborting them
    pub stop_grace: Duration,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            workers: resolve_workers(0),
            stop_grace: Duration::from_secs(5),
        }
    }
}

impl From<&Config> for OrchestratorOptions {
    fn from(config: &Config) -> Self {
        Self {
            workers: resolve_workers(config.crawler.workers),
            stop_grace: config.stop_grace(),
        }
    }
}

struct Inner {
    sites: Vec<SiteConfig>,
    storage: SharedStorage,
    fetcher: Arc<dyn PageFetcher>,
    analyzer: LemmaAnalyzer,
    options: OrchestratorOptions,
    permits: Arc<Semaphore>,
    state: watch::Sender<RunState>,
    cancel: watch::Sender<bool>,
    /// Site runs not finished yet
    live_runs: watch::Sender<usize>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

/// Starts, tracks and stops indexing runs
///
/// Cloning is cheap; clones share the same run slot.
#[derive(Clone)]
pub struct IndexingOrchestrator {
    inner: Arc<Inner>,
}

/// Releases one site run; the last one of a run that is not being stopped
/// returns the orchestrator to IDLE
struct RunGuard {
    inner: Arc<Inner>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let mut last = false;
        self.inner.live_runs.send_modify(|n| {
            *n = n.saturating_sub(1);
            last = *n == 0;
        });

        if last && self.inner.transition(RunState::Running, RunState::Idle) {
            metrics::set_indexing_active(false);
            tracing::info!("Indexing finished");
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl IndexingOrchestrator {
    pub fn new(
        sites: Vec<SiteConfig>,
        storage: SharedStorage,
        fetcher: Arc<dyn PageFetcher>,
        analyzer: LemmaAnalyzer,
        options: OrchestratorOptions,
    ) -> Self {
        let (state, _) = watch::channel(RunState::Idle);
        let (cancel, _) = watch::channel(false);
        let (live_runs, _) = watch::channel(0);
        let permits = Arc::new(Semaphore::new(options.workers.max(1)));

        Self {
            inner: Arc::new(Inner {
                sites,
                storage,
                fetcher,
                analyzer,
                options,
                permits,
                state,
                cancel,
                live_runs,
                handles: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Check whether a run is active or being stopped
    pub fn is_indexing(&self) -> bool {
        *self.inner.state.borrow() != RunState::Idle
    }

    /// Current run state
    pub fn state(&self) -> RunState {
        *self.inner.state.borrow()
    }

    /// Index every configured site
    ///
    /// # Errors
    ///
    /// Returns `IndexingError::AlreadyRunning` if a run is active.
    pub fn start_all(&self) -> std::result::Result<(), IndexingError> {
        self.begin()?;
        tracing::info!(sites = self.inner.sites.len(), "Indexing of all sites started");
        self.launch(self.inner.sites.clone());
        Ok(())
    }

    /// Re-index the configured site whose root URL is `url`
    ///
    /// # Errors
    ///
    /// Returns `IndexingError::AlreadyRunning` if a run is active, and
    /// `IndexingError::OutOfScope` if `url` is not a configured site root.
    pub fn index_one(&self, url: &str) -> std::result::Result<(), IndexingError> {
        if self.is_indexing() {
            return Err(IndexingError::AlreadyRunning);
        }

        let site = self
            .site_for_root(url)
            .ok_or_else(|| IndexingError::OutOfScope(url.to_string()))?;

        self.begin()?;
        tracing::info!(site = %site.url, "Indexing of one site started");
        self.launch(vec![site]);
        Ok(())
    }

    /// Cancel the active run
    ///
    /// Waits up to the stop grace period for tasks to drain, aborts what is
    /// left, then marks every stored site that is not INDEXED as FAILED. The
    /// slot stays taken until the sites are marked.
    ///
    /// # Errors
    ///
    /// Returns `IndexingError::NotRunning` if no run is active, and
    /// `IndexingError::Storage` if the sites cannot be updated.
    pub async fn stop_all(&self) -> std::result::Result<(), IndexingError> {
        if !self.inner.transition(RunState::Running, RunState::Stopping) {
            return Err(IndexingError::NotRunning);
        }

        tracing::info!("Stopping indexing");
        self.inner.cancel.send_replace(true);

        let mut live_runs = self.inner.live_runs.subscribe();
        let drained = tokio::time::timeout(
            self.inner.options.stop_grace,
            live_runs.wait_for(|n| *n == 0),
        )
        .await
        .is_ok();

        if !drained {
            let handles = std::mem::take(&mut *lock(&self.inner.handles));
            tracing::warn!(
                runs = handles.len(),
                "Crawl tasks did not stop within the grace period, aborting"
            );
            for handle in &handles {
                handle.abort();
            }
            for handle in handles {
                let _ = handle.await;
            }
        }

        let marked = self.inner.with_storage(mark_cancelled).await;

        self.inner.state.send_replace(RunState::Idle);
        metrics::set_indexing_active(false);
        tracing::info!("Indexing stopped");

        marked.map_err(IndexingError::from)
    }

    /// Wait until no run is active
    pub async fn wait_idle(&self) {
        let mut state = self.inner.state.subscribe();
        let _ = state.wait_for(|s| *s == RunState::Idle).await;
    }

    /// Configured sites
    pub fn sites(&self) -> &[SiteConfig] {
        &self.inner.sites
    }

    fn site_for_root(&self, url: &str) -> Option<SiteConfig> {
        let url = Url::parse(url.trim()).ok()?;
        self.inner
            .sites
            .iter()
            .find(|site| {
                SiteScope::new(&site.url)
                    .map(|scope| scope.is_root(&url))
                    .unwrap_or(false)
            })
            .cloned()
    }

    /// Flip IDLE to RUNNING, atomically
    fn begin(&self) -> std::result::Result<(), IndexingError> {
        if self.inner.transition(RunState::Idle, RunState::Running) {
            Ok(())
        } else {
            Err(IndexingError::AlreadyRunning)
        }
    }

    fn launch(&self, sites: Vec<SiteConfig>) {
        self.inner.cancel.send_replace(false);

        if sites.is_empty() {
            self.inner.transition(RunState::Running, RunState::Idle);
            return;
        }

        metrics::set_indexing_active(true);
        self.inner.live_runs.send_modify(|n| *n += sites.len());

        let mut handles = lock(&self.inner.handles);
        handles.clear();
        for site in sites {
            let guard = RunGuard {
                inner: Arc::clone(&self.inner),
            };
            let inner = Arc::clone(&self.inner);
            handles.push(tokio::spawn(async move {
                let _guard = guard;
                inner.run_site(site).await;
            }));
        }
    }
}

impl Inner {
    fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Compare-and-set on the run state
    fn transition(&self, from: RunState, to: RunState) -> bool {
        self.state.send_if_modified(|state| {
            if *state == from {
                *state = to;
                true
            } else {
                false
            }
        })
    }

    /// Run a storage job on the blocking pool
    async fn with_storage<T, F>(&self, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn Storage) -> Result<T> + Send + 'static,
    {
        let storage = Arc::clone(&self.storage);
        tokio::task::spawn_blocking(move || job(storage.as_ref()))
            .await
            .map_err(|e| Error::with_source("Storage task failed", e))?
    }

    fn crawl_context(&self) -> CrawlContext {
        CrawlContext {
            fetcher: Arc::clone(&self.fetcher),
            analyzer: self.analyzer.clone(),
            permits: Arc::clone(&self.permits),
            cancel: self.cancel.subscribe(),
        }
    }

    async fn run_site(&self, config: SiteConfig) {
        let _timer = metrics::start_site_run_timer(&config.url);

        let prepared = {
            let config = config.clone();
            self.with_storage(move |storage| prepare_site(storage, &config))
                .await
        };
        let mut site = match prepared {
            Ok(site) => site,
            Err(e) => {
                tracing::error!(site = %config.url, "Failed to prepare site: {}", e);
                metrics::record_site_run("failed");
                return;
            }
        };

        let scope = match SiteScope::new(&config.url) {
            Ok(scope) => scope,
            Err(e) => {
                tracing::error!(site = %config.url, "Invalid site URL: {}", e);
                site.fail(format!("{} - неверная ссылка", config.url));
                self.save_final(site, "failed").await;
                return;
            }
        };

        let crawl = SiteCrawl::new(&site, scope, self.crawl_context());
        let snapshot = crawl.run().await;

        if self.is_cancelled() {
            tracing::info!(site = %site.url, "Indexing of site cancelled");
            metrics::record_site_run("cancelled");
            return;
        }

        tracing::info!(
            site = %site.url,
            pages = snapshot.pages.len(),
            lemmas = snapshot.lemmas.len(),
            occurrences = snapshot.occurrences.len(),
            "Crawl finished, saving index"
        );

        let outcome = match self.with_storage(move |storage| persist(storage, snapshot)).await {
            Ok(Some(root_error)) => {
                site.fail(root_error);
                "failed"
            }
            Ok(None) => {
                site.last_error.clear();
                site.set_status(SiteStatus::Indexed);
                "indexed"
            }
            Err(e) => {
                tracing::error!(site = %site.url, "Failed to save index: {}", e);
                site.fail(format!("Ошибка сохранения: {e}"));
                "failed"
            }
        };
        self.save_final(site, outcome).await;
    }

    async fn save_final(&self, mut site: Site, outcome: &str) {
        site.status_time = chrono::Utc::now();
        let url = site.url.clone();
        let status = site.status;
        let last_error = site.last_error.clone();

        if let Err(e) = self
            .with_storage(move |storage| storage.save_site(&mut site))
            .await
        {
            tracing::error!(site = %url, "Failed to save site status: {}", e);
        }
        metrics::record_site_run(outcome);
        tracing::info!(
            site = %url,
            status = %status,
            error = %last_error,
            "Indexing of site completed"
        );
    }
}

/// Reset or create the site record and drop its previous index
fn prepare_site(storage: &dyn Storage, config: &SiteConfig) -> Result<Site> {
    let mut site = match storage.find_site_by_url(&config.url)? {
        Some(mut existing) => {
            existing.name = config.name.clone();
            existing.last_error.clear();
            existing.set_status(SiteStatus::Indexing);

            let occurrences = storage.delete_occurrences_by_site(existing.id)?;
            let pages = storage.delete_pages_by_site(existing.id)?;
            let lemmas = storage.delete_lemmas_by_site(existing.id)?;
            tracing::info!(
                site = %existing.url,
                pages,
                lemmas,
                occurrences,
                "Previous index data deleted"
            );
            existing
        }
        None => Site::new(&config.name, &config.url),
    };

    storage.save_site(&mut site)?;
    Ok(site)
}

/// Bulk-save pages, lemmas and occurrences; returns the root page error
fn persist(storage: &dyn Storage, snapshot: CrawlSnapshot) -> Result<Option<String>> {
    let mut pages = snapshot.pages;
    storage.save_all_pages(&mut pages)?;
    let page_ids: HashMap<&str, EntityId> =
        pages.iter().map(|p| (p.path.as_str(), p.id)).collect();

    let mut lemmas = snapshot.lemmas;
    storage.save_all_lemmas(&mut lemmas)?;
    let lemma_ids: HashMap<&str, EntityId> =
        lemmas.iter().map(|l| (l.lemma.as_str(), l.id)).collect();

    let mut occurrences: Vec<Occurrence> = snapshot
        .occurrences
        .iter()
        .filter_map(|o| {
            let page_id = page_ids.get(o.path.as_str())?;
            let lemma_id = lemma_ids.get(o.lemma.as_str())?;
            Some(Occurrence::new(*page_id, *lemma_id, o.rank))
        })
        .collect();
    storage.save_all_occurrences(&mut occurrences)?;

    Ok(snapshot.root_error)
}

/// Mark every stored site that did not finish as cancelled
fn mark_cancelled(storage: &dyn Storage) -> Result<()> {
    for mut site in storage.find_all_sites()? {
        if site.status != SiteStatus::Indexed {
            site.fail(CANCELLED_MESSAGE);
            storage.save_site(&mut site)?;
            tracing::info!(site = %site.url, "Site marked as cancelled");
        }
    }
    Ok(())
}

//! Common test utilities

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use sitesearch::config::{CrawlerConfig, SiteConfig};
use sitesearch::crawler::{HttpPageFetcher, IndexingOrchestrator, OrchestratorOptions};
use sitesearch::lemma::{Alphabet, DictionaryMorphology, LemmaAnalyzer};
use sitesearch::search::{SearchEngine, SearchOptions};
use sitesearch::storage::SharedStorage;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Small dictionary in the on-disk TSV format
pub const TEST_DICTIONARY: &str = "\
# form\tlemma\ttags
кот\tкот\tС мр,ед,им
кота\tкот\tС мр,ед,рд
коты\tкот\tС мр,мн,им
кошка\tкот\tС жр,ед,им
кошки\tкот\tС жр,мн,им
собака\tсобака\tС жр,ед,им
собаки\tсобака\tС жр,мн,им
дом\tдом\tС мр,ед,им
спит\tспать\tГ ед,3л
спят\tспать\tГ мн,3л
и\tи\tСОЮЗ
в\tв\tПРЕДЛ
ох\tох\tМЕЖД
";

/// Analyzer over [`TEST_DICTIONARY`]
pub fn test_analyzer() -> LemmaAnalyzer {
    let morphology = DictionaryMorphology::parse(TEST_DICTIONARY).expect("test dictionary");
    LemmaAnalyzer::new(Arc::new(morphology), Alphabet::Cyrillic)
}

/// Crawler settings without pauses and with a short timeout
pub fn test_crawler_config() -> CrawlerConfig {
    CrawlerConfig {
        request_delay_ms: 0,
        request_timeout_secs: 2,
        ..Default::default()
    }
}

pub fn test_options() -> OrchestratorOptions {
    OrchestratorOptions {
        workers: 4,
        stop_grace: Duration::from_secs(2),
    }
}

/// Orchestrator fetching over HTTP
pub fn http_orchestrator(sites: Vec<SiteConfig>, storage: SharedStorage) -> IndexingOrchestrator {
    let fetcher = HttpPageFetcher::new(&test_crawler_config()).expect("fetcher");
    IndexingOrchestrator::new(
        sites,
        storage,
        Arc::new(fetcher),
        test_analyzer(),
        test_options(),
    )
}

pub fn search_engine(sites: Vec<SiteConfig>, storage: SharedStorage) -> SearchEngine {
    SearchEngine::new(sites, storage, test_analyzer(), SearchOptions::default())
}

/// Wrap body markup into a page
pub fn html_page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><title>{title}</title></head><body>{body}</body></html>"
    )
}

/// Serve an HTML page at `route`
pub async fn mount_page(server: &MockServer, route: &str, html: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(html, "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

/// Serve an HTML page at `route`, answering at most once
pub async fn mount_page_once(server: &MockServer, route: &str, html: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(html, "text/html; charset=utf-8"),
        )
        .expect(1)
        .mount(server)
        .await;
}

/// Mount a three-page site with a link cycle
///
/// ```text
/// /       -> /cats, /dogs
/// /cats   -> /, /dogs
/// /dogs   -> /cats
/// ```
pub async fn mount_pet_site(server: &MockServer) {
    mount_page_once(
        server,
        "/",
        html_page(
            "Главная",
            r#"<p>Дом и кот.</p><a href="/cats">Кошки</a> <a href="/dogs">Собаки</a>"#,
        ),
    )
    .await;
    mount_page_once(
        server,
        "/cats",
        html_page(
            "Кошки",
            r#"<p>Кошка спит. Коты спят, кошки спят.</p><a href="/">Главная</a> <a href="/dogs#top">Собаки</a>"#,
        ),
    )
    .await;
    mount_page_once(
        server,
        "/dogs",
        html_page(
            "Собаки",
            r#"<p>Собака и кошка в доме.</p><a href="/cats?sort=asc">Кошки</a> <a href="/cats">Кошки</a>"#,
        ),
    )
    .await;
}

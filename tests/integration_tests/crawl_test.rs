//! Crawl and orchestrator integration tests
//!
//! Sites are served by wiremock and indexed into the in-memory storage.

use std::time::Duration;

use sitesearch::config::SiteConfig;
use sitesearch::error::CANCELLED_MESSAGE;
use sitesearch::models::SiteStatus;
use sitesearch::storage::{create_memory_storage, create_sqlite_storage, SharedStorage};
use sitesearch::utils::error::IndexingError;
use tempfile::TempDir;
use wiremock::MockServer;

use crate::common::{html_page, http_orchestrator, mount_page, mount_pet_site};

use super::fixtures::{mount_cat_site, mount_slow_page, mount_status, CAT_PAGE_HTML};

fn lemma_frequency(storage: &SharedStorage, site_id: i64, lemma: &str) -> Option<u32> {
    storage
        .find_lemmas_by_lemma_and_site(&[lemma.to_string()], site_id)
        .unwrap()
        .first()
        .map(|l| l.frequency)
}

#[tokio::test]
async fn test_crawl_fetches_every_page_once() {
    let server = MockServer::start().await;
    mount_pet_site(&server).await;

    let storage = create_memory_storage();
    let orchestrator =
        http_orchestrator(vec![SiteConfig::new("Питомцы", &server.uri())], storage.clone());

    orchestrator.start_all().unwrap();
    orchestrator.wait_idle().await;
    assert!(!orchestrator.is_indexing());

    let site = storage.find_site_by_url(&server.uri()).unwrap().unwrap();
    assert_eq!(site.status, SiteStatus::Indexed);
    assert!(site.last_error.is_empty());
    assert_eq!(storage.count_pages_by_site(site.id).unwrap(), 3);

    // frequency counts pages, not occurrences
    assert_eq!(lemma_frequency(&storage, site.id, "кот"), Some(3));
    assert_eq!(lemma_frequency(&storage, site.id, "собака"), Some(3));
    assert_eq!(lemma_frequency(&storage, site.id, "спать"), Some(1));
    assert_eq!(lemma_frequency(&storage, site.id, "дом"), Some(1));
    assert_eq!(lemma_frequency(&storage, site.id, "и"), None);
    assert_eq!(storage.count_lemmas_by_site(site.id).unwrap(), 4);
}

#[tokio::test]
async fn test_rank_is_in_page_occurrence_count() {
    let server = MockServer::start().await;
    mount_pet_site(&server).await;

    let storage = create_memory_storage();
    let orchestrator =
        http_orchestrator(vec![SiteConfig::new("Питомцы", &server.uri())], storage.clone());
    orchestrator.start_all().unwrap();
    orchestrator.wait_idle().await;

    let site = storage.find_site_by_url(&server.uri()).unwrap().unwrap();
    let lemma = storage
        .find_lemmas_by_lemma_and_site(&["спать".to_string()], site.id)
        .unwrap()
        .remove(0);
    let occurrences = storage.find_occurrences_by_lemma(lemma.id).unwrap();
    assert_eq!(occurrences.len(), 1);
    assert_eq!(occurrences[0].rank, 3.0);

    let page = storage
        .find_pages_by_ids(&[occurrences[0].page_id])
        .unwrap()
        .remove(0);
    assert_eq!(page.path, "/cats");
    assert_eq!(page.code, 200);
    assert!(page.content.contains("Коты спят"));
}

#[tokio::test]
async fn test_sub_page_errors_are_stored_but_do_not_fail_the_site() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        html_page("Главная", r#"<p>кот</p><a href="/missing">битая</a> <a href="/broken">сломанная</a>"#),
    )
    .await;
    mount_status(&server, "/missing", 404).await;
    mount_status(&server, "/broken", 500).await;

    let storage = create_memory_storage();
    let orchestrator =
        http_orchestrator(vec![SiteConfig::new("Сайт", &server.uri())], storage.clone());
    orchestrator.start_all().unwrap();
    orchestrator.wait_idle().await;

    let site = storage.find_site_by_url(&server.uri()).unwrap().unwrap();
    assert_eq!(site.status, SiteStatus::Indexed);
    assert_eq!(storage.count_pages_by_site(site.id).unwrap(), 3);
    assert_eq!(storage.count_lemmas_by_site(site.id).unwrap(), 1);
}

#[tokio::test]
async fn test_root_failure_marks_site_failed() {
    let server = MockServer::start().await;
    mount_status(&server, "/", 503).await;

    let storage = create_memory_storage();
    let orchestrator =
        http_orchestrator(vec![SiteConfig::new("Сайт", &server.uri())], storage.clone());
    orchestrator.start_all().unwrap();
    orchestrator.wait_idle().await;

    let site = storage.find_site_by_url(&server.uri()).unwrap().unwrap();
    assert_eq!(site.status, SiteStatus::Failed);
    assert!(site.last_error.contains("503"), "error was {}", site.last_error);
}

#[tokio::test]
async fn test_unreachable_site_fails_without_blocking_others() {
    let server = MockServer::start().await;
    mount_cat_site(&server).await;

    let storage = create_memory_storage();
    let orchestrator = http_orchestrator(
        vec![
            SiteConfig::new("Живой", &server.uri()),
            SiteConfig::new("Мёртвый", "http://127.0.0.1:1"),
        ],
        storage.clone(),
    );
    orchestrator.start_all().unwrap();
    orchestrator.wait_idle().await;

    let alive = storage.find_site_by_url(&server.uri()).unwrap().unwrap();
    let dead = storage.find_site_by_url("http://127.0.0.1:1").unwrap().unwrap();
    assert_eq!(alive.status, SiteStatus::Indexed);
    assert_eq!(dead.status, SiteStatus::Failed);
    assert!(!dead.last_error.is_empty());
}

#[tokio::test]
async fn test_second_start_is_rejected_while_running() {
    let server = MockServer::start().await;
    mount_slow_page(&server, "/", CAT_PAGE_HTML, Duration::from_millis(500)).await;

    let storage = create_memory_storage();
    let orchestrator =
        http_orchestrator(vec![SiteConfig::new("Сайт", &server.uri())], storage.clone());

    orchestrator.start_all().unwrap();
    assert!(orchestrator.is_indexing());
    assert!(matches!(
        orchestrator.start_all(),
        Err(IndexingError::AlreadyRunning)
    ));
    assert!(matches!(
        orchestrator.index_one(&server.uri()),
        Err(IndexingError::AlreadyRunning)
    ));

    orchestrator.wait_idle().await;
    assert!(orchestrator.start_all().is_ok());
    orchestrator.wait_idle().await;
}

#[tokio::test]
async fn test_stop_marks_unfinished_sites_cancelled() {
    let server = MockServer::start().await;
    mount_slow_page(&server, "/", CAT_PAGE_HTML, Duration::from_secs(10)).await;

    let storage = create_memory_storage();
    let orchestrator =
        http_orchestrator(vec![SiteConfig::new("Сайт", &server.uri())], storage.clone());

    assert!(matches!(
        orchestrator.stop_all().await,
        Err(IndexingError::NotRunning)
    ));

    orchestrator.start_all().unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    orchestrator.stop_all().await.unwrap();

    assert!(!orchestrator.is_indexing());
    let site = storage.find_site_by_url(&server.uri()).unwrap().unwrap();
    assert_eq!(site.status, SiteStatus::Failed);
    assert_eq!(site.last_error, CANCELLED_MESSAGE);
    assert_eq!(storage.count_pages_by_site(site.id).unwrap(), 0);

    // a new run may start right away
    assert!(orchestrator.start_all().is_ok());
    orchestrator.stop_all().await.unwrap();
}

#[tokio::test]
async fn test_index_one_rejects_unknown_urls() {
    let server = MockServer::start().await;
    mount_cat_site(&server).await;

    let storage = create_memory_storage();
    let orchestrator =
        http_orchestrator(vec![SiteConfig::new("Сайт", &server.uri())], storage.clone());

    for url in ["https://other.test/", "not a url", &format!("{}/dogs", server.uri())] {
        assert!(
            matches!(orchestrator.index_one(url), Err(IndexingError::OutOfScope(_))),
            "{url} should be out of scope"
        );
    }
    assert!(!orchestrator.is_indexing());
}

#[tokio::test]
async fn test_index_one_replaces_previous_index() {
    let server = MockServer::start().await;
    mount_cat_site(&server).await;

    let storage = create_memory_storage();
    let orchestrator =
        http_orchestrator(vec![SiteConfig::new("Сайт", &server.uri())], storage.clone());

    orchestrator.start_all().unwrap();
    orchestrator.wait_idle().await;
    let first = storage.find_site_by_url(&server.uri()).unwrap().unwrap();
    let pages = storage.count_pages_by_site(first.id).unwrap();
    let lemmas = storage.count_lemmas_by_site(first.id).unwrap();
    assert_eq!(pages, 2);

    orchestrator.index_one(&format!("{}/", server.uri())).unwrap();
    orchestrator.wait_idle().await;

    let second = storage.find_site_by_url(&server.uri()).unwrap().unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.status, SiteStatus::Indexed);
    assert_eq!(storage.count_pages_by_site(second.id).unwrap(), pages);
    assert_eq!(storage.count_lemmas_by_site(second.id).unwrap(), lemmas);
    assert_eq!(storage.find_all_sites().unwrap().len(), 1);
}

#[tokio::test]
async fn test_crawl_into_sqlite_survives_reopen() {
    let server = MockServer::start().await;
    mount_cat_site(&server).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("index.db");

    {
        let storage = create_sqlite_storage(&db_path).unwrap();
        let orchestrator =
            http_orchestrator(vec![SiteConfig::new("Сайт", &server.uri())], storage.clone());
        orchestrator.start_all().unwrap();
        orchestrator.wait_idle().await;
    }

    let storage = create_sqlite_storage(&db_path).unwrap();
    let site = storage.find_site_by_url(&server.uri()).unwrap().unwrap();
    assert_eq!(site.status, SiteStatus::Indexed);
    assert_eq!(storage.count_pages_by_site(site.id).unwrap(), 2);
}

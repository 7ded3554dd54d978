//! Error scenario integration tests
//!
//! Covers responses a real site throws at the crawler: slow pages, broken
//! markup, non-HTML resources and legacy encodings.

use std::time::Duration;

use sitesearch::config::SiteConfig;
use sitesearch::models::{Page, SiteStatus};
use sitesearch::storage::{create_memory_storage, SharedStorage};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{html_page, http_orchestrator, mount_page};

use super::fixtures::{mount_slow_page, DOG_PAGE_HTML};

async fn crawl(server: &MockServer) -> SharedStorage {
    let storage = create_memory_storage();
    let orchestrator =
        http_orchestrator(vec![SiteConfig::new("Сайт", &server.uri())], storage.clone());
    orchestrator.start_all().unwrap();
    orchestrator.wait_idle().await;
    storage
}

fn stored_page(storage: &SharedStorage, site_id: i64, page_path: &str) -> Option<Page> {
    // pages are only reachable by id; the in-memory ids stay small here
    let ids: Vec<i64> = (1..=64).collect();
    storage
        .find_pages_by_ids(&ids)
        .unwrap()
        .into_iter()
        .find(|p| p.site_id == site_id && p.path == page_path)
}

// ============================================================================
// Slow Pages
// ============================================================================

#[tokio::test]
async fn test_sub_page_timeout_is_stored_with_code_zero() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        html_page("Главная", r#"<p>Кот и дом.</p><a href="/slow">Медленно</a>"#),
    )
    .await;
    mount_slow_page(&server, "/slow", DOG_PAGE_HTML, Duration::from_secs(4)).await;

    let storage = crawl(&server).await;

    let site = storage.find_site_by_url(&server.uri()).unwrap().unwrap();
    assert_eq!(site.status, SiteStatus::Indexed);
    assert_eq!(storage.count_pages_by_site(site.id).unwrap(), 2);

    let slow = stored_page(&storage, site.id, "/slow").expect("slow page stored");
    assert_eq!(slow.code, 0);
    assert!(slow.content.is_empty());

    // nothing from the timed out page reaches the index
    let dog = storage
        .find_lemmas_by_lemma_and_site(&["собака".to_string()], site.id)
        .unwrap();
    assert!(dog.is_empty());
}

#[tokio::test]
async fn test_root_timeout_fails_the_site() {
    let server = MockServer::start().await;
    mount_slow_page(&server, "/", DOG_PAGE_HTML, Duration::from_secs(4)).await;

    let storage = crawl(&server).await;

    let site = storage.find_site_by_url(&server.uri()).unwrap().unwrap();
    assert_eq!(site.status, SiteStatus::Failed);
    assert!(site.last_error.ends_with("время ожидания истекло"), "{}", site.last_error);
    assert_eq!(storage.count_lemmas_by_site(site.id).unwrap(), 0);
}

// ============================================================================
// Content Errors
// ============================================================================

#[tokio::test]
async fn test_malformed_html_is_still_indexed() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        "<html><body><p>Кот и <b>собака<div>дом</p></span><a href=\"/next\"".to_string(),
    )
    .await;

    let storage = crawl(&server).await;

    let site = storage.find_site_by_url(&server.uri()).unwrap().unwrap();
    assert_eq!(site.status, SiteStatus::Indexed);
    assert_eq!(storage.count_lemmas_by_site(site.id).unwrap(), 3);
}

#[tokio::test]
async fn test_non_html_root_fails_the_site() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"{"кот": 1}"#, "application/json"),
        )
        .mount(&server)
        .await;

    let storage = crawl(&server).await;

    let site = storage.find_site_by_url(&server.uri()).unwrap().unwrap();
    assert_eq!(site.status, SiteStatus::Failed);
    assert!(site.last_error.ends_with("не является страницей"), "{}", site.last_error);
}

#[tokio::test]
async fn test_linked_image_is_stored_without_content() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        html_page("Главная", r#"<p>Кошка.</p><a href="/cat.png">Фото</a>"#),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/cat.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0x89, b'P', b'N', b'G'])
                .insert_header("content-type", "image/png"),
        )
        .mount(&server)
        .await;

    let storage = crawl(&server).await;

    let site = storage.find_site_by_url(&server.uri()).unwrap().unwrap();
    assert_eq!(site.status, SiteStatus::Indexed);

    let image = stored_page(&storage, site.id, "/cat.png").expect("image row stored");
    assert_eq!(image.code, 200);
    assert!(image.content.is_empty());
    assert_eq!(storage.count_lemmas_by_site(site.id).unwrap(), 1);
}

#[tokio::test]
async fn test_windows_1251_page_is_decoded() {
    let server = MockServer::start().await;
    let html = html_page("Кошки", "<p>Коты спят.</p>");
    let (bytes, _, _) = encoding_rs::WINDOWS_1251.encode(&html);
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(bytes.into_owned())
                .insert_header("content-type", "text/html; charset=windows-1251"),
        )
        .mount(&server)
        .await;

    let storage = crawl(&server).await;

    let site = storage.find_site_by_url(&server.uri()).unwrap().unwrap();
    assert_eq!(site.status, SiteStatus::Indexed);
    let lemmas = storage
        .find_lemmas_by_lemma_and_site(&["кот".to_string(), "спать".to_string()], site.id)
        .unwrap();
    assert_eq!(lemmas.len(), 2);

    let root = stored_page(&storage, site.id, "/").unwrap();
    assert!(root.content.contains("Коты спят"));
}

#[tokio::test]
async fn test_page_without_words_indexes_nothing() {
    let server = MockServer::start().await;
    mount_page(&server, "/", html_page("", "<p>42 + 17 = 59!</p>")).await;

    let storage = crawl(&server).await;

    let site = storage.find_site_by_url(&server.uri()).unwrap().unwrap();
    assert_eq!(site.status, SiteStatus::Indexed);
    assert_eq!(storage.count_pages_by_site(site.id).unwrap(), 1);
    assert_eq!(storage.count_lemmas_by_site(site.id).unwrap(), 0);
}

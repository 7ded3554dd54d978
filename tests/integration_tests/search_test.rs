//! Search over freshly crawled sites

use sitesearch::config::SiteConfig;
use sitesearch::search::SearchQuery;
use sitesearch::storage::{create_memory_storage, SharedStorage};
use sitesearch::utils::error::SearchError;
use wiremock::MockServer;

use crate::common::{http_orchestrator, mount_pet_site, search_engine};

use super::fixtures::mount_cat_site;

async fn crawl(sites: &[SiteConfig], storage: &SharedStorage) {
    let orchestrator = http_orchestrator(sites.to_vec(), storage.clone());
    orchestrator.start_all().unwrap();
    orchestrator.wait_idle().await;
}

#[tokio::test]
async fn test_single_match_is_fully_relevant() {
    let server = MockServer::start().await;
    mount_cat_site(&server).await;

    let sites = vec![SiteConfig::new("Животные", &server.uri())];
    let storage = create_memory_storage();
    crawl(&sites, &storage).await;

    let response = search_engine(sites, storage)
        .search(&SearchQuery::new("кот"))
        .unwrap();

    assert_eq!(response.count, 1);
    let result = &response.data[0];
    assert_eq!(result.uri, "/");
    assert_eq!(result.site, server.uri());
    assert_eq!(result.site_name, "Животные");
    assert_eq!(result.title, "Про кошек");
    assert_eq!(result.relevance, 1.0);
    assert!(
        result.snippet.starts_with("<b>кошка</b> спит"),
        "snippet was {}",
        result.snippet
    );
}

#[tokio::test]
async fn test_relevance_is_normalized_by_best_page() {
    let server = MockServer::start().await;
    mount_pet_site(&server).await;

    let sites = vec![SiteConfig::new("Питомцы", &server.uri())];
    let storage = create_memory_storage();
    crawl(&sites, &storage).await;

    let response = search_engine(sites, storage)
        .search(&SearchQuery::new("коты"))
        .unwrap();

    assert_eq!(response.count, 3);
    let ranked: Vec<(&str, f64)> = response
        .data
        .iter()
        .map(|r| (r.uri.as_str(), r.relevance))
        .collect();
    assert_eq!(ranked[0], ("/cats", 1.0));
    assert_eq!(ranked[1], ("/dogs", 1.0));
    assert_eq!(ranked[2].0, "/");
    assert!((ranked[2].1 - 2.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_multi_word_query_requires_every_lemma() {
    let server = MockServer::start().await;
    mount_pet_site(&server).await;

    let sites = vec![SiteConfig::new("Питомцы", &server.uri())];
    let storage = create_memory_storage();
    crawl(&sites, &storage).await;

    let engine = search_engine(sites, storage);

    let response = engine.search(&SearchQuery::new("кошки спят")).unwrap();
    assert_eq!(response.count, 1);
    assert_eq!(response.data[0].uri, "/cats");
    assert_eq!(response.data[0].title, "Кошки");
    assert!(response.data[0]
        .snippet
        .starts_with("<b>Кошка</b> <b>спит</b>. <b>Коты</b> <b>спят</b>"));

    let response = engine.search(&SearchQuery::new("дом и кот")).unwrap();
    assert_eq!(response.count, 1);
    assert_eq!(response.data[0].uri, "/");

    assert!(matches!(
        engine.search(&SearchQuery::new("дом спит")),
        Err(SearchError::NoResults)
    ));
}

#[tokio::test]
async fn test_search_across_sites_with_filter() {
    let cats = MockServer::start().await;
    mount_cat_site(&cats).await;
    let pets = MockServer::start().await;
    mount_pet_site(&pets).await;

    let sites = vec![
        SiteConfig::new("Кошки", &cats.uri()),
        SiteConfig::new("Питомцы", &pets.uri()),
    ];
    let storage = create_memory_storage();
    crawl(&sites, &storage).await;

    let engine = search_engine(sites, storage);

    let all = engine.search(&SearchQuery::new("собака")).unwrap();
    assert_eq!(all.count, 4);

    let filtered = engine
        .search(&SearchQuery::new("собака").with_site(&cats.uri()))
        .unwrap();
    assert_eq!(filtered.count, 1);
    assert_eq!(filtered.data[0].site_name, "Кошки");
    assert_eq!(filtered.data[0].uri, "/dogs");

    let page = engine
        .search(&SearchQuery::new("собака").with_page(1, 2))
        .unwrap();
    assert_eq!(page.count, 4);
    assert_eq!(page.data.len(), 2);
}

#[tokio::test]
async fn test_search_without_index() {
    let sites = vec![SiteConfig::new("Пусто", "https://empty.test")];
    let engine = search_engine(sites, create_memory_storage());

    assert!(matches!(
        engine.search(&SearchQuery::new("кот")),
        Err(SearchError::NoResults)
    ));
    assert!(matches!(
        engine.search(&SearchQuery::new("")),
        Err(SearchError::EmptyQuery)
    ));
    assert!(matches!(
        engine.search(&SearchQuery::new("и в ох")),
        Err(SearchError::NoResults)
    ));
}

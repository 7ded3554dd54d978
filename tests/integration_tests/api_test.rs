//! HTTP API tests using `tower::ServiceExt::oneshot`

use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use sitesearch::config::SiteConfig;
use sitesearch::server::{create_router, AppState};
use sitesearch::storage::create_memory_storage;
use tower::ServiceExt;
use wiremock::MockServer;

use crate::common::{http_orchestrator, search_engine};

use super::fixtures::{mount_cat_site, mount_slow_page, CAT_PAGE_HTML};

fn app(sites: Vec<SiteConfig>) -> (Router, AppState) {
    let storage = create_memory_storage();
    let orchestrator = http_orchestrator(sites.clone(), storage.clone());
    let state = AppState::new(orchestrator, search_engine(sites, storage.clone()), storage);
    (create_router(state.clone()), state)
}

async fn call(router: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn search_uri(query: &str) -> String {
    let params = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("query", query)
        .finish();
    format!("/api/search?{params}")
}

#[tokio::test]
async fn test_index_then_search_over_http() {
    let server = MockServer::start().await;
    mount_cat_site(&server).await;
    let (router, state) = app(vec![SiteConfig::new("Животные", &server.uri())]);

    let (status, body) = call(&router, Method::GET, "/api/startIndexing").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({ "result": true }));

    state.orchestrator.wait_idle().await;

    let (status, body) = call(&router, Method::GET, &search_uri("кошки")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], true);
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["siteName"], "Животные");
    assert_eq!(body["data"][0]["uri"], "/");
    assert_eq!(body["data"][0]["relevance"], 1.0);

    let (_, body) = call(&router, Method::GET, "/api/statistics").await;
    assert_eq!(body["result"], true);
    assert_eq!(body["statistics"]["total"]["sites"], 1);
    assert_eq!(body["statistics"]["total"]["pages"], 2);
    assert_eq!(body["statistics"]["total"]["indexing"], false);
    assert_eq!(body["statistics"]["detailed"][0]["status"], "INDEXED");
    assert!(body["statistics"]["detailed"][0]["statusTime"].is_i64());
}

#[tokio::test]
async fn test_control_errors_are_reported_in_body() {
    let server = MockServer::start().await;
    mount_slow_page(&server, "/", CAT_PAGE_HTML, Duration::from_secs(10)).await;
    let (router, _state) = app(vec![SiteConfig::new("Сайт", &server.uri())]);

    let (status, body) = call(&router, Method::GET, "/api/stopIndexing").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], false);
    assert_eq!(body["error"], "Индексация не запущена");

    let (_, body) = call(&router, Method::GET, "/api/startIndexing").await;
    assert_eq!(body["result"], true);

    let (_, body) = call(&router, Method::GET, "/api/startIndexing").await;
    assert_eq!(body["result"], false);
    assert_eq!(body["error"], "Индексация уже запущена");

    let (_, body) = call(&router, Method::GET, "/api/statistics").await;
    assert_eq!(body["statistics"]["total"]["indexing"], true);

    let (_, body) = call(&router, Method::GET, "/api/stopIndexing").await;
    assert_eq!(body["result"], true);

    let (_, body) = call(&router, Method::GET, "/api/statistics").await;
    assert_eq!(body["statistics"]["detailed"][0]["status"], "FAILED");
    assert_eq!(
        body["statistics"]["detailed"][0]["error"],
        "Индексация прервана пользователем"
    );
}

#[tokio::test]
async fn test_index_page_validation() {
    let (router, _state) = app(vec![SiteConfig::new("Сайт", "https://site.test")]);

    let (status, body) = call(
        &router,
        Method::POST,
        "/api/indexPage?url=https%3A%2F%2Fother.test%2F",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], false);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("за пределами сайтов"));

    let (status, _) = call(&router, Method::POST, "/api/indexPage").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_errors() {
    let (router, _state) = app(vec![SiteConfig::new("Сайт", "https://site.test")]);

    let (status, body) = call(&router, Method::GET, "/api/search?query=").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], false);
    assert_eq!(body["error"], "Задан пустой поисковый запрос");

    let (_, body) = call(&router, Method::GET, &search_uri("кот")).await;
    assert_eq!(body["result"], false);
    assert_eq!(body["error"], "По вашему запросу нет результатов");

    let (status, _) = call(&router, Method::GET, "/api/search?query=x&limit=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_and_metrics() {
    let _ = sitesearch::metrics::init_metrics();
    let (router, _state) = app(vec![SiteConfig::new("Сайт", "https://site.test")]);

    let (status, body) = call(&router, Method::GET, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["indexing"], false);

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("sitesearch_"));
}

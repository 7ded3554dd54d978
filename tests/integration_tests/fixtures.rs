//! Test fixtures for integration tests
//!
//! Provides sample HTML pages and helpers to serve them

use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Page mentioning cats
pub const CAT_PAGE_HTML: &str = r#"<!DOCTYPE html>
<html lang="ru">
<head>
    <meta charset="UTF-8">
    <title>Про кошек</title>
    <script>var кот = "не индексируется";</script>
</head>
<body>
    <h1>Домашние животные</h1>
    <p>Наша кошка спит весь день.</p>
    <a href="/dogs">Дальше</a>
</body>
</html>
"#;

/// Page mentioning only dogs
pub const DOG_PAGE_HTML: &str = r#"<!DOCTYPE html>
<html lang="ru">
<head>
    <meta charset="UTF-8">
    <title>Про собак</title>
</head>
<body>
    <p>Собака охраняет дом.</p>
    <a href="/">Назад</a>
    <a href="mailto:owner@example.com">Почта</a>
    <a href="https://elsewhere.test/">Чужой сайт</a>
</body>
</html>
"#;

/// Serve a response that takes `delay` to arrive
pub async fn mount_slow_page(server: &MockServer, route: &str, html: &str, delay: Duration) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(html, "text/html; charset=utf-8")
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

/// Serve a bare status code
pub async fn mount_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Serve the two-page cat/dog site
pub async fn mount_cat_site(server: &MockServer) {
    crate::common::mount_page(server, "/", CAT_PAGE_HTML.to_string()).await;
    crate::common::mount_page(server, "/dogs", DOG_PAGE_HTML.to_string()).await;
}

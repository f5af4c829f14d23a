#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use dealerhub_api::config::{CacheConfig, ServerConfig};
use dealerhub_api::router::build_app_router;
use dealerhub_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        database_url: None,
        cache: CacheConfig::default(),
    }
}

/// State over the given pool. Keep it around to share caches between
/// requests; every `build_test_app` call starts with empty caches.
pub fn test_state(pool: Option<PgPool>) -> AppState {
    AppState::new(pool, test_config())
}

/// Full application router with all middleware layers.
pub fn build_test_app(pool: PgPool) -> Router {
    build_app_router(test_state(Some(pool)))
}

/// Router started without a database.
pub fn build_unconfigured_app() -> Router {
    build_app_router(test_state(None))
}

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    get_with_headers(app, uri, &[]).await
}

pub async fn get_with_headers(
    app: Router,
    uri: &str,
    headers: &[(&str, &str)],
) -> Response<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    send(app, builder.body(Body::empty()).unwrap()).await
}

async fn with_json(
    app: Router,
    method: Method,
    uri: &str,
    body: serde_json::Value,
) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    with_json(app, Method::POST, uri, body).await
}

pub async fn put_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    with_json(app, Method::PUT, uri, body).await
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn header<'a>(response: &'a Response<Body>, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Create a dealer through the API and return its id.
pub async fn create_dealer(app: Router, name: &str, country: &str) -> i64 {
    let response = post_json(
        app,
        "/api/v1/admin/dealers",
        serde_json::json!({
            "name": name,
            "email": format!("{}@dealers.test", name.to_lowercase().replace(' ', ".")),
            "country": country,
        }),
    )
    .await;
    assert_eq!(response.status(), 201);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

/// Create a catalog item through the API and return its id.
pub async fn create_item(
    app: Router,
    item_type: &str,
    name: &str,
    usd: f64,
    brl: f64,
    countries: Option<Vec<&str>>,
) -> i64 {
    let response = post_json(
        app,
        &format!("/api/v1/admin/catalog/{item_type}"),
        serde_json::json!({
            "name": name,
            "usd": usd,
            "brl": brl,
            "countries": countries,
        }),
    )
    .await;
    assert_eq!(response.status(), 201);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

//! Router harness shared by the handler tests.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::catalog::{CatalogApi, CatalogError};
use crate::config::Config;
use crate::{db, AppState};

/// Echoes the request back for passthrough endpoints and knows two titles.
pub struct MockCatalog;

#[async_trait]
impl CatalogApi for MockCatalog {
    fn is_configured(&self) -> bool {
        true
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, CatalogError> {
        match path {
            "/movie/550" => Ok(json!({
                "id": 550,
                "title": "Fight Club",
                "poster_path": "/fc.jpg",
                "release_date": "1999-10-15",
                "vote_average": 8.433,
                "genres": [{"id": 18, "name": "Drama"}]
            })),
            "/tv/1399" => Ok(json!({
                "id": 1399,
                "name": "Game of Thrones",
                "vote_average": 8.4,
                "genre_ids": [10765, 18],
                "number_of_episodes": 73,
                "number_of_seasons": 8
            })),
            "/movie/404" => Err(CatalogError::Status(404)),
            _ => {
                let query: Map<String, Value> = query
                    .iter()
                    .map(|(k, v)| (k.to_string(), Value::String(v.clone())))
                    .collect();
                Ok(json!({ "path": path, "query": query }))
            }
        }
    }
}

pub struct TestApp {
    pub router: Router,
}

pub async fn test_app() -> TestApp {
    test_app_with(|_| {}).await
}

pub async fn test_app_with<F>(customize: F) -> TestApp
where
    F: FnOnce(&mut Config),
{
    let mut config = Config::default();
    config.auth.jwt_secret = "test-secret".to_string();
    config.catalog.api_key = "test-key".to_string();
    customize(&mut config);

    let pool = db::init_in_memory().await.unwrap();
    let state = Arc::new(AppState::new(config, pool, Arc::new(MockCatalog)));
    TestApp {
        router: super::create_router(state),
    }
}

async fn into_parts(response: axum::response::Response) -> (StatusCode, HeaderMap, Value) {
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, headers, body)
}

pub async fn send_request(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let (status, _, body) = into_parts(response).await;
    (status, body)
}

pub async fn send(
    app: &TestApp,
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, HeaderMap, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.router.clone().oneshot(request).await.unwrap();
    into_parts(response).await
}

pub async fn send_raw(
    app: &TestApp,
    method: Method,
    uri: &str,
    raw: &str,
) -> (StatusCode, HeaderMap, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(raw.to_string()))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    into_parts(response).await
}

/// `name=value` of the first Set-Cookie header, ready to send back
pub fn cookie_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|pair| pair.trim().to_string())
}

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, StatusCode},
};
use dashboard_api::{
    AppState,
    caffeine::DoseTable,
    config::Config,
    rate_limit::{CounterStore, MemoryCounterStore, RateLimiter},
};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

pub fn config(api_secret: Option<&str>) -> Config {
    Config {
        database_url: "postgres://dashboard@localhost/dashboard_test".into(),
        redis_url: None,
        server_host: "127.0.0.1".into(),
        server_port: 0,
        api_base_uri: "/api".into(),
        api_secret: api_secret.map(str::to_string),
        rate_limit_window_secs: 60,
        rate_limit_requests: 5,
        rate_limit_write_requests: 2,
        rate_limit_timeout_ms: 500,
        caffeine_grid_minutes: 15,
        caffeine_half_life_hours: 5.0,
    }
}

/// State whose pool never connects; only use it on routes that stop before
/// touching the database.
pub fn state(config: Config) -> AppState {
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(50))
        .connect_lazy(&config.database_url)
        .expect("lazy pool");
    AppState {
        pool,
        config,
        doses: Arc::new(DoseTable::default()),
    }
}

pub fn memory_limiter() -> Arc<RateLimiter> {
    limiter_on(Arc::new(MemoryCounterStore::new()))
}

pub fn limiter_on(store: Arc<dyn CounterStore>) -> Arc<RateLimiter> {
    Arc::new(RateLimiter::new(store, Duration::from_millis(500)))
}

pub fn request(method: &str, uri: &str, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::empty()).expect("request")
}

pub async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.expect("response")
}

pub async fn status_of(app: &Router, req: Request<Body>) -> StatusCode {
    send(app, req).await.status()
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

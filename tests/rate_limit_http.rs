mod common;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    http::{StatusCode, header},
    middleware::from_fn_with_state,
    routing::get,
};
use dashboard_api::{
    middleware::{RouteLimit, rate_limit},
    rate_limit::{CounterStore, RateLimitRule, RateLimiter, StoreError},
};

use common::{json_body, limiter_on, memory_limiter, request, send, status_of};

fn app(limiter: Arc<RateLimiter>, max: u32) -> Router {
    let limit = |bucket: &'static str| {
        from_fn_with_state(
            RouteLimit::new(limiter.clone(), bucket, RateLimitRule::new(60, max)),
            rate_limit,
        )
    };
    Router::new()
        .route("/reads", get(|| async { "ok" }).layer(limit("reads")))
        .route("/other", get(|| async { "ok" }).layer(limit("other")))
}

#[tokio::test]
async fn denies_after_max_with_retry_after() {
    let app = app(memory_limiter(), 2);
    let from_a = [("x-forwarded-for", "203.0.113.10")];

    for _ in 0..2 {
        let status = status_of(&app, request("GET", "/reads", &from_a)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let denied = send(&app, request("GET", "/reads", &from_a)).await;
    assert_eq!(denied.status(), StatusCode::TOO_MANY_REQUESTS);

    let retry_after: u64 = denied.headers()[header::RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=60).contains(&retry_after));

    let body = json_body(denied).await;
    assert_eq!(body["code"], 1005);
    assert_eq!(
        body["msg"],
        format!("Too many requests, try again in {} seconds", retry_after)
    );
}

#[tokio::test]
async fn other_clients_and_buckets_keep_their_budget() {
    let app = app(memory_limiter(), 1);
    let from_a = [("x-forwarded-for", "203.0.113.11")];
    let from_b = [("x-forwarded-for", "203.0.113.12")];

    let first = status_of(&app, request("GET", "/reads", &from_a)).await;
    let again = status_of(&app, request("GET", "/reads", &from_a)).await;
    let other_client = status_of(&app, request("GET", "/reads", &from_b)).await;
    let other_bucket = status_of(&app, request("GET", "/other", &from_a)).await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(again, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(other_client, StatusCode::OK);
    assert_eq!(other_bucket, StatusCode::OK);
}

#[tokio::test]
async fn shared_secret_is_one_identity_across_addresses() {
    let app = app(memory_limiter(), 1);
    let first = [
        ("authorization", "Bearer token-1"),
        ("x-forwarded-for", "198.51.100.1"),
    ];
    let second = [
        ("authorization", "Bearer token-1"),
        ("x-forwarded-for", "198.51.100.2"),
    ];

    let first = status_of(&app, request("GET", "/reads", &first)).await;
    let second = status_of(&app, request("GET", "/reads", &second)).await;
    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
}

struct UnreachableStore;

#[async_trait]
impl CounterStore for UnreachableStore {
    async fn incr(&self, _key: &str) -> Result<i64, StoreError> {
        Err(StoreError::Malformed("connection refused".into()))
    }

    async fn expire(&self, _key: &str, _seconds: u64) -> Result<(), StoreError> {
        Err(StoreError::Malformed("connection refused".into()))
    }

    async fn ttl(&self, _key: &str) -> Result<i64, StoreError> {
        Err(StoreError::Malformed("connection refused".into()))
    }
}

#[tokio::test]
async fn unreachable_store_lets_requests_through() {
    let app = app(limiter_on(Arc::new(UnreachableStore)), 1);

    for _ in 0..5 {
        let status = status_of(&app, request("GET", "/reads", &[])).await;
        assert_eq!(status, StatusCode::OK);
    }
}

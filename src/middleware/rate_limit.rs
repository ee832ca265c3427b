use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    rate_limit::{RateLimitDecision, RateLimitRule, RateLimiter, client_identity},
    utils::{error_codes, error_to_api_response},
};

/// One route's limiter settings, handed to `rate_limit` as middleware state.
#[derive(Clone)]
pub struct RouteLimit {
    limiter: Arc<RateLimiter>,
    bucket: &'static str,
    rule: RateLimitRule,
}

impl RouteLimit {
    pub fn new(limiter: Arc<RateLimiter>, bucket: &'static str, rule: RateLimitRule) -> Self {
        Self {
            limiter,
            bucket,
            rule,
        }
    }
}

pub fn too_many_requests(retry_after_secs: u64) -> Response {
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        error_to_api_response::<()>(
            error_codes::RATE_LIMIT,
            format!("Too many requests, try again in {} seconds", retry_after_secs),
        ),
    )
        .into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
    response
}

pub async fn rate_limit(
    State(route): State<RouteLimit>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let identity = client_identity(req.headers());

    let decision = route.limiter.check(&identity, route.bucket, route.rule);
    match decision.await {
        RateLimitDecision::Allowed => next.run(req).await,
        RateLimitDecision::Denied { retry_after_secs } => too_many_requests(retry_after_secs),
    }
}

use std::sync::Arc;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{MethodRouter, get, post, put},
};

use crate::{
    AppState,
    config::Config,
    middleware::{RouteLimit, log_errors, rate_limit, require_secret},
    rate_limit::{RateLimitRule, RateLimiter},
};

pub mod caffeine;
pub mod health;

pub const SERIES_BUCKET: &str = "caffeine-series";
pub const EVENTS_BUCKET: &str = "caffeine-events";
pub const PROFILE_BUCKET: &str = "caffeine-profile";
pub const WRITE_BUCKET: &str = "caffeine-write";

fn limited(
    route: MethodRouter<AppState>,
    limiter: &Arc<RateLimiter>,
    bucket: &'static str,
    rule: RateLimitRule,
) -> MethodRouter<AppState> {
    route.layer(from_fn_with_state(
        RouteLimit::new(limiter.clone(), bucket, rule),
        rate_limit,
    ))
}

/// Builds the API under `config.api_base_uri`. Limits run before the secret
/// check so failed authentication attempts spend budget too.
pub fn router(state: AppState, limiter: Arc<RateLimiter>) -> Router {
    let config: &Config = &state.config;
    let reads = RateLimitRule::new(config.rate_limit_window_secs, config.rate_limit_requests);
    let writes = RateLimitRule::new(
        config.rate_limit_window_secs,
        config.rate_limit_write_requests,
    );
    let guarded = |route: MethodRouter<AppState>| {
        limited(
            route.layer(from_fn_with_state(state.clone(), require_secret)),
            &limiter,
            WRITE_BUCKET,
            writes,
        )
    };

    let api = Router::new()
        .route("/health", get(health::health))
        .route(
            "/caffeine/series",
            limited(get(caffeine::series), &limiter, SERIES_BUCKET, reads),
        )
        .route(
            "/caffeine/now",
            limited(get(caffeine::current), &limiter, SERIES_BUCKET, reads),
        )
        .route(
            "/caffeine/events",
            limited(get(caffeine::list_events), &limiter, EVENTS_BUCKET, reads),
        )
        .route("/caffeine/events", guarded(post(caffeine::create_event)))
        .route(
            "/caffeine/profile",
            limited(get(caffeine::get_profile), &limiter, PROFILE_BUCKET, reads),
        )
        .route("/caffeine/profile", guarded(put(caffeine::update_profile)))
        .route(
            "/caffeine/beverages",
            limited(get(caffeine::beverages), &limiter, PROFILE_BUCKET, reads),
        );

    let base = config.api_base_uri.trim_end_matches('/');
    let app = if base.is_empty() {
        Router::new().merge(api)
    } else {
        Router::new().nest(base, api)
    };

    app.layer(from_fn(log_errors)).with_state(state.clone())
}

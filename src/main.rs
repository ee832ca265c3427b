use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use dashboard_api::{
    AppState,
    caffeine::DoseTable,
    config::Config,
    rate_limit::{CounterStore, MemoryCounterStore, RateLimiter, RedisCounterStore},
    routes,
};
use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
#[cfg(debug_assertions)]
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("Failed to load configuration");

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    #[cfg(not(debug_assertions))]
    tracing::info!("Running in production mode with CORS disabled");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'dashboard_api';")
                    .await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    // Redis when configured; otherwise counts live in this process only.
    let store: Arc<dyn CounterStore> = match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str())
                .expect("Failed to create Redis client");
            tracing::info!("Rate limiting with Redis counters");
            Arc::new(RedisCounterStore::new(Arc::new(client)))
        }
        None => {
            tracing::warn!("REDIS_URL not set, rate limiting with in-process counters");
            let memory = Arc::new(MemoryCounterStore::new());
            memory.clone().spawn_sweeper(SWEEP_INTERVAL);
            memory as Arc<dyn CounterStore>
        }
    };
    let limiter = Arc::new(RateLimiter::new(store, config.rate_limit_timeout()));

    let state = AppState {
        pool,
        config: config.clone(),
        doses: Arc::new(DoseTable::default()),
    };

    tracing::info!(
        "Rate limit: {} reads / {} writes per {:?}",
        config.rate_limit_requests,
        config.rate_limit_write_requests,
        config.rate_limit_window()
    );
    let app = routes::router(state, limiter);

    #[cfg(debug_assertions)]
    let app = {
        tracing::debug!("Adding CORS layer for development mode");
        app.layer(CorsLayer::permissive())
    };

    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app,
    )
    .await
    .expect("Failed to start server");
}

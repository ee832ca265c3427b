use std::sync::Arc;

use caffeine::DoseTable;
use config::Config;
use sqlx::PgPool;

pub mod caffeine;
pub mod config;
pub mod error;
pub mod middleware;
pub mod rate_limit;
pub mod routes;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub doses: Arc<DoseTable>,
}

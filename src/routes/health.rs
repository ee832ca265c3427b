use axum::Json;
use serde::Serialize;

use crate::utils::{ApiResponse, success_to_api_response};

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
}

pub async fn health() -> Json<ApiResponse<Health>> {
    success_to_api_response(Health { status: "ok" })
}

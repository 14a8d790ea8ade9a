//! Health check endpoints.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::models::Constraints;
use crate::state::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Liveness probe - server is running
///
/// GET /health/live
async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessResponse {
    pub status: &'static str,
    /// Defaults applied when a request carries no overrides
    pub constraints: Constraints,
    pub always_reinsert_huffman_tables: bool,
}

/// Readiness probe - server can accept requests
///
/// GET /health/ready
async fn readiness(State(state): State<AppState>) -> Json<ReadinessResponse> {
    Json(ReadinessResponse {
        status: "ready",
        constraints: state.constraints(),
        always_reinsert_huffman_tables: state.normalizer.policy().always_reinsert_huffman_tables,
    })
}

/// Create health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
}

//! Health and readiness probes.

use super::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

/// Health probe body.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the process is serving
    pub status: &'static str,
}

/// Liveness: the process is up and serving requests.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Readiness: the process can reach its order archive.
///
/// # Errors
///
/// Returns `503` when the archive is unreachable.
pub async fn readiness_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, StatusCode> {
    match state.archive.ping().await {
        Ok(()) => Ok(Json(HealthResponse { status: "ok" })),
        Err(error) => {
            tracing::warn!(%error, "Readiness check failed: order archive unreachable");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

//! Health API handler.
//!
//! # Key invariants and assumptions
//! - Health checks must be fast and side-effect free.
use crate::api::error::{ApiError, api_unavailable};
use crate::api::types::HealthStatus;
use crate::app::AppState;
use axum::Json;
use axum::extract::State;

/// Probe the backing stores and report `ok` when they answer.
///
/// # Errors
/// - Returns 503 if a store health check fails.
pub async fn healthz(State(state): State<AppState>) -> Result<Json<HealthStatus>, ApiError> {
    if let Err(err) = state.stores.health_check().await {
        return Err(api_unavailable(&format!("storage unavailable: {err}")));
    }
    Ok(Json(HealthStatus {
        status: "ok".to_string(),
        backend: state.stores.backend_name().to_string(),
    }))
}

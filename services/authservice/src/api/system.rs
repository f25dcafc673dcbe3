//! Health probe.
//!
//! # Key invariants
//! - Unauthenticated and side-effect free.
use crate::api::error::{ApiError, api_internal};
use crate::api::types::HealthStatus;
use crate::app::AppState;
use axum::Json;
use axum::extract::State;

#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Service health", body = HealthStatus),
        (status = 500, description = "Storage unavailable", body = crate::api::types::ErrorResponse)
    )
)]
/// Probe the backing store and report `ok` when it answers.
pub(crate) async fn health(State(state): State<AppState>) -> Result<Json<HealthStatus>, ApiError> {
    let store = state.auth.store();
    if let Err(err) = store.health_check().await {
        return Err(api_internal("storage unavailable", &err));
    }
    Ok(Json(HealthStatus {
        status: "ok".to_string(),
        storage: store.backend_name().to_string(),
    }))
}

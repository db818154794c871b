use axum::{Json, extract::State};
use std::sync::Arc;

use super::{ApiResponse, AppState};
use crate::api::types::HealthDto;

/// GET /system/health
/// Liveness plus a database ping; degraded when the ping fails
pub async fn health(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthDto>> {
    let database = match state.shared.store.ping().await {
        Ok(()) => "ok".to_string(),
        Err(e) => {
            tracing::warn!("Health check database ping failed: {e}");
            "unreachable".to_string()
        }
    };

    let status = if database == "ok" { "ok" } else { "degraded" };

    Json(ApiResponse::success(HealthDto {
        status: status.to_string(),
        database,
        uptime_seconds: state.start_time.elapsed().as_secs(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

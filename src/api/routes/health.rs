use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::api::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub file_search: String,
    pub stores: Option<usize>,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

pub async fn readiness_check(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    match state.catalog.list_stores().await {
        Ok(stores) => Ok(Json(ReadinessResponse {
            status: "ready".into(),
            file_search: "connected".into(),
            stores: Some(stores.len()),
        })),
        Err(e) => {
            tracing::warn!(error = %e, "file search backend unreachable");
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    status: "not_ready".into(),
                    file_search: "disconnected".into(),
                    stores: None,
                }),
            ))
        }
    }
}

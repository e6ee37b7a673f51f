//! Admin maintenance endpoints

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;
use tracing::info;

use crate::api::error::ApiResult;
use crate::api::ApiState;
use crate::error::EngineError;

#[derive(Debug, Serialize)]
pub struct RebuildResponse {
    pub success: bool,
    pub agents_rescored: usize,
}

/// POST /api/v1/admin/rebuild - idempotent full-graph reputation rebuild.
/// Gated on the configured admin key; disabled entirely when none is set.
pub async fn rebuild(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> ApiResult<Json<RebuildResponse>> {
    let configured = state
        .admin_api_key
        .as_deref()
        .ok_or(EngineError::Unauthorized)?;

    let presented = headers
        .get("x-admin-key")
        .and_then(|value| value.to_str().ok())
        .ok_or(EngineError::Unauthorized)?;

    if presented != configured {
        return Err(EngineError::Unauthorized.into());
    }

    let agents_rescored = state.engine.rebuild().await;
    info!(agents_rescored, "Admin-triggered reputation rebuild");

    Ok(Json(RebuildResponse {
        success: true,
        agents_rescored,
    }))
}

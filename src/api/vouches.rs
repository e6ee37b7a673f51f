//! Vouch endpoints: submission, listing, flagging

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::auth::AuthenticatedAgent;
use crate::api::error::ApiResult;
use crate::api::ApiState;
use crate::engine::EthosEngine;
use crate::error::EngineError;
use crate::ledger::{Vouch, VouchDirection};

/// Vouch as the web client consumes it: the ledger record plus resolved
/// agent names.
#[derive(Debug, Serialize)]
pub struct VouchView {
    pub id: i64,
    pub from_agent_id: i64,
    pub to_agent_id: i64,
    pub score: i8,
    pub note: String,
    pub receipt_url: Option<String>,
    pub flags_count: u32,
    pub created_at: DateTime<Utc>,
    pub from_agent_name: Option<String>,
    pub to_agent_name: Option<String>,
}

impl VouchView {
    pub fn resolve(vouch: Vouch, engine: &EthosEngine) -> Self {
        let from_agent_name = engine
            .identity()
            .get(vouch.from_agent_id)
            .map(|agent| agent.name)
            .ok();
        let to_agent_name = engine
            .identity()
            .get(vouch.to_agent_id)
            .map(|agent| agent.name)
            .ok();

        Self {
            id: vouch.id,
            from_agent_id: vouch.from_agent_id,
            to_agent_id: vouch.to_agent_id,
            score: vouch.score,
            note: vouch.note,
            receipt_url: vouch.receipt_url,
            flags_count: vouch.flags_count,
            created_at: vouch.created_at,
            from_agent_name,
            to_agent_name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub target: String,
    pub limit: Option<usize>,
    pub direction: Option<VouchDirection>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub success: bool,
    pub vouches: Vec<VouchView>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub to_name: String,
    /// Wide integer so out-of-range submissions reach the range check
    /// instead of failing JSON deserialization.
    pub score: i64,
    #[serde(default)]
    pub note: String,
    pub receipt_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub vouch: VouchView,
}

#[derive(Debug, Deserialize)]
pub struct FlagRequest {
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct FlagResponse {
    pub success: bool,
}

/// GET /api/v1/vouches?target=&limit=&direction= - recent vouches for an
/// agent, newest first. Superseded vouches are listed (audit trail).
pub async fn list(
    State(state): State<ApiState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ListResponse>> {
    let limit = query
        .limit
        .unwrap_or(state.limits.default_vouch_limit)
        .min(state.limits.max_vouch_limit);
    let direction = query.direction.unwrap_or(VouchDirection::Incoming);

    let vouches = state
        .engine
        .list_vouches(&query.target, limit, direction)?
        .into_iter()
        .map(|vouch| VouchView::resolve(vouch, &state.engine))
        .collect();

    Ok(Json(ListResponse {
        success: true,
        vouches,
    }))
}

/// POST /api/v1/vouches - submit a vouch as the authenticated agent
pub async fn submit(
    State(state): State<ApiState>,
    AuthenticatedAgent(agent): AuthenticatedAgent,
    Json(payload): Json<SubmitRequest>,
) -> ApiResult<Json<SubmitResponse>> {
    let score = i8::try_from(payload.score).map_err(|_| {
        EngineError::invalid_vouch("score must be a non-zero integer between -5 and 5")
    })?;

    let vouch = state
        .engine
        .submit_vouch(
            &agent,
            &payload.to_name,
            score,
            &payload.note,
            payload.receipt_url.as_deref(),
        )
        .await?;

    Ok(Json(SubmitResponse {
        success: true,
        vouch: VouchView::resolve(vouch, &state.engine),
    }))
}

/// POST /api/v1/vouches/{id}/flag - flag a vouch as the authenticated agent
pub async fn flag(
    State(state): State<ApiState>,
    Path(vouch_id): Path<i64>,
    AuthenticatedAgent(agent): AuthenticatedAgent,
    Json(payload): Json<FlagRequest>,
) -> ApiResult<Json<FlagResponse>> {
    state
        .engine
        .flag_vouch(&agent, vouch_id, &payload.reason)
        .await?;

    Ok(Json(FlagResponse { success: true }))
}

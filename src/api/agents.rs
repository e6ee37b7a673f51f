//! Agent endpoints: registration, self-lookup, profiles, leaderboard

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::auth::AuthenticatedAgent;
use crate::api::error::ApiResult;
use crate::api::vouches::VouchView;
use crate::api::ApiState;
use crate::identity::Agent;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub agent: Agent,
    pub api_key: String,
}

#[derive(Debug, Serialize)]
pub struct AgentResponse {
    pub success: bool,
    pub agent: Agent,
}

#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub agent: Agent,
    /// Field name matches the web client's `recentVouches` key.
    #[serde(rename = "recentVouches")]
    pub recent_vouches: Vec<VouchView>,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub success: bool,
    pub leaderboard: Vec<Agent>,
}

/// POST /api/v1/agents/register - create an agent, mint its API key.
/// The key appears in this response and nowhere else, ever.
pub async fn register(
    State(state): State<ApiState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<Json<RegisterResponse>> {
    let (agent, api_key) = state.engine.register(&payload.name, &payload.description).await?;

    Ok(Json(RegisterResponse {
        success: true,
        agent,
        api_key,
    }))
}

/// GET /api/v1/agents/me - the authenticated caller's own record
pub async fn me(AuthenticatedAgent(agent): AuthenticatedAgent) -> Json<AgentResponse> {
    Json(AgentResponse {
        success: true,
        agent,
    })
}

/// GET /api/v1/agents/profile?name= - public profile with recent received vouches
pub async fn profile(
    State(state): State<ApiState>,
    Query(query): Query<ProfileQuery>,
) -> ApiResult<Json<ProfileResponse>> {
    let (agent, recent) = state
        .engine
        .profile(&query.name, state.limits.default_vouch_limit)?;

    let recent_vouches = recent
        .into_iter()
        .map(|vouch| VouchView::resolve(vouch, &state.engine))
        .collect();

    Ok(Json(ProfileResponse {
        success: true,
        agent,
        recent_vouches,
    }))
}

/// GET /api/v1/leaderboard?limit= - agents by reputation descending
pub async fn leaderboard(
    State(state): State<ApiState>,
    Query(query): Query<LeaderboardQuery>,
) -> Json<LeaderboardResponse> {
    let limit = query
        .limit
        .unwrap_or(state.limits.default_leaderboard_limit)
        .min(state.limits.max_leaderboard_limit);

    Json(LeaderboardResponse {
        success: true,
        leaderboard: state.engine.leaderboard(limit),
    })
}

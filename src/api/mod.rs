//! HTTP API for the reputation engine
//!
//! Provides the JSON endpoints the Agent Ethos web client consumes:
//! - Agent registration, self-lookup, and public profiles
//! - Vouch submission, listing, and flagging
//! - Leaderboard
//! - Admin maintenance (full reputation rebuild)
//! - Security middleware (rate limiting, body size, headers)

mod admin;
mod agents;
mod auth;
mod error;
mod middleware;
mod vouches;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

use crate::config::{LimitsConfig, SecurityConfig};
use crate::engine::EthosEngine;

pub use auth::AuthenticatedAgent;
pub use error::{ApiError, ApiResult};
pub use middleware::{
    body_size_middleware, rate_limit_middleware, security_headers_middleware, RateLimiter,
    SecurityState,
};
pub use vouches::VouchView;

/// Shared state for all API handlers
#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<EthosEngine>,
    pub limits: LimitsConfig,
    pub admin_api_key: Option<String>,
}

impl ApiState {
    pub fn new(engine: Arc<EthosEngine>, limits: LimitsConfig, security: &SecurityConfig) -> Self {
        Self {
            engine,
            limits,
            admin_api_key: security.admin_api_key.clone(),
        }
    }
}

/// Create the versioned API router (mounted under `/api/v1`).
pub fn create_api_router(state: ApiState) -> Router {
    Router::new()
        .route("/agents/register", post(agents::register))
        .route("/agents/me", get(agents::me))
        .route("/agents/profile", get(agents::profile))
        .route("/leaderboard", get(agents::leaderboard))
        .route("/vouches", get(vouches::list).post(vouches::submit))
        .route("/vouches/{vouch_id}/flag", post(vouches::flag))
        .route("/admin/rebuild", post(admin::rebuild))
        .with_state(state)
}

/// Health check handler, mounted at `/health`.
pub async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "ok": true }))
}

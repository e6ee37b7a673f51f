//! Bearer-key authentication extractor

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::api::error::ApiError;
use crate::api::ApiState;
use crate::error::EngineError;
use crate::identity::Agent;

/// Extracts `Authorization: Bearer <key>` and resolves it to the calling
/// agent. Handlers that take this extractor are the authenticated ones;
/// everything else is public.
pub struct AuthenticatedAgent(pub Agent);

impl FromRequestParts<ApiState> for AuthenticatedAgent {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ApiState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .ok_or(EngineError::Unauthorized)
            .map_err(ApiError::from)?;

        let agent = state.engine.authenticate(token)?;
        Ok(AuthenticatedAgent(agent))
    }
}

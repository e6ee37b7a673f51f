//! Engine-to-HTTP error mapping
//!
//! Every taxonomy error becomes a 4xx/5xx with a `detail` string the
//! client surfaces verbatim. Internal detail stays out of responses;
//! storage failures log server-side and return a generic 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::error::EngineError;

pub struct ApiError(EngineError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self.0 {
            EngineError::NotFound(_) => (StatusCode::NOT_FOUND, self.0.to_string()),
            EngineError::Conflict(_) => (StatusCode::CONFLICT, self.0.to_string()),
            EngineError::Unauthorized => (StatusCode::UNAUTHORIZED, self.0.to_string()),
            EngineError::InvalidVouch(_) | EngineError::ValidationError(_) => {
                (StatusCode::BAD_REQUEST, self.0.to_string())
            }
            EngineError::Storage(detail) => {
                error!(detail = %detail, "Storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal storage error, please retry".to_string(),
                )
            }
        };

        (status, Json(json!({ "success": false, "detail": detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (EngineError::not_found("x"), StatusCode::NOT_FOUND),
            (EngineError::conflict("x"), StatusCode::CONFLICT),
            (EngineError::Unauthorized, StatusCode::UNAUTHORIZED),
            (EngineError::invalid_vouch("x"), StatusCode::BAD_REQUEST),
            (EngineError::validation("x"), StatusCode::BAD_REQUEST),
            (
                EngineError::Storage("pool down".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let response = ApiError(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }
}

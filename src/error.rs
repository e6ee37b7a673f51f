//! Engine error taxonomy
//!
//! Every fallible engine operation returns one of these kinds. The API
//! gateway maps them to HTTP status codes; nothing below the gateway
//! knows about HTTP.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Unknown agent name or vouch id
    #[error("{0}")]
    NotFound(String),

    /// Duplicate agent name or duplicate flag
    #[error("{0}")]
    Conflict(String),

    /// Missing or invalid credential. The message is uniform across all
    /// failure modes so callers cannot distinguish unknown keys from
    /// malformed ones.
    #[error("invalid or missing API key")]
    Unauthorized,

    /// Self-vouch, out-of-range score, or oversize vouch text
    #[error("{0}")]
    InvalidVouch(String),

    /// Malformed request body or parameters
    #[error("{0}")]
    ValidationError(String),

    /// Storage-layer failure (persistence unavailable or rejecting)
    #[error("storage error: {0}")]
    Storage(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    pub fn not_found(what: impl Into<String>) -> Self {
        EngineError::NotFound(what.into())
    }

    pub fn conflict(what: impl Into<String>) -> Self {
        EngineError::Conflict(what.into())
    }

    pub fn invalid_vouch(what: impl Into<String>) -> Self {
        EngineError::InvalidVouch(what.into())
    }

    pub fn validation(what: impl Into<String>) -> Self {
        EngineError::ValidationError(what.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_message_is_uniform() {
        assert_eq!(
            EngineError::Unauthorized.to_string(),
            "invalid or missing API key"
        );
    }

    #[test]
    fn test_detail_passthrough() {
        let err = EngineError::not_found("agent 'zardoz' not found");
        assert_eq!(err.to_string(), "agent 'zardoz' not found");
    }
}

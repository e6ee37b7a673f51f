//! Vouch and flag records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Inclusive score bounds for a vouch. Zero is rejected: a vouch must
/// express a direction of trust.
pub const MIN_SCORE: i8 = -5;
pub const MAX_SCORE: i8 = 5;

/// A directed, scored attestation from one agent to another.
///
/// Immutable once created except for `flags_count`.
#[derive(Debug, Clone, Serialize)]
pub struct Vouch {
    pub id: i64,
    pub from_agent_id: i64,
    pub to_agent_id: i64,
    pub score: i8,
    pub note: String,
    pub receipt_url: Option<String>,
    pub flags_count: u32,
    pub created_at: DateTime<Utc>,
}

/// A moderation flag raised against a vouch. Never retracted.
#[derive(Debug, Clone, Serialize)]
pub struct Flag {
    pub id: i64,
    pub vouch_id: i64,
    pub flagged_by_agent_id: i64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// Which side of an agent's vouch history a listing selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VouchDirection {
    /// Vouches received by the agent
    Incoming,
    /// Vouches given by the agent
    Outgoing,
}

/// Check a submitted score against the allowed range.
pub fn validate_score(score: i8) -> EngineResult<()> {
    if score == 0 || !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        return Err(EngineError::invalid_vouch(format!(
            "score must be a non-zero integer between {} and {}",
            MIN_SCORE, MAX_SCORE
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_bounds() {
        for score in [-5, -1, 1, 5] {
            assert!(validate_score(score).is_ok(), "score {} should pass", score);
        }
        for score in [0, 6, -6, i8::MAX, i8::MIN] {
            assert!(
                matches!(validate_score(score), Err(EngineError::InvalidVouch(_))),
                "score {} should fail",
                score
            );
        }
    }

    #[test]
    fn test_direction_serde_is_lowercase() {
        let incoming: VouchDirection = serde_json::from_str("\"incoming\"").unwrap();
        assert_eq!(incoming, VouchDirection::Incoming);
        let outgoing: VouchDirection = serde_json::from_str("\"outgoing\"").unwrap();
        assert_eq!(outgoing, VouchDirection::Outgoing);
        assert!(serde_json::from_str::<VouchDirection>("\"sideways\"").is_err());
    }
}

//! Score cache types and scoring weights

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Versioned per-agent score record.
///
/// The value is a cache: it is always recomputable by replaying the
/// ledger. `computed_at` and `edge_count` make staleness observable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub agent_id: i64,
    pub value: f64,
    pub computed_at: DateTime<Utc>,
    /// Number of active incoming edges that fed this value
    pub edge_count: usize,
}

impl ScoreRecord {
    pub fn zero(agent_id: i64) -> Self {
        Self {
            agent_id,
            value: 0.0,
            computed_at: Utc::now(),
            edge_count: 0,
        }
    }
}

/// Tunable parameters of the scoring algorithm
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Lower bound on the voucher source-weight multiplier
    pub source_weight_floor: f64,
    /// Upper bound on the voucher source-weight multiplier
    pub source_weight_cap: f64,
    /// Reputation points per +1.0 of source-weight multiplier
    pub source_weight_scale: f64,
    /// Pre-clamp source-weight bonus for claimed vouchers
    pub claimed_source_bonus: f64,
    /// Contribution reduction per flag on an edge
    pub flag_discount_per_flag: f64,
    /// Minimum score on both edges before the reciprocity discount applies
    pub reciprocity_score_threshold: i8,
    /// Window within which mutual vouches are treated as reciprocal
    pub reciprocity_window_hours: i64,
    /// Factor applied to both edges of a reciprocal pair
    pub reciprocity_factor: f64,
    /// Defensive bound on the aggregate score magnitude
    pub score_clamp: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            source_weight_floor: 0.2,
            source_weight_cap: 2.0,
            source_weight_scale: 25.0,
            claimed_source_bonus: 1.25,
            flag_discount_per_flag: 0.5,
            reciprocity_score_threshold: 4,
            reciprocity_window_hours: 48,
            reciprocity_factor: 0.5,
            score_clamp: 1_000_000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_record() {
        let record = ScoreRecord::zero(5);
        assert_eq!(record.agent_id, 5);
        assert_eq!(record.value, 0.0);
        assert_eq!(record.edge_count, 0);
    }
}

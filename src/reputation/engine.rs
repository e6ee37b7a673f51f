//! Pure contribution math
//!
//! Everything here is a deterministic function of its inputs; the manager
//! gathers ledger and identity state and feeds it through these.

use chrono::Duration;

use crate::ledger::Vouch;
use crate::reputation::score::ScoringWeights;

/// Source-weight multiplier for a voucher with the given cached
/// reputation. Claimed vouchers get their bonus before the clamp, so a
/// claimed fresh agent still starts at the floor but climbs faster.
pub fn source_multiplier(weights: &ScoringWeights, voucher_reputation: f64, claimed: bool) -> f64 {
    let mut multiplier =
        weights.source_weight_floor + voucher_reputation / weights.source_weight_scale;

    if claimed {
        multiplier *= weights.claimed_source_bonus;
    }

    multiplier.clamp(weights.source_weight_floor, weights.source_weight_cap)
}

/// Flag discount for an edge: each flag removes a fixed fraction of the
/// contribution, floored at zero. Heavily flagged edges contribute nothing.
pub fn flag_discount(weights: &ScoringWeights, flags_count: u32) -> f64 {
    (1.0 - weights.flag_discount_per_flag * flags_count as f64).max(0.0)
}

/// Whether a pair of mutual edges looks like reciprocal backscratching:
/// both scores at or above the threshold and both created within the
/// configured window of each other.
pub fn reciprocity_applies(weights: &ScoringWeights, edge: &Vouch, reverse: &Vouch) -> bool {
    if edge.score < weights.reciprocity_score_threshold
        || reverse.score < weights.reciprocity_score_threshold
    {
        return false;
    }

    let gap = (edge.created_at - reverse.created_at).abs();
    gap <= Duration::hours(weights.reciprocity_window_hours)
}

/// Effective contribution of one active incoming edge.
///
/// `voucher_reputation` is the voucher's cached score from the snapshot
/// this pass runs over; `reverse` is the active edge from the target back
/// to the voucher, if one exists.
pub fn edge_contribution(
    weights: &ScoringWeights,
    edge: &Vouch,
    voucher_reputation: f64,
    voucher_claimed: bool,
    reverse: Option<&Vouch>,
) -> f64 {
    let mut contribution = edge.score as f64
        * source_multiplier(weights, voucher_reputation, voucher_claimed)
        * flag_discount(weights, edge.flags_count);

    if let Some(reverse) = reverse {
        if reciprocity_applies(weights, edge, reverse) {
            contribution *= weights.reciprocity_factor;
        }
    }

    contribution
}

/// Sum contributions with the defensive clamp.
pub fn aggregate(weights: &ScoringWeights, contributions: impl IntoIterator<Item = f64>) -> f64 {
    let sum: f64 = contributions.into_iter().sum();
    sum.clamp(-weights.score_clamp, weights.score_clamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn weights() -> ScoringWeights {
        ScoringWeights::default()
    }

    fn vouch(from: i64, to: i64, score: i8, flags: u32) -> Vouch {
        Vouch {
            id: 1,
            from_agent_id: from,
            to_agent_id: to,
            score,
            note: String::new(),
            receipt_url: None,
            flags_count: flags,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_source_multiplier_floor_for_fresh_voucher() {
        let w = weights();
        assert!((source_multiplier(&w, 0.0, false) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_source_multiplier_negative_reputation_floored() {
        let w = weights();
        assert!((source_multiplier(&w, -100.0, false) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_source_multiplier_scales_and_caps() {
        let w = weights();
        let mid = source_multiplier(&w, 25.0, false);
        assert!((mid - 1.2).abs() < 1e-9);

        assert!((source_multiplier(&w, 10_000.0, false) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_claimed_bonus_applies_before_clamp() {
        let w = weights();
        let unclaimed = source_multiplier(&w, 25.0, false);
        let claimed = source_multiplier(&w, 25.0, true);
        assert!((claimed - unclaimed * 1.25).abs() < 1e-9);

        // Bonus cannot push past the cap.
        assert!((source_multiplier(&w, 10_000.0, true) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_flag_discount_steps_to_zero() {
        let w = weights();
        assert!((flag_discount(&w, 0) - 1.0).abs() < 1e-9);
        assert!((flag_discount(&w, 1) - 0.5).abs() < 1e-9);
        assert!(flag_discount(&w, 2).abs() < 1e-9);
        assert!(flag_discount(&w, 3).abs() < 1e-9);
    }

    #[test]
    fn test_flag_discount_is_monotonic() {
        let w = weights();
        let mut prev = flag_discount(&w, 0);
        for flags in 1..10 {
            let current = flag_discount(&w, flags);
            assert!(current <= prev);
            prev = current;
        }
    }

    #[test]
    fn test_reciprocity_detection() {
        let w = weights();
        let ab = vouch(1, 2, 5, 0);
        let ba = vouch(2, 1, 4, 0);
        assert!(reciprocity_applies(&w, &ab, &ba));

        // Below the score threshold on either side: not reciprocal.
        let ba_low = vouch(2, 1, 3, 0);
        assert!(!reciprocity_applies(&w, &ab, &ba_low));

        // Negative mutual vouches are not backscratching.
        let ab_neg = vouch(1, 2, -5, 0);
        let ba_neg = vouch(2, 1, -5, 0);
        assert!(!reciprocity_applies(&w, &ab_neg, &ba_neg));

        // Outside the window: not reciprocal.
        let mut ba_old = vouch(2, 1, 5, 0);
        ba_old.created_at = Utc::now() - Duration::hours(72);
        assert!(!reciprocity_applies(&w, &ab, &ba_old));
    }

    #[test]
    fn test_edge_contribution_fresh_voucher() {
        let w = weights();
        let edge = vouch(1, 2, 5, 0);
        let contribution = edge_contribution(&w, &edge, 0.0, false, None);
        assert!((contribution - 1.0).abs() < 1e-9, "5 * 0.2 = 1.0");
    }

    #[test]
    fn test_edge_contribution_flagged_to_zero() {
        let w = weights();
        let edge = vouch(1, 2, 5, 3);
        let contribution = edge_contribution(&w, &edge, 50.0, true, None);
        assert!(contribution.abs() < 1e-9);
    }

    #[test]
    fn test_edge_contribution_reciprocal_halved() {
        let w = weights();
        let edge = vouch(1, 2, 5, 0);
        let reverse = vouch(2, 1, 5, 0);

        let plain = edge_contribution(&w, &edge, 0.0, false, None);
        let discounted = edge_contribution(&w, &edge, 0.0, false, Some(&reverse));
        assert!((discounted - plain * 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_aggregate_clamps() {
        let w = weights();
        assert!((aggregate(&w, [1.0, 2.0, -0.5]) - 2.5).abs() < 1e-9);
        assert!((aggregate(&w, [f64::MAX, f64::MAX]) - w.score_clamp).abs() < 1e-9);
        assert!((aggregate(&w, [f64::MIN]) + w.score_clamp).abs() < 1e-9);
    }
}

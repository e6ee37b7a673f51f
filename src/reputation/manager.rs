//! Reputation manager - scoring orchestrator
//!
//! Owns the versioned score cache and the recomputation discipline:
//! recomputations for the same target serialize behind a per-agent lock,
//! different targets proceed fully in parallel.

use chrono::Utc;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::identity::IdentityStore;
use crate::ledger::VouchLedger;
use crate::reputation::engine::{aggregate, edge_contribution};
use crate::reputation::score::{ScoreRecord, ScoringWeights};

pub struct ReputationManager {
    weights: ScoringWeights,

    /// Versioned score cache, keyed by agent id
    scores: DashMap<i64, ScoreRecord>,

    /// Per-agent recompute serialization
    recompute_locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl ReputationManager {
    pub fn new(weights: ScoringWeights) -> Self {
        Self {
            weights,
            scores: DashMap::new(),
            recompute_locks: DashMap::new(),
        }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Current score record for an agent; zero if never computed.
    pub fn get(&self, agent_id: i64) -> ScoreRecord {
        self.scores
            .get(&agent_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_else(|| ScoreRecord::zero(agent_id))
    }

    /// Cached score value, the input for source weighting.
    pub fn cached_value(&self, agent_id: i64) -> f64 {
        self.scores
            .get(&agent_id)
            .map(|entry| entry.value().value)
            .unwrap_or(0.0)
    }

    fn lock_for(&self, agent_id: i64) -> Arc<Mutex<()>> {
        self.recompute_locks
            .entry(agent_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Recompute one agent's score from its active incoming edges,
    /// serialized against concurrent recomputations of the same agent.
    /// Updates the score cache and the agent's cached reputation scalar.
    pub async fn recompute(
        &self,
        target_id: i64,
        identity: &IdentityStore,
        ledger: &VouchLedger,
    ) -> f64 {
        let lock = self.lock_for(target_id);
        let _guard = lock.lock().await;

        let record = self.compute_record(target_id, identity, ledger, None);
        let value = record.value;

        self.scores.insert(target_id, record);
        identity.set_reputation(target_id, value);

        debug!(agent_id = target_id, reputation = value, "Recomputed reputation");
        value
    }

    /// Compute a fresh record for one agent. When `prior` is given, source
    /// weights read from it instead of the live cache (rebuild passes feed
    /// the pre-rebuild snapshot here).
    fn compute_record(
        &self,
        target_id: i64,
        identity: &IdentityStore,
        ledger: &VouchLedger,
        prior: Option<&HashMap<i64, f64>>,
    ) -> ScoreRecord {
        let edges = ledger.active_incoming(target_id);

        let contributions: Vec<f64> = edges
            .iter()
            .map(|edge| {
                let voucher_reputation = match prior {
                    Some(snapshot) => snapshot.get(&edge.from_agent_id).copied().unwrap_or(0.0),
                    None => self.cached_value(edge.from_agent_id),
                };
                let voucher_claimed = identity
                    .get(edge.from_agent_id)
                    .map(|agent| agent.is_claimed)
                    .unwrap_or(false);
                let reverse = ledger.latest_between(target_id, edge.from_agent_id);

                edge_contribution(
                    &self.weights,
                    edge,
                    voucher_reputation,
                    voucher_claimed,
                    reverse.as_ref(),
                )
            })
            .collect();

        ScoreRecord {
            agent_id: target_id,
            value: aggregate(&self.weights, contributions),
            computed_at: Utc::now(),
            edge_count: edges.len(),
        }
    }

    /// Idempotent full-graph rebuild. Computes every agent's score against
    /// the pre-rebuild snapshot (so ordering within the pass cannot skew
    /// source weights), then swaps all results in. Holds no ledger locks
    /// while computing.
    pub async fn rebuild_all(&self, identity: &IdentityStore, ledger: &VouchLedger) -> usize {
        let agents = identity.snapshot();

        // Prior scores come from the agents' cached reputation scalars, so
        // a boot-time rebuild reads persisted values, not an empty cache.
        let snapshot: HashMap<i64, f64> = agents
            .iter()
            .map(|agent| (agent.id, agent.reputation))
            .collect();

        let records: Vec<ScoreRecord> = agents
            .iter()
            .map(|agent| self.compute_record(agent.id, identity, ledger, Some(&snapshot)))
            .collect();

        let rescored = records.len();
        for record in records {
            identity.set_reputation(record.agent_id, record.value);
            self.scores.insert(record.agent_id, record);
        }

        info!(agents = rescored, "Full reputation rebuild complete");
        rescored
    }

    /// All agents ordered by reputation descending, ties broken by earlier
    /// registration, bounded by `limit`.
    pub fn leaderboard(&self, identity: &IdentityStore, limit: usize) -> Vec<crate::identity::Agent> {
        let mut agents = identity.snapshot();
        agents.sort_by(|a, b| {
            b.reputation
                .partial_cmp(&a.reputation)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        agents.truncate(limit);
        agents
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LimitsConfig;

    fn setup() -> (IdentityStore, VouchLedger, ReputationManager) {
        (
            IdentityStore::new(LimitsConfig::default()),
            VouchLedger::new(LimitsConfig::default()),
            ReputationManager::new(ScoringWeights::default()),
        )
    }

    #[tokio::test]
    async fn test_fresh_voucher_contribution() {
        let (identity, ledger, manager) = setup();
        let (alice, _) = identity.register("alice", "").unwrap();
        let (bob, _) = identity.register("bob", "").unwrap();

        ledger.submit(alice.id, bob.id, 5, "", None).unwrap();
        let value = manager.recompute(bob.id, &identity, &ledger).await;

        // 5 * floor multiplier 0.2
        assert!((value - 1.0).abs() < 1e-9);
        assert!((identity.get(bob.id).unwrap().reputation - 1.0).abs() < 1e-9);

        let record = manager.get(bob.id);
        assert_eq!(record.edge_count, 1);
    }

    #[tokio::test]
    async fn test_supersession_only_latest_counts() {
        let (identity, ledger, manager) = setup();
        let (alice, _) = identity.register("alice", "").unwrap();
        let (bob, _) = identity.register("bob", "").unwrap();

        ledger.submit(alice.id, bob.id, 5, "", None).unwrap();
        let with_five = manager.recompute(bob.id, &identity, &ledger).await;

        ledger.submit(alice.id, bob.id, 2, "", None).unwrap();
        let with_two = manager.recompute(bob.id, &identity, &ledger).await;

        assert!((with_five - 1.0).abs() < 1e-9);
        assert!((with_two - 0.4).abs() < 1e-9);
        assert_eq!(manager.get(bob.id).edge_count, 1);
    }

    #[tokio::test]
    async fn test_flags_never_increase_reputation() {
        let (identity, ledger, manager) = setup();
        let (alice, _) = identity.register("alice", "").unwrap();
        let (bob, _) = identity.register("bob", "").unwrap();
        let (carol, _) = identity.register("carol", "").unwrap();
        let (dave, _) = identity.register("dave", "").unwrap();
        let (erin, _) = identity.register("erin", "").unwrap();

        let vouch = ledger.submit(alice.id, bob.id, 5, "", None).unwrap();
        let mut prev = manager.recompute(bob.id, &identity, &ledger).await;

        for flagger in [carol.id, dave.id, erin.id] {
            ledger.flag(vouch.id, flagger, "suspicious").unwrap();
            let current = manager.recompute(bob.id, &identity, &ledger).await;
            assert!(current <= prev + 1e-9);
            prev = current;
        }

        // Three flags floor the only edge: back to baseline.
        assert!(prev.abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_reciprocal_pair_discounted() {
        let (identity, ledger, manager) = setup();
        let (alice, _) = identity.register("alice", "").unwrap();
        let (bob, _) = identity.register("bob", "").unwrap();

        ledger.submit(alice.id, bob.id, 5, "", None).unwrap();
        ledger.submit(bob.id, alice.id, 5, "", None).unwrap();

        let bob_score = manager.recompute(bob.id, &identity, &ledger).await;
        let alice_score = manager.recompute(alice.id, &identity, &ledger).await;

        // Both edges halved: 5 * 0.2 * 0.5 = 0.5 for bob. Alice's voucher
        // (bob) now carries a small cached score, nudging her multiplier
        // off the floor by bob's 0.5 / 25.
        assert!((bob_score - 0.5).abs() < 1e-9);
        let alice_expected = 5.0 * (0.2 + 0.5 / 25.0) * 0.5;
        assert!((alice_score - alice_expected).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_higher_reputation_voucher_counts_more() {
        let (identity, ledger, manager) = setup();
        let (alice, _) = identity.register("alice", "").unwrap();
        let (bob, _) = identity.register("bob", "").unwrap();
        let (carol, _) = identity.register("carol", "").unwrap();

        // Ten fresh agents vouch for alice, lifting her cached score.
        for i in 0..10 {
            let (booster, _) = identity.register(&format!("booster{}", i), "").unwrap();
            ledger.submit(booster.id, alice.id, 5, "", None).unwrap();
        }
        manager.recompute(alice.id, &identity, &ledger).await;
        let alice_rep = manager.cached_value(alice.id);
        assert!(alice_rep > 0.0);

        // The same +5 from alice is now worth more than from fresh carol.
        ledger.submit(alice.id, bob.id, 5, "", None).unwrap();
        let from_alice = manager.recompute(bob.id, &identity, &ledger).await;

        let (dora, _) = identity.register("dora", "").unwrap();
        ledger.submit(carol.id, dora.id, 5, "", None).unwrap();
        let from_carol = manager.recompute(dora.id, &identity, &ledger).await;

        assert!(from_alice > from_carol);
    }

    #[tokio::test]
    async fn test_rebuild_converges_drift() {
        let (identity, ledger, manager) = setup();
        let (alice, _) = identity.register("alice", "").unwrap();
        let (bob, _) = identity.register("bob", "").unwrap();
        let (carol, _) = identity.register("carol", "").unwrap();

        ledger.submit(alice.id, bob.id, 5, "", None).unwrap();
        ledger.submit(bob.id, carol.id, 5, "", None).unwrap();

        // Recompute carol before bob: her edge sees bob's stale zero.
        manager.recompute(carol.id, &identity, &ledger).await;
        manager.recompute(bob.id, &identity, &ledger).await;
        let carol_stale = manager.cached_value(carol.id);

        let rescored = manager.rebuild_all(&identity, &ledger).await;
        assert_eq!(rescored, 3);

        // After the rebuild carol's edge reads bob's 1.0: 5 * (0.2 + 1/25).
        let carol_rebuilt = manager.cached_value(carol.id);
        assert!((carol_stale - 1.0).abs() < 1e-9);
        assert!((carol_rebuilt - 5.0 * (0.2 + 1.0 / 25.0)).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_rebuild_is_idempotent() {
        let (identity, ledger, manager) = setup();
        let (alice, _) = identity.register("alice", "").unwrap();
        let (bob, _) = identity.register("bob", "").unwrap();

        ledger.submit(alice.id, bob.id, 4, "", None).unwrap();
        manager.recompute(bob.id, &identity, &ledger).await;

        manager.rebuild_all(&identity, &ledger).await;
        let first = manager.cached_value(bob.id);
        manager.rebuild_all(&identity, &ledger).await;
        let second = manager.cached_value(bob.id);

        assert!((first - second).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_leaderboard_ordering_and_tie_break() {
        let (identity, ledger, manager) = setup();
        let (alice, _) = identity.register("alice", "").unwrap();
        let (bob, _) = identity.register("bob", "").unwrap();
        let (carol, _) = identity.register("carol", "").unwrap();

        ledger.submit(alice.id, bob.id, 5, "", None).unwrap();
        manager.recompute(bob.id, &identity, &ledger).await;

        let board = manager.leaderboard(&identity, 10);
        assert_eq!(board[0].name, "bob");

        // alice and carol tie at zero; alice registered earlier.
        assert_eq!(board[1].name, "alice");
        assert_eq!(board[2].name, "carol");

        let bounded = manager.leaderboard(&identity, 1);
        assert_eq!(bounded.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_recomputes_no_lost_update() {
        let (identity, ledger, manager) = setup();
        let identity = Arc::new(identity);
        let ledger = Arc::new(ledger);
        let manager = Arc::new(manager);

        let (bob, _) = identity.register("bob", "").unwrap();
        for i in 0..8 {
            let (voucher, _) = identity.register(&format!("v{}", i), "").unwrap();
            ledger.submit(voucher.id, bob.id, 5, "", None).unwrap();
        }

        let mut handles = Vec::new();
        for _ in 0..8 {
            let (identity, ledger, manager) = (identity.clone(), ledger.clone(), manager.clone());
            let target = bob.id;
            handles.push(tokio::spawn(async move {
                manager.recompute(target, &identity, &ledger).await
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Every recompute saw all eight edges: 8 * 5 * 0.2.
        assert!((manager.cached_value(bob.id) - 8.0).abs() < 1e-9);
        assert_eq!(manager.get(bob.id).edge_count, 8);
    }
}

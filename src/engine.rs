//! Engine facade
//!
//! Ties the identity store, vouch ledger, and reputation scorer together
//! into the operations the API exposes. Every mutating operation applies
//! its in-memory effect, journals to PostgreSQL when persistence is
//! enabled, and triggers the synchronous recompute for the affected
//! target before returning.

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::EthosConfig;
use crate::database::DatabasePool;
use crate::error::{EngineError, EngineResult};
use crate::identity::{Agent, IdentityStore};
use crate::ledger::{Flag, Vouch, VouchDirection, VouchLedger};
use crate::reputation::ReputationManager;

pub struct EthosEngine {
    identity: Arc<IdentityStore>,
    ledger: Arc<VouchLedger>,
    scorer: Arc<ReputationManager>,
    db: Option<Arc<DatabasePool>>,
}

impl EthosEngine {
    pub fn new(config: &EthosConfig) -> Self {
        Self {
            identity: Arc::new(IdentityStore::new(config.limits.clone())),
            ledger: Arc::new(VouchLedger::new(config.limits.clone())),
            scorer: Arc::new(ReputationManager::new(config.scoring.to_weights())),
            db: None,
        }
    }

    pub fn with_database(mut self, db: Arc<DatabasePool>) -> Self {
        self.db = Some(db);
        self
    }

    pub fn identity(&self) -> &IdentityStore {
        &self.identity
    }

    pub fn ledger(&self) -> &VouchLedger {
        &self.ledger
    }

    pub fn scorer(&self) -> &ReputationManager {
        &self.scorer
    }

    /// Register a new agent and mint its credential. The plaintext key in
    /// the return value is the only copy that will ever exist.
    pub async fn register(&self, name: &str, description: &str) -> EngineResult<(Agent, String)> {
        let (agent, api_key) = self.identity.register(name, description)?;

        if let Some(db) = &self.db {
            db.agents()
                .insert(&agent)
                .await
                .map_err(EngineError::Storage)?;
        }

        Ok((agent, api_key))
    }

    /// Resolve a presented API key to its agent.
    pub fn authenticate(&self, api_key: &str) -> EngineResult<Agent> {
        self.identity.authenticate(api_key)
    }

    /// Case-insensitive agent lookup by name.
    pub fn lookup(&self, name: &str) -> EngineResult<Agent> {
        self.identity.lookup(name)
    }

    /// An agent together with its recent received vouches.
    pub fn profile(&self, name: &str, limit: usize) -> EngineResult<(Agent, Vec<Vouch>)> {
        let agent = self.identity.lookup(name)?;
        let recent = self
            .ledger
            .list_recent(agent.id, limit, VouchDirection::Incoming);
        Ok((agent, recent))
    }

    /// Submit a vouch from an authenticated agent to a named target, then
    /// synchronously recompute the target's reputation.
    pub async fn submit_vouch(
        &self,
        from: &Agent,
        to_name: &str,
        score: i8,
        note: &str,
        receipt_url: Option<&str>,
    ) -> EngineResult<Vouch> {
        let to = self.identity.lookup(to_name)?;
        let vouch = self
            .ledger
            .submit(from.id, to.id, score, note, receipt_url)?;

        if let Some(db) = &self.db {
            db.vouches()
                .insert_vouch(&vouch)
                .await
                .map_err(EngineError::Storage)?;
        }

        let reputation = self.scorer.recompute(to.id, &self.identity, &self.ledger).await;
        self.persist_reputation(to.id, reputation).await;

        Ok(vouch)
    }

    /// Recent vouches for a named agent, most recent first.
    pub fn list_vouches(
        &self,
        target_name: &str,
        limit: usize,
        direction: VouchDirection,
    ) -> EngineResult<Vec<Vouch>> {
        let agent = self.identity.lookup(target_name)?;
        Ok(self.ledger.list_recent(agent.id, limit, direction))
    }

    /// Flag a vouch, then synchronously recompute the vouch target's
    /// reputation with the new discount.
    pub async fn flag_vouch(
        &self,
        flagger: &Agent,
        vouch_id: i64,
        reason: &str,
    ) -> EngineResult<Flag> {
        let flag = self.ledger.flag(vouch_id, flagger.id, reason)?;
        let vouch = self.ledger.get(vouch_id)?;

        if let Some(db) = &self.db {
            db.vouches()
                .insert_flag(&flag, vouch.flags_count)
                .await
                .map_err(EngineError::Storage)?;
        }

        let reputation = self
            .scorer
            .recompute(vouch.to_agent_id, &self.identity, &self.ledger)
            .await;
        self.persist_reputation(vouch.to_agent_id, reputation).await;

        Ok(flag)
    }

    /// Leaderboard of all agents, reputation descending.
    pub fn leaderboard(&self, limit: usize) -> Vec<Agent> {
        self.scorer.leaderboard(&self.identity, limit)
    }

    /// Full-graph rebuild over the current ledger snapshot. Returns the
    /// number of agents rescored.
    pub async fn rebuild(&self) -> usize {
        let rescored = self.scorer.rebuild_all(&self.identity, &self.ledger).await;

        if let Some(db) = &self.db {
            for agent in self.identity.snapshot() {
                if let Err(err) = db.agents().update_reputation(agent.id, agent.reputation).await {
                    warn!(agent_id = agent.id, error = %err, "Failed to persist rebuilt reputation");
                }
            }
        }

        rescored
    }

    /// Reload persisted state at boot, then rebuild scores from the
    /// reloaded ledger.
    pub async fn load_from_database(&self) -> EngineResult<()> {
        let Some(db) = &self.db else {
            return Ok(());
        };

        let agents = db.agents().load_all().await.map_err(EngineError::Storage)?;
        for agent in agents {
            self.identity.insert_loaded(agent);
        }

        let vouches = db
            .vouches()
            .load_all_vouches()
            .await
            .map_err(EngineError::Storage)?;
        for vouch in vouches {
            self.ledger.insert_loaded(vouch);
        }

        let flags = db
            .vouches()
            .load_all_flags()
            .await
            .map_err(EngineError::Storage)?;
        for flag in flags {
            self.ledger.insert_loaded_flag(flag);
        }

        let rescored = self.scorer.rebuild_all(&self.identity, &self.ledger).await;
        info!(
            agents = self.identity.len(),
            vouches = self.ledger.vouch_count(),
            flags = self.ledger.flag_count(),
            rescored,
            "Reloaded state from PostgreSQL"
        );

        Ok(())
    }

    /// Reputation updates are derivable from the journaled ledger, so a
    /// failed write degrades durability of the cache only; log and move on.
    async fn persist_reputation(&self, agent_id: i64, reputation: f64) {
        if let Some(db) = &self.db {
            if let Err(err) = db.agents().update_reputation(agent_id, reputation).await {
                warn!(agent_id, error = %err, "Failed to persist reputation");
            }
        }
    }
}

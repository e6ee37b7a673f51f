//! Agent registry with credential issuance

use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::{debug, info};

use crate::config::LimitsConfig;
use crate::error::{EngineError, EngineResult};
use crate::identity::agent::Agent;
use crate::identity::credential::{mint_api_key, parse_agent_id, verify_api_key};

/// In-memory agent registry.
///
/// Name uniqueness is case-insensitive and enforced under the name index's
/// entry guard, so two concurrent registrations of the same name linearize
/// and exactly one wins.
pub struct IdentityStore {
    limits: LimitsConfig,

    /// agent id -> record
    agents: DashMap<i64, Agent>,

    /// lowercased name -> agent id
    names: DashMap<String, i64>,

    next_id: AtomicI64,
}

impl IdentityStore {
    pub fn new(limits: LimitsConfig) -> Self {
        Self {
            limits,
            agents: DashMap::new(),
            names: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    /// Register a new agent. Returns the record and the plaintext API key,
    /// which is unrecoverable after this call.
    pub fn register(&self, name: &str, description: &str) -> EngineResult<(Agent, String)> {
        let name = name.trim();

        if name.is_empty() {
            return Err(EngineError::validation("agent name must not be empty"));
        }
        if name.chars().count() > self.limits.max_name_len {
            return Err(EngineError::validation(format!(
                "agent name exceeds {} characters",
                self.limits.max_name_len
            )));
        }
        if description.chars().count() > self.limits.max_description_len {
            return Err(EngineError::validation(format!(
                "description exceeds {} characters",
                self.limits.max_description_len
            )));
        }

        // Reserve the name under the entry guard before the record exists;
        // the guard linearizes same-name races.
        match self.names.entry(name.to_lowercase()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(EngineError::conflict(format!(
                "agent name '{}' is already taken",
                name
            ))),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                entry.insert(id);

                let (plaintext, credential) = mint_api_key(id);
                let agent = Agent::new(id, name.to_string(), description.to_string(), credential);
                self.agents.insert(id, agent.clone());

                info!(agent_id = id, name = %name, "Registered agent");
                Ok((agent, plaintext))
            }
        }
    }

    /// Resolve a presented API key to its agent. Malformed keys, unknown
    /// agents, and hash mismatches all yield the same error.
    pub fn authenticate(&self, presented: &str) -> EngineResult<Agent> {
        let agent_id = parse_agent_id(presented).ok_or(EngineError::Unauthorized)?;

        let agent = self
            .agents
            .get(&agent_id)
            .ok_or(EngineError::Unauthorized)?;

        if verify_api_key(&agent.credential, presented) {
            debug!(agent_id, "API key authenticated");
            Ok(agent.clone())
        } else {
            Err(EngineError::Unauthorized)
        }
    }

    /// Case-insensitive exact-match lookup by name.
    pub fn lookup(&self, name: &str) -> EngineResult<Agent> {
        let id = self
            .names
            .get(&name.trim().to_lowercase())
            .map(|entry| *entry.value())
            .ok_or_else(|| EngineError::not_found(format!("agent '{}' not found", name.trim())))?;

        self.get(id)
    }

    pub fn get(&self, id: i64) -> EngineResult<Agent> {
        self.agents
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| EngineError::not_found(format!("agent {} not found", id)))
    }

    /// Refresh the cached reputation scalar on an agent record.
    pub fn set_reputation(&self, id: i64, reputation: f64) {
        if let Some(mut entry) = self.agents.get_mut(&id) {
            entry.reputation = reputation;
        }
    }

    /// Snapshot of all agent records, unordered.
    pub fn snapshot(&self) -> Vec<Agent> {
        self.agents.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Reinsert a previously persisted agent at boot. Advances the id
    /// watermark past the loaded record.
    pub fn insert_loaded(&self, agent: Agent) {
        self.names.insert(agent.name.to_lowercase(), agent.id);
        self.next_id.fetch_max(agent.id + 1, Ordering::SeqCst);
        self.agents.insert(agent.id, agent);
    }
}

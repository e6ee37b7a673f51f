//! Ledger storage and indexes

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::{debug, info};

use crate::config::LimitsConfig;
use crate::error::{EngineError, EngineResult};
use crate::ledger::vouch::{validate_score, Flag, Vouch, VouchDirection};

/// In-memory vouch ledger.
///
/// Index layout:
/// - `vouches`: id -> record (the only mutable field is `flags_count`)
/// - `pairs`: (from, to) -> vouch ids in append order; the last id is the
///   active (non-superseded) vouch for the pair
/// - `incoming` / `outgoing`: agent id -> vouch ids in creation order
/// - `flag_index`: (vouch, flagger) -> flag id, the duplicate-flag guard
pub struct VouchLedger {
    limits: LimitsConfig,

    vouches: DashMap<i64, Vouch>,
    pairs: DashMap<(i64, i64), Vec<i64>>,
    incoming: DashMap<i64, Vec<i64>>,
    outgoing: DashMap<i64, Vec<i64>>,

    flags: DashMap<i64, Flag>,
    flag_index: DashMap<(i64, i64), i64>,

    next_vouch_id: AtomicI64,
    next_flag_id: AtomicI64,
}

impl VouchLedger {
    pub fn new(limits: LimitsConfig) -> Self {
        Self {
            limits,
            vouches: DashMap::new(),
            pairs: DashMap::new(),
            incoming: DashMap::new(),
            outgoing: DashMap::new(),
            flags: DashMap::new(),
            flag_index: DashMap::new(),
            next_vouch_id: AtomicI64::new(1),
            next_flag_id: AtomicI64::new(1),
        }
    }

    /// Append a vouch. The caller has already resolved both agents; this
    /// enforces the self-vouch rule, score range, and text bounds.
    pub fn submit(
        &self,
        from_agent_id: i64,
        to_agent_id: i64,
        score: i8,
        note: &str,
        receipt_url: Option<&str>,
    ) -> EngineResult<Vouch> {
        if from_agent_id == to_agent_id {
            return Err(EngineError::invalid_vouch("you cannot vouch for yourself"));
        }

        validate_score(score)?;

        if note.chars().count() > self.limits.max_note_len {
            return Err(EngineError::invalid_vouch(format!(
                "note exceeds {} characters",
                self.limits.max_note_len
            )));
        }

        if let Some(url) = receipt_url {
            if url.chars().count() > self.limits.max_receipt_url_len {
                return Err(EngineError::invalid_vouch(format!(
                    "receipt URL exceeds {} characters",
                    self.limits.max_receipt_url_len
                )));
            }
        }

        // The pair entry guard linearizes same-pair appends, so "latest
        // wins" is well-defined under concurrent submissions.
        let mut pair = self.pairs.entry((from_agent_id, to_agent_id)).or_default();

        let id = self.next_vouch_id.fetch_add(1, Ordering::SeqCst);
        let vouch = Vouch {
            id,
            from_agent_id,
            to_agent_id,
            score,
            note: note.to_string(),
            receipt_url: receipt_url.map(str::to_string),
            flags_count: 0,
            created_at: Utc::now(),
        };

        let superseded = pair.last().copied();
        pair.push(id);

        self.vouches.insert(id, vouch.clone());
        self.outgoing.entry(from_agent_id).or_default().push(id);
        self.incoming.entry(to_agent_id).or_default().push(id);

        drop(pair);

        match superseded {
            Some(prior) => info!(
                vouch_id = id,
                from = from_agent_id,
                to = to_agent_id,
                superseded = prior,
                "Vouch submitted, superseding prior vouch"
            ),
            None => info!(
                vouch_id = id,
                from = from_agent_id,
                to = to_agent_id,
                "Vouch submitted"
            ),
        }

        Ok(vouch)
    }

    /// Fetch a vouch by id.
    pub fn get(&self, vouch_id: i64) -> EngineResult<Vouch> {
        self.vouches
            .get(&vouch_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| EngineError::not_found(format!("vouch {} not found", vouch_id)))
    }

    /// Most-recent-first listing of an agent's vouches, superseded ones
    /// included. Bounded by `limit`.
    pub fn list_recent(&self, agent_id: i64, limit: usize, direction: VouchDirection) -> Vec<Vouch> {
        let index = match direction {
            VouchDirection::Incoming => &self.incoming,
            VouchDirection::Outgoing => &self.outgoing,
        };

        let Some(ids) = index.get(&agent_id) else {
            return Vec::new();
        };

        ids.iter()
            .rev()
            .take(limit)
            .filter_map(|id| self.vouches.get(id).map(|entry| entry.value().clone()))
            .collect()
    }

    /// Flag a vouch. One flag per (agent, vouch); the entry guard makes the
    /// uniqueness check and insertion atomic under races.
    pub fn flag(
        &self,
        vouch_id: i64,
        flagged_by_agent_id: i64,
        reason: &str,
    ) -> EngineResult<Flag> {
        if reason.trim().is_empty() {
            return Err(EngineError::validation("flag reason must not be empty"));
        }
        if reason.chars().count() > self.limits.max_reason_len {
            return Err(EngineError::validation(format!(
                "flag reason exceeds {} characters",
                self.limits.max_reason_len
            )));
        }

        if !self.vouches.contains_key(&vouch_id) {
            return Err(EngineError::not_found(format!(
                "vouch {} not found",
                vouch_id
            )));
        }

        match self.flag_index.entry((vouch_id, flagged_by_agent_id)) {
            Entry::Occupied(_) => Err(EngineError::conflict(
                "you have already flagged this vouch",
            )),
            Entry::Vacant(entry) => {
                let id = self.next_flag_id.fetch_add(1, Ordering::SeqCst);
                entry.insert(id);

                let flag = Flag {
                    id,
                    vouch_id,
                    flagged_by_agent_id,
                    reason: reason.to_string(),
                    created_at: Utc::now(),
                };
                self.flags.insert(id, flag.clone());

                if let Some(mut vouch) = self.vouches.get_mut(&vouch_id) {
                    vouch.flags_count += 1;
                    debug!(
                        vouch_id,
                        flagged_by = flagged_by_agent_id,
                        flags_count = vouch.flags_count,
                        "Vouch flagged"
                    );
                }

                Ok(flag)
            }
        }
    }

    /// Active (latest per ordered pair) vouches targeting an agent. These
    /// are the edges the scorer aggregates.
    pub fn active_incoming(&self, agent_id: i64) -> Vec<Vouch> {
        let Some(ids) = self.incoming.get(&agent_id) else {
            return Vec::new();
        };

        // Walk newest-first, keeping the first vouch seen per voucher.
        let mut seen = std::collections::HashSet::new();
        let mut active = Vec::new();
        for id in ids.iter().rev() {
            let Some(vouch) = self.vouches.get(id) else {
                continue;
            };
            if seen.insert(vouch.from_agent_id) {
                active.push(vouch.value().clone());
            }
        }
        active
    }

    /// The active vouch from one agent to another, if any.
    pub fn latest_between(&self, from_agent_id: i64, to_agent_id: i64) -> Option<Vouch> {
        let pair = self.pairs.get(&(from_agent_id, to_agent_id))?;
        let id = pair.last()?;
        self.vouches.get(id).map(|entry| entry.value().clone())
    }

    pub fn vouch_count(&self) -> usize {
        self.vouches.len()
    }

    pub fn flag_count(&self) -> usize {
        self.flags.len()
    }

    /// Snapshot of all vouches in creation order, for rebuilds and
    /// persistence bootstraps.
    pub fn snapshot(&self) -> Vec<Vouch> {
        let mut all: Vec<Vouch> = self
            .vouches
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        all.sort_by_key(|vouch| vouch.id);
        all
    }

    /// Reinsert a previously persisted vouch at boot, rebuilding indexes.
    /// Vouches must be loaded in creation (id) order so pair supersession
    /// is reconstructed faithfully.
    pub fn insert_loaded(&self, vouch: Vouch) {
        self.next_vouch_id.fetch_max(vouch.id + 1, Ordering::SeqCst);
        self.pairs
            .entry((vouch.from_agent_id, vouch.to_agent_id))
            .or_default()
            .push(vouch.id);
        self.outgoing
            .entry(vouch.from_agent_id)
            .or_default()
            .push(vouch.id);
        self.incoming
            .entry(vouch.to_agent_id)
            .or_default()
            .push(vouch.id);
        self.vouches.insert(vouch.id, vouch);
    }

    /// Reinsert a previously persisted flag at boot. Does not touch
    /// `flags_count`; loaded vouches carry their persisted counts.
    pub fn insert_loaded_flag(&self, flag: Flag) {
        self.next_flag_id.fetch_max(flag.id + 1, Ordering::SeqCst);
        self.flag_index
            .insert((flag.vouch_id, flag.flagged_by_agent_id), flag.id);
        self.flags.insert(flag.id, flag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> VouchLedger {
        VouchLedger::new(LimitsConfig::default())
    }

    #[test]
    fn test_submit_and_get() {
        let ledger = ledger();
        let vouch = ledger.submit(1, 2, 5, "shipped a great patch", None).unwrap();

        let fetched = ledger.get(vouch.id).unwrap();
        assert_eq!(fetched.from_agent_id, 1);
        assert_eq!(fetched.to_agent_id, 2);
        assert_eq!(fetched.score, 5);
        assert_eq!(fetched.flags_count, 0);
    }

    #[test]
    fn test_self_vouch_rejected() {
        let ledger = ledger();
        for score in [-5, -1, 1, 5] {
            let err = ledger.submit(1, 1, score, "", None).unwrap_err();
            assert!(matches!(err, EngineError::InvalidVouch(_)));
        }
    }

    #[test]
    fn test_score_validation() {
        let ledger = ledger();
        for score in [0, 6, -6] {
            let err = ledger.submit(1, 2, score, "", None).unwrap_err();
            assert!(matches!(err, EngineError::InvalidVouch(_)));
        }
    }

    #[test]
    fn test_oversize_note_rejected() {
        let ledger = ledger();
        let err = ledger.submit(1, 2, 3, &"n".repeat(501), None).unwrap_err();
        assert!(matches!(err, EngineError::InvalidVouch(_)));
    }

    #[test]
    fn test_supersession_latest_wins() {
        let ledger = ledger();
        let first = ledger.submit(1, 2, 5, "first", None).unwrap();
        let second = ledger.submit(1, 2, -3, "revised", None).unwrap();

        // Only the latest is active.
        let active = ledger.active_incoming(2);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, second.id);
        assert_eq!(active[0].score, -3);

        // Both remain listed, newest first.
        let listed = ledger.list_recent(2, 10, VouchDirection::Incoming);
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);

        // The superseded vouch is still flaggable.
        assert!(ledger.flag(first.id, 3, "stale praise").is_ok());
    }

    #[test]
    fn test_active_incoming_distinct_vouchers() {
        let ledger = ledger();
        ledger.submit(1, 9, 5, "", None).unwrap();
        ledger.submit(2, 9, 3, "", None).unwrap();
        ledger.submit(3, 9, -2, "", None).unwrap();

        let active = ledger.active_incoming(9);
        assert_eq!(active.len(), 3);
    }

    #[test]
    fn test_list_recent_direction_and_limit() {
        let ledger = ledger();
        ledger.submit(1, 2, 1, "", None).unwrap();
        ledger.submit(1, 3, 2, "", None).unwrap();
        ledger.submit(4, 1, 3, "", None).unwrap();

        let given = ledger.list_recent(1, 10, VouchDirection::Outgoing);
        assert_eq!(given.len(), 2);
        assert_eq!(given[0].to_agent_id, 3);

        let received = ledger.list_recent(1, 10, VouchDirection::Incoming);
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].from_agent_id, 4);

        let bounded = ledger.list_recent(1, 1, VouchDirection::Outgoing);
        assert_eq!(bounded.len(), 1);
    }

    #[test]
    fn test_duplicate_flag_conflict() {
        let ledger = ledger();
        let vouch = ledger.submit(1, 2, 5, "", None).unwrap();

        ledger.flag(vouch.id, 3, "spam").unwrap();
        let err = ledger.flag(vouch.id, 3, "spam again").unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));

        // Distinct flaggers each count once.
        ledger.flag(vouch.id, 4, "collusion").unwrap();
        assert_eq!(ledger.get(vouch.id).unwrap().flags_count, 2);
    }

    #[test]
    fn test_flag_unknown_vouch() {
        let ledger = ledger();
        let err = ledger.flag(999, 1, "ghost").unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn test_flag_reason_validation() {
        let ledger = ledger();
        let vouch = ledger.submit(1, 2, 5, "", None).unwrap();

        assert!(matches!(
            ledger.flag(vouch.id, 3, "  ").unwrap_err(),
            EngineError::ValidationError(_)
        ));
        assert!(matches!(
            ledger.flag(vouch.id, 3, &"r".repeat(501)).unwrap_err(),
            EngineError::ValidationError(_)
        ));
    }

    #[test]
    fn test_latest_between() {
        let ledger = ledger();
        assert!(ledger.latest_between(1, 2).is_none());

        ledger.submit(1, 2, 5, "", None).unwrap();
        let second = ledger.submit(1, 2, 2, "", None).unwrap();

        assert_eq!(ledger.latest_between(1, 2).unwrap().id, second.id);
        assert!(ledger.latest_between(2, 1).is_none());
    }

    #[test]
    fn test_insert_loaded_rebuilds_indexes() {
        let ledger = ledger();
        let source = VouchLedger::new(LimitsConfig::default());
        source.submit(1, 2, 5, "kept", None).unwrap();
        source.submit(1, 2, 3, "newer", None).unwrap();

        for vouch in source.snapshot() {
            ledger.insert_loaded(vouch);
        }

        let active = ledger.active_incoming(2);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].score, 3);

        // New submissions continue past the loaded watermark.
        let fresh = ledger.submit(3, 2, 1, "", None).unwrap();
        assert_eq!(fresh.id, 3);
    }
}

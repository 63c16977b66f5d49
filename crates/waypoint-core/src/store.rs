//! In-memory session store.
//!
//! The store is the exclusive owner of every `Session`; all other
//! components receive snapshots. Mutations take the write lock for the
//! whole call and either fully apply or leave prior state untouched.

use crate::consistency::{ConsistencyStore, LedgerEntry};
use crate::constraint::{ConstraintDecision, ConstraintRule};
use crate::coverage::CoverageWeights;
use crate::error::{Result, WaypointError};
use crate::paths;
use crate::session::{Session, SessionConfig};
use crate::types::{ConstraintAction, Phase, SessionStatus};
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct SessionStore {
    weights: CoverageWeights,
    sessions: RwLock<BTreeMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: CoverageWeights) -> Self {
        Self {
            weights,
            sessions: RwLock::new(BTreeMap::new()),
        }
    }

    // ---------------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------------

    pub fn create(
        &self,
        id: &str,
        context: Map<String, Value>,
        constraints: Vec<ConstraintRule>,
        config: Option<SessionConfig>,
    ) -> Result<Session> {
        paths::validate_session_id(id)?;
        let mut sessions = self.write_lock();
        if sessions.contains_key(id) {
            return Err(WaypointError::SessionExists(id.to_string()));
        }
        let session = Session::new(id, context, constraints, config.unwrap_or_default());
        sessions.insert(id.to_string(), session.clone());
        Ok(session)
    }

    pub fn get(&self, id: &str) -> Result<Session> {
        self.read_lock()
            .get(id)
            .cloned()
            .ok_or_else(|| WaypointError::SessionNotFound(id.to_string()))
    }

    /// Snapshots of every session, oldest first.
    pub fn list(&self) -> Vec<Session> {
        let mut sessions: Vec<Session> = self.read_lock().values().cloned().collect();
        sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        sessions
    }

    /// Returns false for an unknown id — removal of nothing is a no-op,
    /// not an error.
    pub fn delete(&self, id: &str) -> bool {
        self.write_lock().remove(id).is_some()
    }

    /// Restore a previously snapshotted session (CLI persistence path).
    pub fn insert(&self, session: Session) {
        self.write_lock().insert(session.id.clone(), session);
    }

    // ---------------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------------

    pub fn advance_phase(&self, id: &str, to: Phase, description: Option<String>) -> Result<Session> {
        let mut sessions = self.write_lock();
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| WaypointError::SessionNotFound(id.to_string()))?;
        session.advance(to, description, &self.weights)?;
        Ok(session.clone())
    }

    pub fn merge_context(&self, id: &str, patch: Map<String, Value>) -> Result<Session> {
        let mut sessions = self.write_lock();
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| WaypointError::SessionNotFound(id.to_string()))?;
        session.merge_context(patch, &self.weights);
        Ok(session.clone())
    }

    pub fn set_status(&self, id: &str, status: SessionStatus) -> Result<Session> {
        let mut sessions = self.write_lock();
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| WaypointError::SessionNotFound(id.to_string()))?;
        session.status = status;
        session.updated_at = Utc::now();
        Ok(session.clone())
    }

    /// Record a constraint decision on the session and append the same
    /// tuple to the process-wide ledger. The session is validated first,
    /// so a failure appends nothing.
    pub fn record_decision(
        &self,
        id: &str,
        constraint_id: &str,
        action: ConstraintAction,
        reason: &str,
        ledger: &dyn ConsistencyStore,
    ) -> Result<ConstraintDecision> {
        let mut sessions = self.write_lock();
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| WaypointError::SessionNotFound(id.to_string()))?;
        let decision = session.record_decision(constraint_id, action, reason, &self.weights)?;
        ledger.append(
            constraint_id,
            LedgerEntry {
                session_id: id.to_string(),
                action,
                reason: reason.to_string(),
                recorded_at: decision.decided_at,
            },
        );
        Ok(decision)
    }

    pub fn recompute_coverage(&self, id: &str) -> Result<Session> {
        let mut sessions = self.write_lock();
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| WaypointError::SessionNotFound(id.to_string()))?;
        session.recompute_coverage(&self.weights);
        Ok(session.clone())
    }

    // ---------------------------------------------------------------------------
    // Lock helpers
    // ---------------------------------------------------------------------------

    fn read_lock(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, Session>> {
        self.sessions.read().expect("session store lock poisoned")
    }

    fn write_lock(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, Session>> {
        self.sessions.write().expect("session store lock poisoned")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consistency::MemoryLedger;
    use crate::types::ConstraintCategory;
    use serde_json::json;

    fn store() -> SessionStore {
        SessionStore::new()
    }

    fn rule(id: &str) -> ConstraintRule {
        ConstraintRule::new(id, id, ConstraintCategory::Technical).mandatory()
    }

    #[test]
    fn create_and_get_roundtrip() {
        let store = store();
        store.create("alpha", Map::new(), vec![], None).unwrap();
        let s = store.get("alpha").unwrap();
        assert_eq!(s.id, "alpha");
        assert_eq!(s.current_phase, Phase::Discovery);
    }

    #[test]
    fn duplicate_create_fails() {
        let store = store();
        store.create("alpha", Map::new(), vec![], None).unwrap();
        assert!(matches!(
            store.create("alpha", Map::new(), vec![], None),
            Err(WaypointError::SessionExists(_))
        ));
    }

    #[test]
    fn invalid_id_rejected() {
        let store = store();
        assert!(matches!(
            store.create("Not Valid", Map::new(), vec![], None),
            Err(WaypointError::InvalidSessionId(_))
        ));
    }

    #[test]
    fn get_unknown_is_not_found() {
        assert!(matches!(
            store().get("ghost"),
            Err(WaypointError::SessionNotFound(_))
        ));
    }

    #[test]
    fn delete_unknown_is_noop_false() {
        let store = store();
        assert!(!store.delete("ghost"));
        store.create("alpha", Map::new(), vec![], None).unwrap();
        assert!(store.delete("alpha"));
        assert!(store.get("alpha").is_err());
    }

    #[test]
    fn list_sorted_by_creation() {
        let store = store();
        store.create("first", Map::new(), vec![], None).unwrap();
        store.create("second", Map::new(), vec![], None).unwrap();
        let ids: Vec<String> = store.list().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn advance_rejects_skip_and_preserves_state() {
        let store = store();
        store.create("alpha", Map::new(), vec![], None).unwrap();
        let err = store.advance_phase("alpha", Phase::Planning, None).unwrap_err();
        assert!(matches!(err, WaypointError::InvalidTransition { .. }));
        assert_eq!(store.get("alpha").unwrap().current_phase, Phase::Discovery);
    }

    #[test]
    fn advance_updates_history() {
        let store = store();
        store.create("alpha", Map::new(), vec![], None).unwrap();
        let s = store
            .advance_phase("alpha", Phase::Requirements, Some("kickoff done".to_string()))
            .unwrap();
        assert_eq!(s.current_phase, Phase::Requirements);
        assert_eq!(s.history.len(), 1);
        assert_eq!(s.history[0].description, "kickoff done");
    }

    #[test]
    fn merge_context_via_store() {
        let store = store();
        store.create("alpha", Map::new(), vec![], None).unwrap();
        let patch: Map<String, Value> =
            [("goal".to_string(), json!("ship it"))].into_iter().collect();
        let s = store.merge_context("alpha", patch).unwrap();
        assert_eq!(s.context["goal"], json!("ship it"));
    }

    #[test]
    fn record_decision_appends_to_ledger() {
        let store = store();
        let ledger = MemoryLedger::new();
        store.create("alpha", Map::new(), vec![rule("c1")], None).unwrap();
        store
            .record_decision("alpha", "c1", ConstraintAction::Applied, "fits", &ledger)
            .unwrap();

        let entries = ledger.entries("c1");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].session_id, "alpha");
        assert_eq!(entries[0].action, ConstraintAction::Applied);

        let s = store.get("alpha").unwrap();
        assert!(s.decisions.contains_key("c1"));
    }

    #[test]
    fn failed_decision_appends_nothing() {
        let store = store();
        let ledger = MemoryLedger::new();
        store.create("alpha", Map::new(), vec![], None).unwrap();
        let err = store
            .record_decision("alpha", "ghost", ConstraintAction::Applied, "x", &ledger)
            .unwrap_err();
        assert!(matches!(err, WaypointError::ConstraintNotFound(_)));
        assert!(ledger.entries("ghost").is_empty());
    }

    #[test]
    fn snapshot_reads_do_not_alias_store_state() {
        let store = store();
        store.create("alpha", Map::new(), vec![], None).unwrap();
        let mut snapshot = store.get("alpha").unwrap();
        snapshot.context.insert("local".to_string(), json!(true));
        assert!(!store.get("alpha").unwrap().context.contains_key("local"));
    }

    #[test]
    fn set_status_pauses_and_resumes() {
        let store = store();
        store.create("alpha", Map::new(), vec![], None).unwrap();
        let s = store.set_status("alpha", SessionStatus::Paused).unwrap();
        assert_eq!(s.status, SessionStatus::Paused);
        let s = store.set_status("alpha", SessionStatus::Active).unwrap();
        assert_eq!(s.status, SessionStatus::Active);
    }
}

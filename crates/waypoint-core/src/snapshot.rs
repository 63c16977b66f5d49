//! Snapshot persistence for callers that need state to survive the
//! process — the engine itself stays in-memory. One YAML manifest per
//! session plus a single ledger file, all written atomically.

use crate::consistency::{ConsistencyStore, LedgerEntry, MemoryLedger};
use crate::coverage::CoverageWeights;
use crate::error::Result;
use crate::io;
use crate::paths;
use crate::session::Session;
use crate::store::SessionStore;
use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

pub fn save_session(root: &Path, session: &Session) -> Result<()> {
    let manifest = paths::session_manifest(root, &session.id);
    let data = serde_yaml::to_string(session)?;
    io::atomic_write(&manifest, data.as_bytes())
}

pub fn delete_session(root: &Path, id: &str) -> Result<bool> {
    let manifest = paths::session_manifest(root, id);
    if !manifest.exists() {
        return Ok(false);
    }
    std::fs::remove_file(&manifest)?;
    Ok(true)
}

/// Load every session manifest under the root into a fresh store.
/// Non-YAML files are ignored.
pub fn load_store(root: &Path, weights: CoverageWeights) -> Result<SessionStore> {
    let store = SessionStore::with_weights(weights);
    let dir = paths::sessions_dir(root);
    if !dir.exists() {
        return Ok(store);
    }
    for entry in std::fs::read_dir(&dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().map(|e| e == "yaml").unwrap_or(false) {
            let data = std::fs::read_to_string(&path)?;
            let session: Session = serde_yaml::from_str(&data)?;
            store.insert(session);
        }
    }
    Ok(store)
}

pub fn save_store(root: &Path, store: &SessionStore) -> Result<()> {
    for session in store.list() {
        save_session(root, &session)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

pub fn load_ledger(root: &Path) -> Result<MemoryLedger> {
    let ledger = MemoryLedger::new();
    let path = paths::ledger_path(root);
    if path.exists() {
        let data = std::fs::read_to_string(&path)?;
        let entries: BTreeMap<String, Vec<LedgerEntry>> = serde_yaml::from_str(&data)?;
        ledger.restore(entries);
    }
    Ok(ledger)
}

pub fn save_ledger(root: &Path, ledger: &MemoryLedger) -> Result<()> {
    let data = serde_yaml::to_string(&ledger.snapshot())?;
    io::atomic_write(&paths::ledger_path(root), data.as_bytes())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConstraintAction;
    use chrono::Utc;
    use serde_json::Map;
    use tempfile::TempDir;

    #[test]
    fn session_roundtrip_through_manifest() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new();
        store.create("alpha", Map::new(), vec![], None).unwrap();
        save_store(dir.path(), &store).unwrap();

        let loaded = load_store(dir.path(), CoverageWeights::default()).unwrap();
        let s = loaded.get("alpha").unwrap();
        assert_eq!(s.id, "alpha");
    }

    #[test]
    fn load_from_empty_root_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = load_store(dir.path(), CoverageWeights::default()).unwrap();
        assert!(store.list().is_empty());
    }

    #[test]
    fn delete_session_removes_manifest() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new();
        store.create("alpha", Map::new(), vec![], None).unwrap();
        save_store(dir.path(), &store).unwrap();

        assert!(delete_session(dir.path(), "alpha").unwrap());
        assert!(!delete_session(dir.path(), "alpha").unwrap());
        let loaded = load_store(dir.path(), CoverageWeights::default()).unwrap();
        assert!(loaded.list().is_empty());
    }

    #[test]
    fn ledger_roundtrip() {
        let dir = TempDir::new().unwrap();
        let ledger = MemoryLedger::new();
        ledger.append(
            "c1",
            LedgerEntry {
                session_id: "alpha".to_string(),
                action: ConstraintAction::Applied,
                reason: "fits".to_string(),
                recorded_at: Utc::now(),
            },
        );
        save_ledger(dir.path(), &ledger).unwrap();

        let loaded = load_ledger(dir.path()).unwrap();
        let entries = loaded.entries("c1");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].session_id, "alpha");
    }
}

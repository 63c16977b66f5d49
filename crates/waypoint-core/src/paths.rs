use crate::error::{Result, WaypointError};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const WAYPOINT_DIR: &str = ".waypoint";
pub const SESSIONS_DIR: &str = ".waypoint/sessions";

pub const CONFIG_FILE: &str = ".waypoint/config.yaml";
pub const LEDGER_FILE: &str = ".waypoint/ledger.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn sessions_dir(root: &Path) -> PathBuf {
    root.join(SESSIONS_DIR)
}

pub fn session_manifest(root: &Path, id: &str) -> PathBuf {
    sessions_dir(root).join(format!("{id}.yaml"))
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn ledger_path(root: &Path) -> PathBuf {
    root.join(LEDGER_FILE)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

static ID_RE: OnceLock<Regex> = OnceLock::new();

/// Session ids are caller-supplied but must be filesystem- and URL-safe:
/// lowercase alphanumeric with hyphens, no leading/trailing hyphen.
pub fn validate_session_id(id: &str) -> Result<()> {
    let re = ID_RE.get_or_init(|| {
        Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("static regex")
    });
    if id.is_empty() || id.len() > 100 || !re.is_match(id) {
        return Err(WaypointError::InvalidSessionId(id.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_ids_pass() {
        assert!(validate_session_id("checkout-redesign").is_ok());
        assert!(validate_session_id("a").is_ok());
        assert!(validate_session_id("v2-api-migration").is_ok());
    }

    #[test]
    fn invalid_ids_fail() {
        assert!(validate_session_id("").is_err());
        assert!(validate_session_id("Has-Caps").is_err());
        assert!(validate_session_id("under_score").is_err());
        assert!(validate_session_id("-leading").is_err());
        assert!(validate_session_id("trailing-").is_err());
        assert!(validate_session_id("dot.dot").is_err());
        assert!(validate_session_id(&"x".repeat(101)).is_err());
    }

    #[test]
    fn manifest_path_shape() {
        let p = session_manifest(Path::new("/tmp/project"), "checkout");
        assert_eq!(
            p,
            Path::new("/tmp/project/.waypoint/sessions/checkout.yaml")
        );
    }
}

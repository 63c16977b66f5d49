//! Cross-session consistency enforcement.
//!
//! The ledger is the only process-wide mutable state besides the session
//! store: an append-only history of constraint decisions across every
//! session this process has observed. Enforcement is stateless — each call
//! re-derives everything from a ledger snapshot and the session under test.

use crate::error::{Result, WaypointError};
use crate::session::Session;
use crate::types::{ConstraintAction, Phase, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// One decision observation: who decided what about a constraint, and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub session_id: String,
    pub action: ConstraintAction,
    pub reason: String,
    pub recorded_at: DateTime<Utc>,
}

/// Injectable store for the process-wide decision history. Tests reset it
/// with `clear`; production can back it with a real store as long as
/// appends are linearized and `snapshot` is taken under the same lock.
pub trait ConsistencyStore: Send + Sync {
    fn append(&self, constraint_id: &str, entry: LedgerEntry);
    fn entries(&self, constraint_id: &str) -> Vec<LedgerEntry>;
    fn snapshot(&self) -> BTreeMap<String, Vec<LedgerEntry>>;
    fn clear(&self);
}

/// In-memory reference implementation.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    inner: Mutex<BTreeMap<String, Vec<LedgerEntry>>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole ledger (snapshot restore).
    pub fn restore(&self, entries: BTreeMap<String, Vec<LedgerEntry>>) {
        *self.inner.lock().expect("ledger lock poisoned") = entries;
    }
}

impl ConsistencyStore for MemoryLedger {
    fn append(&self, constraint_id: &str, entry: LedgerEntry) {
        self.inner
            .lock()
            .expect("ledger lock poisoned")
            .entry(constraint_id.to_string())
            .or_default()
            .push(entry);
    }

    fn entries(&self, constraint_id: &str) -> Vec<LedgerEntry> {
        self.inner
            .lock()
            .expect("ledger lock poisoned")
            .get(constraint_id)
            .cloned()
            .unwrap_or_default()
    }

    fn snapshot(&self) -> BTreeMap<String, Vec<LedgerEntry>> {
        self.inner.lock().expect("ledger lock poisoned").clone()
    }

    fn clear(&self) {
        self.inner.lock().expect("ledger lock poisoned").clear();
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyConfig {
    /// Minimum historical sample before a decision can be called a
    /// minority.
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
}

fn default_min_samples() -> usize {
    3
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        Self {
            min_samples: default_min_samples(),
        }
    }
}

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    ConstraintInconsistency,
    PhaseCoverage,
    Space7Deviation,
}

impl ViolationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ViolationKind::ConstraintInconsistency => "constraint_inconsistency",
            ViolationKind::PhaseCoverage => "phase_coverage",
            ViolationKind::Space7Deviation => "space7_deviation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint_id: Option<String>,
    pub message: String,
    pub remediation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub session_id: String,
    pub violations: Vec<Violation>,
    /// 0–100: how aligned the session is with its own configuration and
    /// the canonical phase space.
    pub alignment_score: f64,
    pub checked_at: DateTime<Utc>,
}

impl ConsistencyReport {
    pub fn consistent(&self) -> bool {
        self.violations.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Majority
// ---------------------------------------------------------------------------

/// The historical majority action, or `None` on a tie — a tie has no
/// majority to deviate from.
pub fn majority_action(entries: &[LedgerEntry]) -> Option<ConstraintAction> {
    let mut counts: BTreeMap<&'static str, (ConstraintAction, usize)> = BTreeMap::new();
    for e in entries {
        counts
            .entry(e.action.as_str())
            .and_modify(|(_, n)| *n += 1)
            .or_insert((e.action, 1));
    }
    let best = counts.values().map(|(_, n)| *n).max()?;
    let mut winners = counts.values().filter(|(_, n)| *n == best);
    let (action, _) = winners.next()?;
    if winners.next().is_some() {
        return None;
    }
    Some(*action)
}

// ---------------------------------------------------------------------------
// Enforcement
// ---------------------------------------------------------------------------

/// Run all three consistency checks. Inconsistency is a reportable
/// outcome, never an error — only a structurally broken session fails.
pub fn enforce_consistency(
    session: &Session,
    ledger: &dyn ConsistencyStore,
    cfg: &ConsistencyConfig,
) -> Result<ConsistencyReport> {
    if !session.phases.contains_key(&session.current_phase) {
        return Err(WaypointError::ValidationFailed(format!(
            "session {} has no record for its current phase {}",
            session.id, session.current_phase
        )));
    }

    let history = ledger.snapshot();
    let mut violations = Vec::new();

    check_constraint_consistency(session, &history, cfg, &mut violations);
    check_phase_coverage(session, &mut violations);
    let alignment_score = check_space_alignment(session, &mut violations);

    Ok(ConsistencyReport {
        session_id: session.id.clone(),
        violations,
        alignment_score,
        checked_at: Utc::now(),
    })
}

/// Check 1: each current decision against the historical majority for the
/// same constraint id, ignoring this session's own past entries.
fn check_constraint_consistency(
    session: &Session,
    history: &BTreeMap<String, Vec<LedgerEntry>>,
    cfg: &ConsistencyConfig,
    violations: &mut Vec<Violation>,
) {
    for (constraint_id, decision) in &session.decisions {
        let Some(entries) = history.get(constraint_id) else {
            continue;
        };
        let others: Vec<LedgerEntry> = entries
            .iter()
            .filter(|e| e.session_id != session.id)
            .cloned()
            .collect();
        if others.len() < cfg.min_samples {
            continue;
        }
        let Some(majority) = majority_action(&others) else {
            continue;
        };
        if decision.action != majority {
            let sample = others.len();
            violations.push(Violation {
                kind: ViolationKind::ConstraintInconsistency,
                severity: Severity::High,
                constraint_id: Some(constraint_id.clone()),
                message: format!(
                    "constraint {constraint_id} was {} here but {} in the majority of {sample} prior sessions",
                    decision.action, majority
                ),
                remediation: format!(
                    "either align the decision with the historical {} or document why this effort diverges",
                    majority
                ),
            });
        }
    }
}

/// Check 2: mandatory constraints are due by the end of specification.
/// A session at or past that phase with undecided mandatory constraints
/// is critically under-covered.
fn check_phase_coverage(session: &Session, violations: &mut Vec<Violation>) {
    if session.current_phase < Phase::Specification {
        return;
    }
    for rule in session.undecided_mandatory() {
        violations.push(Violation {
            kind: ViolationKind::PhaseCoverage,
            severity: Severity::Critical,
            constraint_id: Some(rule.id.clone()),
            message: format!(
                "mandatory constraint {} has no decision at phase {}",
                rule.id, session.current_phase
            ),
            remediation: format!("record an applied/skipped/deferred decision for {}", rule.id),
        });
    }
}

/// Check 3: a single 0–100 alignment score from threshold attainment and
/// canonical-phase membership. Any shortfall is a space7 deviation.
fn check_space_alignment(session: &Session, violations: &mut Vec<Violation>) -> f64 {
    let threshold = session.config.coverage_threshold;
    let coverage_component = if threshold <= 0.0 || session.coverage.overall >= threshold {
        50.0
    } else {
        (session.coverage.overall / threshold) * 50.0
    };
    // Phase membership is enum-checked at the type level; the record map
    // was validated on entry, so this component only drops for sessions
    // whose phase sequence diverged from the canonical walk.
    let phase_component = if session
        .history
        .iter()
        .all(|t| t.to == t.from || Some(t.to) == t.from.next())
    {
        50.0
    } else {
        0.0
    };

    let score = (coverage_component + phase_component).clamp(0.0, 100.0);
    if score < 100.0 {
        violations.push(Violation {
            kind: ViolationKind::Space7Deviation,
            severity: Severity::Medium,
            constraint_id: None,
            message: format!(
                "space alignment {score:.1}/100: coverage {:.1} against threshold {threshold:.1}",
                session.coverage.overall
            ),
            remediation: "close coverage gaps before the next phase gate".to_string(),
        });
    }
    score
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnforcementPrompt {
    pub id: String,
    pub kind: ViolationKind,
    pub severity: Severity,
    pub text: String,
}

/// One prompt per violation kind present, carrying the worst severity seen
/// and the concatenated remediations for that kind.
pub fn generate_enforcement_prompts(
    session: &Session,
    report: &ConsistencyReport,
) -> Vec<EnforcementPrompt> {
    let kinds = [
        ViolationKind::ConstraintInconsistency,
        ViolationKind::PhaseCoverage,
        ViolationKind::Space7Deviation,
    ];
    kinds
        .iter()
        .filter_map(|&kind| {
            let of_kind: Vec<&Violation> =
                report.violations.iter().filter(|v| v.kind == kind).collect();
            if of_kind.is_empty() {
                return None;
            }
            let severity = of_kind
                .iter()
                .map(|v| v.severity)
                .min_by_key(|s| match s {
                    Severity::Critical => 0,
                    Severity::High => 1,
                    Severity::Medium => 2,
                    Severity::Low => 3,
                })
                .unwrap_or(Severity::Low);
            let remediations: Vec<&str> =
                of_kind.iter().map(|v| v.remediation.as_str()).collect();
            Some(EnforcementPrompt {
                id: Uuid::new_v4().to_string(),
                kind,
                severity,
                text: format!(
                    "[{}] session {}: {}",
                    kind.as_str(),
                    session.id,
                    remediations.join("; ")
                ),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Documentation artifacts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintDocs {
    pub adr: String,
    pub roadmap: String,
}

/// Render the ADR and remediation-roadmap text artifacts. Pure projection
/// of the report — no new computation.
pub fn generate_constraint_documentation(
    session: &Session,
    report: &ConsistencyReport,
) -> ConstraintDocs {
    let mut adr = String::new();
    adr.push_str(&format!(
        "# ADR: constraint decisions for session {}\n\n",
        session.id
    ));
    adr.push_str(&format!(
        "- Phase: {}\n- Overall coverage: {:.1}\n- Alignment: {:.1}/100\n\n",
        session.current_phase, session.coverage.overall, report.alignment_score
    ));
    adr.push_str("## Decisions\n\n");
    if session.decisions.is_empty() {
        adr.push_str("No constraint decisions recorded yet.\n");
    }
    for (id, d) in &session.decisions {
        adr.push_str(&format!("- `{id}`: {} — {}\n", d.action, d.justification));
    }
    adr.push_str("\n## Detected violations\n\n");
    if report.violations.is_empty() {
        adr.push_str("None.\n");
    }
    for v in &report.violations {
        adr.push_str(&format!("- **{}** ({}): {}\n", v.kind.as_str(), v.severity, v.message));
    }

    let mut roadmap = String::new();
    roadmap.push_str(&format!(
        "# Remediation roadmap for session {}\n\n",
        session.id
    ));
    if report.violations.is_empty() {
        roadmap.push_str("No remediation required; session is consistent with history.\n");
    } else {
        for (i, v) in report.violations.iter().enumerate() {
            roadmap.push_str(&format!(
                "{}. [{}] {}\n   action: {}\n",
                i + 1,
                v.severity,
                v.message,
                v.remediation
            ));
        }
    }

    ConstraintDocs { adr, roadmap }
}

// ---------------------------------------------------------------------------
// Usage patterns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsagePattern {
    pub constraint_id: String,
    pub total: usize,
    pub applied: usize,
    pub skipped: usize,
    pub deferred: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub majority: Option<ConstraintAction>,
    pub sessions: Vec<String>,
}

/// Read side of the ledger: how a constraint has been handled across all
/// sessions this process has observed.
pub fn usage_patterns(ledger: &dyn ConsistencyStore, constraint_id: &str) -> UsagePattern {
    let entries = ledger.entries(constraint_id);
    let mut sessions: Vec<String> = Vec::new();
    let mut applied = 0;
    let mut skipped = 0;
    let mut deferred = 0;
    for e in &entries {
        match e.action {
            ConstraintAction::Applied => applied += 1,
            ConstraintAction::Skipped => skipped += 1,
            ConstraintAction::Deferred => deferred += 1,
        }
        if !sessions.contains(&e.session_id) {
            sessions.push(e.session_id.clone());
        }
    }
    UsagePattern {
        constraint_id: constraint_id.to_string(),
        total: entries.len(),
        applied,
        skipped,
        deferred,
        majority: majority_action(&entries),
        sessions,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::ConstraintRule;
    use crate::coverage::CoverageWeights;
    use crate::session::SessionConfig;
    use crate::types::ConstraintCategory;
    use serde_json::Map;

    fn ledger_with(constraint_id: &str, decisions: &[(&str, ConstraintAction)]) -> MemoryLedger {
        let ledger = MemoryLedger::new();
        for (session_id, action) in decisions {
            ledger.append(
                constraint_id,
                LedgerEntry {
                    session_id: session_id.to_string(),
                    action: *action,
                    reason: "historical".to_string(),
                    recorded_at: Utc::now(),
                },
            );
        }
        ledger
    }

    fn session_with_decision(action: ConstraintAction) -> Session {
        let mut s = Session::new(
            "current",
            Map::new(),
            vec![ConstraintRule::new("c1", "C1", ConstraintCategory::Technical).mandatory()],
            SessionConfig::default(),
        );
        s.record_decision("c1", action, "this effort", &CoverageWeights::default())
            .unwrap();
        s
    }

    #[test]
    fn minority_decision_is_flagged() {
        let ledger = ledger_with(
            "c1",
            &[
                ("s1", ConstraintAction::Applied),
                ("s2", ConstraintAction::Applied),
                ("s3", ConstraintAction::Skipped),
            ],
        );
        let session = session_with_decision(ConstraintAction::Skipped);
        let report = enforce_consistency(&session, &ledger, &ConsistencyConfig::default()).unwrap();
        let inconsistencies: Vec<&Violation> = report
            .violations
            .iter()
            .filter(|v| v.kind == ViolationKind::ConstraintInconsistency)
            .collect();
        assert_eq!(inconsistencies.len(), 1);
        assert_eq!(inconsistencies[0].constraint_id.as_deref(), Some("c1"));
        assert!(inconsistencies[0].message.contains("skipped"));
    }

    #[test]
    fn majority_decision_passes() {
        let ledger = ledger_with(
            "c1",
            &[
                ("s1", ConstraintAction::Applied),
                ("s2", ConstraintAction::Applied),
                ("s3", ConstraintAction::Skipped),
            ],
        );
        let session = session_with_decision(ConstraintAction::Applied);
        let report = enforce_consistency(&session, &ledger, &ConsistencyConfig::default()).unwrap();
        assert!(report
            .violations
            .iter()
            .all(|v| v.kind != ViolationKind::ConstraintInconsistency));
    }

    #[test]
    fn below_min_samples_no_flag() {
        let ledger = ledger_with(
            "c1",
            &[("s1", ConstraintAction::Applied), ("s2", ConstraintAction::Applied)],
        );
        let session = session_with_decision(ConstraintAction::Skipped);
        let report = enforce_consistency(&session, &ledger, &ConsistencyConfig::default()).unwrap();
        assert!(report
            .violations
            .iter()
            .all(|v| v.kind != ViolationKind::ConstraintInconsistency));
    }

    #[test]
    fn own_history_is_excluded_from_the_sample() {
        // Three entries, but one belongs to the session under test.
        let ledger = ledger_with(
            "c1",
            &[
                ("s1", ConstraintAction::Applied),
                ("s2", ConstraintAction::Applied),
                ("current", ConstraintAction::Applied),
            ],
        );
        let session = session_with_decision(ConstraintAction::Skipped);
        let report = enforce_consistency(&session, &ledger, &ConsistencyConfig::default()).unwrap();
        assert!(report
            .violations
            .iter()
            .all(|v| v.kind != ViolationKind::ConstraintInconsistency));
    }

    #[test]
    fn tie_has_no_majority() {
        let entries: Vec<LedgerEntry> = [
            ("s1", ConstraintAction::Applied),
            ("s2", ConstraintAction::Skipped),
        ]
        .iter()
        .map(|(sid, a)| LedgerEntry {
            session_id: sid.to_string(),
            action: *a,
            reason: String::new(),
            recorded_at: Utc::now(),
        })
        .collect();
        assert_eq!(majority_action(&entries), None);
    }

    #[test]
    fn undecided_mandatory_at_specification_is_critical() {
        let mut s = Session::new(
            "late",
            Map::new(),
            vec![ConstraintRule::new("c1", "C1", ConstraintCategory::Technical).mandatory()],
            SessionConfig::default(),
        );
        let w = CoverageWeights::default();
        s.advance(Phase::Requirements, None, &w).unwrap();
        s.advance(Phase::Planning, None, &w).unwrap();
        s.advance(Phase::Specification, None, &w).unwrap();

        let ledger = MemoryLedger::new();
        let report = enforce_consistency(&s, &ledger, &ConsistencyConfig::default()).unwrap();
        let coverage: Vec<&Violation> = report
            .violations
            .iter()
            .filter(|v| v.kind == ViolationKind::PhaseCoverage)
            .collect();
        assert_eq!(coverage.len(), 1);
        assert_eq!(coverage[0].severity, Severity::Critical);
    }

    #[test]
    fn alignment_shortfall_is_a_space7_deviation() {
        let session = session_with_decision(ConstraintAction::Skipped);
        // Skipped decision keeps coverage under the default threshold.
        assert!(session.coverage.overall < session.config.coverage_threshold);
        let ledger = MemoryLedger::new();
        let report = enforce_consistency(&session, &ledger, &ConsistencyConfig::default()).unwrap();
        assert!(report.alignment_score < 100.0);
        assert!(report
            .violations
            .iter()
            .any(|v| v.kind == ViolationKind::Space7Deviation));
    }

    #[test]
    fn enforcement_is_deterministic() {
        let ledger = ledger_with(
            "c1",
            &[
                ("s1", ConstraintAction::Applied),
                ("s2", ConstraintAction::Applied),
                ("s3", ConstraintAction::Skipped),
            ],
        );
        let session = session_with_decision(ConstraintAction::Skipped);
        let cfg = ConsistencyConfig::default();
        let a = enforce_consistency(&session, &ledger, &cfg).unwrap();
        let b = enforce_consistency(&session, &ledger, &cfg).unwrap();
        assert_eq!(a.violations, b.violations);
        assert_eq!(a.alignment_score, b.alignment_score);
    }

    #[test]
    fn prompts_group_by_kind() {
        let ledger = ledger_with(
            "c1",
            &[
                ("s1", ConstraintAction::Applied),
                ("s2", ConstraintAction::Applied),
                ("s3", ConstraintAction::Applied),
            ],
        );
        let session = session_with_decision(ConstraintAction::Skipped);
        let report = enforce_consistency(&session, &ledger, &ConsistencyConfig::default()).unwrap();
        let prompts = generate_enforcement_prompts(&session, &report);
        assert!(!prompts.is_empty());
        // One prompt per kind present, no duplicates.
        let mut kinds: Vec<ViolationKind> = prompts.iter().map(|p| p.kind).collect();
        kinds.dedup();
        assert_eq!(kinds.len(), prompts.len());
        assert!(prompts.iter().all(|p| p.text.contains("current")));
    }

    #[test]
    fn documentation_embeds_session_and_violations() {
        let ledger = ledger_with(
            "c1",
            &[
                ("s1", ConstraintAction::Applied),
                ("s2", ConstraintAction::Applied),
                ("s3", ConstraintAction::Applied),
            ],
        );
        let session = session_with_decision(ConstraintAction::Skipped);
        let report = enforce_consistency(&session, &ledger, &ConsistencyConfig::default()).unwrap();
        let docs = generate_constraint_documentation(&session, &report);
        assert!(docs.adr.contains("session current"));
        assert!(docs.adr.contains("constraint_inconsistency"));
        assert!(docs.roadmap.contains("action:"));
    }

    #[test]
    fn usage_patterns_totals_and_majority() {
        let ledger = ledger_with(
            "c1",
            &[
                ("s1", ConstraintAction::Applied),
                ("s2", ConstraintAction::Applied),
                ("s3", ConstraintAction::Deferred),
            ],
        );
        let pattern = usage_patterns(&ledger, "c1");
        assert_eq!(pattern.total, 3);
        assert_eq!(pattern.applied, 2);
        assert_eq!(pattern.deferred, 1);
        assert_eq!(pattern.majority, Some(ConstraintAction::Applied));
        assert_eq!(pattern.sessions.len(), 3);
    }

    #[test]
    fn clear_resets_the_ledger() {
        let ledger = ledger_with("c1", &[("s1", ConstraintAction::Applied)]);
        assert_eq!(ledger.entries("c1").len(), 1);
        ledger.clear();
        assert!(ledger.entries("c1").is_empty());
        assert!(ledger.snapshot().is_empty());
    }
}

use crate::constraint::{ConstraintDecision, ConstraintRule};
use crate::coverage::{self, CoverageReport, CoverageWeights};
use crate::error::{Result, WaypointError};
use crate::phase;
use crate::types::{ConstraintAction, Phase, PhaseStatus, SessionStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// PhaseRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub status: PhaseStatus,
    /// Context fields this phase must fill before it counts as complete.
    pub required: Vec<String>,
    /// Completion percentage for this phase, 0–100.
    pub coverage: f64,
    /// References to produced artifacts (document paths, ADR ids, links).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entered_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exited_at: Option<DateTime<Utc>>,
}

impl PhaseRecord {
    fn pending(p: Phase) -> Self {
        Self {
            status: PhaseStatus::Pending,
            required: phase::required_fields(p)
                .iter()
                .map(|s| s.to_string())
                .collect(),
            coverage: 0.0,
            artifacts: Vec::new(),
            entered_at: None,
            exited_at: None,
        }
    }

    /// Entered = active or complete. Pending phases have not started.
    pub fn entered(&self) -> bool {
        !matches!(self.status, PhaseStatus::Pending)
    }
}

// ---------------------------------------------------------------------------
// Transition
// ---------------------------------------------------------------------------

/// One entry in the append-only phase history log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition {
    pub from: Phase,
    pub to: Phase,
    pub at: DateTime<Utc>,
    pub description: String,
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_coverage_threshold")]
    pub coverage_threshold: f64,
}

fn default_coverage_threshold() -> f64 {
    70.0
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            coverage_threshold: default_coverage_threshold(),
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub current_phase: Phase,
    pub phases: BTreeMap<Phase, PhaseRecord>,
    /// Free-form goal/requirements/domain data. Merged, never replaced.
    #[serde(default)]
    pub context: Map<String, Value>,
    #[serde(default)]
    pub constraints: Vec<ConstraintRule>,
    /// One decision per constraint id, at most.
    #[serde(default)]
    pub decisions: BTreeMap<String, ConstraintDecision>,
    pub coverage: CoverageReport,
    /// Append-only. Entries are pushed only by `advance`.
    #[serde(default)]
    pub history: Vec<Transition>,
    pub status: SessionStatus,
    #[serde(default)]
    pub config: SessionConfig,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(
        id: impl Into<String>,
        context: Map<String, Value>,
        constraints: Vec<ConstraintRule>,
        config: SessionConfig,
    ) -> Self {
        let now = Utc::now();
        let mut phases: BTreeMap<Phase, PhaseRecord> = Phase::all()
            .iter()
            .map(|&p| (p, PhaseRecord::pending(p)))
            .collect();
        if let Some(rec) = phases.get_mut(&Phase::Discovery) {
            rec.status = PhaseStatus::Active;
            rec.entered_at = Some(now);
        }

        let mut session = Self {
            id: id.into(),
            current_phase: Phase::Discovery,
            phases,
            context,
            constraints,
            decisions: BTreeMap::new(),
            coverage: CoverageReport::empty(),
            history: Vec::new(),
            status: SessionStatus::Active,
            config,
            created_at: now,
            updated_at: now,
        };
        session.recompute_coverage(&CoverageWeights::default());
        session
    }

    // ---------------------------------------------------------------------------
    // Lookup helpers
    // ---------------------------------------------------------------------------

    pub fn constraint(&self, id: &str) -> Option<&ConstraintRule> {
        self.constraints.iter().find(|c| c.id == id)
    }

    pub fn decision(&self, constraint_id: &str) -> Option<&ConstraintDecision> {
        self.decisions.get(constraint_id)
    }

    /// Mandatory constraints that do not yet carry a decision.
    pub fn undecided_mandatory(&self) -> Vec<&ConstraintRule> {
        self.constraints
            .iter()
            .filter(|c| c.mandatory && !self.decisions.contains_key(&c.id))
            .collect()
    }

    // ---------------------------------------------------------------------------
    // Phase transitions
    // ---------------------------------------------------------------------------

    pub fn can_advance_to(&self, target: Phase) -> Result<()> {
        if !phase::can_transition(self.current_phase, target) {
            let reason = if target < self.current_phase {
                "transitions are forward-only".to_string()
            } else {
                format!(
                    "phases cannot be skipped (next is {})",
                    self.current_phase
                        .next()
                        .map(|p| p.to_string())
                        .unwrap_or_else(|| "none".to_string())
                )
            };
            return Err(WaypointError::InvalidTransition {
                from: self.current_phase.to_string(),
                to: target.to_string(),
                reason,
            });
        }

        // Every mandatory constraint needs a decision before leaving
        // specification behind.
        if self.current_phase >= Phase::Specification && target > self.current_phase {
            let undecided = self.undecided_mandatory();
            if !undecided.is_empty() {
                let ids: Vec<&str> = undecided.iter().map(|c| c.id.as_str()).collect();
                return Err(WaypointError::ValidationFailed(format!(
                    "mandatory constraints without a decision: {}",
                    ids.join(", ")
                )));
            }
        }

        Ok(())
    }

    /// Validate, then commit: close the outgoing record, activate the
    /// incoming one, append history. A re-entry of the current phase logs
    /// a transition without touching phase records.
    pub fn advance(
        &mut self,
        target: Phase,
        description: Option<String>,
        weights: &CoverageWeights,
    ) -> Result<()> {
        self.can_advance_to(target)?;

        let now = Utc::now();
        let from = self.current_phase;
        let description = description
            .unwrap_or_else(|| format!("advanced from {from} to {target}"));

        if target != from {
            if let Some(rec) = self.phases.get_mut(&from) {
                rec.status = PhaseStatus::Complete;
                rec.exited_at = Some(now);
            }
            if let Some(rec) = self.phases.get_mut(&target) {
                rec.status = PhaseStatus::Active;
                rec.entered_at = Some(now);
            }
            self.current_phase = target;
            if target == Phase::Implementation {
                self.status = SessionStatus::Completed;
            }
        }

        self.history.push(Transition {
            from,
            to: target,
            at: now,
            description,
        });
        self.updated_at = now;
        self.recompute_coverage(weights);
        Ok(())
    }

    // ---------------------------------------------------------------------------
    // Context
    // ---------------------------------------------------------------------------

    /// Shallow merge: later keys win, keys absent from `patch` survive.
    pub fn merge_context(&mut self, patch: Map<String, Value>, weights: &CoverageWeights) {
        for (k, v) in patch {
            self.context.insert(k, v);
        }
        self.updated_at = Utc::now();
        self.recompute_coverage(weights);
    }

    // ---------------------------------------------------------------------------
    // Decisions
    // ---------------------------------------------------------------------------

    /// Record (or overwrite) the decision for a constraint this session
    /// actually carries.
    pub fn record_decision(
        &mut self,
        constraint_id: &str,
        action: ConstraintAction,
        reason: &str,
        weights: &CoverageWeights,
    ) -> Result<ConstraintDecision> {
        if self.constraint(constraint_id).is_none() {
            return Err(WaypointError::ConstraintNotFound(constraint_id.to_string()));
        }
        let decision = ConstraintDecision::new(constraint_id, action, reason);
        self.decisions
            .insert(constraint_id.to_string(), decision.clone());
        self.updated_at = Utc::now();
        self.recompute_coverage(weights);
        Ok(decision)
    }

    // ---------------------------------------------------------------------------
    // Coverage
    // ---------------------------------------------------------------------------

    pub fn recompute_coverage(&mut self, weights: &CoverageWeights) {
        // Phase records first, so the report sees fresh numbers.
        let per_phase: Vec<(Phase, f64)> = self
            .phases
            .iter()
            .map(|(&p, rec)| (p, coverage::phase_completion(p, rec, &self.context)))
            .collect();
        for (p, pct) in per_phase {
            if let Some(rec) = self.phases.get_mut(&p) {
                rec.coverage = pct;
            }
        }
        self.coverage = coverage::compute_coverage(self, weights);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConstraintCategory;
    use serde_json::json;

    fn session() -> Session {
        Session::new("checkout-redesign", Map::new(), Vec::new(), SessionConfig::default())
    }

    fn with_mandatory_constraint() -> Session {
        Session::new(
            "checkout-redesign",
            Map::new(),
            vec![ConstraintRule::new("pci", "PCI compliance", ConstraintCategory::Regulatory)
                .mandatory()],
            SessionConfig::default(),
        )
    }

    fn advance_all(s: &mut Session, to: Phase) {
        let w = CoverageWeights::default();
        while s.current_phase < to {
            let next = s.current_phase.next().unwrap();
            s.advance(next, None, &w).unwrap();
        }
    }

    #[test]
    fn new_session_starts_at_discovery() {
        let s = session();
        assert_eq!(s.current_phase, Phase::Discovery);
        assert_eq!(s.status, SessionStatus::Active);
        assert!(s.history.is_empty());
        assert_eq!(s.phases[&Phase::Discovery].status, PhaseStatus::Active);
        assert_eq!(s.phases[&Phase::Planning].status, PhaseStatus::Pending);
    }

    #[test]
    fn advance_to_successor_updates_records_and_history() {
        let mut s = session();
        s.advance(Phase::Requirements, None, &CoverageWeights::default())
            .unwrap();
        assert_eq!(s.current_phase, Phase::Requirements);
        assert_eq!(s.phases[&Phase::Discovery].status, PhaseStatus::Complete);
        assert!(s.phases[&Phase::Discovery].exited_at.is_some());
        assert_eq!(s.phases[&Phase::Requirements].status, PhaseStatus::Active);
        assert_eq!(s.history.len(), 1);
        assert!(s.history[0].description.contains("discovery"));
    }

    #[test]
    fn phase_skip_rejected_without_mutation() {
        let mut s = session();
        let err = s
            .advance(Phase::Planning, None, &CoverageWeights::default())
            .unwrap_err();
        assert!(matches!(err, WaypointError::InvalidTransition { .. }));
        assert_eq!(s.current_phase, Phase::Discovery);
        assert!(s.history.is_empty());
    }

    #[test]
    fn backward_transition_rejected() {
        let mut s = session();
        advance_all(&mut s, Phase::Planning);
        let err = s
            .advance(Phase::Discovery, None, &CoverageWeights::default())
            .unwrap_err();
        assert!(matches!(err, WaypointError::InvalidTransition { .. }));
        assert_eq!(s.current_phase, Phase::Planning);
    }

    #[test]
    fn reentry_logs_history_without_completing_phase() {
        let mut s = session();
        s.advance(Phase::Discovery, Some("revisited scope".to_string()), &CoverageWeights::default())
            .unwrap();
        assert_eq!(s.current_phase, Phase::Discovery);
        assert_eq!(s.phases[&Phase::Discovery].status, PhaseStatus::Active);
        assert_eq!(s.history.len(), 1);
        assert_eq!(s.history[0].description, "revisited scope");
    }

    #[test]
    fn history_matches_canonical_order() {
        let mut s = session();
        advance_all(&mut s, Phase::Implementation);
        let phases: Vec<Phase> = s.history.iter().map(|t| t.to).collect();
        assert_eq!(phases, Phase::all()[1..].to_vec());
        for t in &s.history {
            assert_eq!(Some(t.to), t.from.next());
        }
        assert_eq!(s.status, SessionStatus::Completed);
    }

    #[test]
    fn undecided_mandatory_blocks_advance_past_specification() {
        let mut s = with_mandatory_constraint();
        advance_all(&mut s, Phase::Specification);
        let err = s
            .advance(Phase::Architecture, None, &CoverageWeights::default())
            .unwrap_err();
        assert!(matches!(err, WaypointError::ValidationFailed(_)));
        assert_eq!(s.current_phase, Phase::Specification);
    }

    #[test]
    fn decided_mandatory_unblocks_advance() {
        let mut s = with_mandatory_constraint();
        advance_all(&mut s, Phase::Specification);
        s.record_decision("pci", ConstraintAction::Applied, "tokenized card data", &CoverageWeights::default())
            .unwrap();
        s.advance(Phase::Architecture, None, &CoverageWeights::default())
            .unwrap();
        assert_eq!(s.current_phase, Phase::Architecture);
    }

    #[test]
    fn decision_for_unknown_constraint_fails() {
        let mut s = session();
        let err = s
            .record_decision("ghost", ConstraintAction::Applied, "x", &CoverageWeights::default())
            .unwrap_err();
        assert!(matches!(err, WaypointError::ConstraintNotFound(_)));
    }

    #[test]
    fn merge_context_keeps_absent_keys() {
        let mut s = session();
        let w = CoverageWeights::default();
        let mut first = Map::new();
        first.insert("goal".to_string(), json!("faster checkout"));
        first.insert("domain".to_string(), json!("payments"));
        s.merge_context(first, &w);

        let mut patch = Map::new();
        patch.insert("goal".to_string(), json!("one-click checkout"));
        s.merge_context(patch, &w);

        assert_eq!(s.context["goal"], json!("one-click checkout"));
        assert_eq!(s.context["domain"], json!("payments"));
    }

    #[test]
    fn session_yaml_roundtrip() {
        let mut s = with_mandatory_constraint();
        s.merge_context(
            [("goal".to_string(), json!("rework checkout"))].into_iter().collect(),
            &CoverageWeights::default(),
        );
        let yaml = serde_yaml::to_string(&s).unwrap();
        let parsed: Session = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.id, s.id);
        assert_eq!(parsed.current_phase, s.current_phase);
        assert_eq!(parsed.constraints.len(), 1);
        assert_eq!(parsed.context["goal"], json!("rework checkout"));
    }
}

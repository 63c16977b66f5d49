use crate::types::{ConstraintAction, ConstraintCategory};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ConstraintRule
// ---------------------------------------------------------------------------

/// A named rule a session must explicitly apply, skip, or defer.
/// Rules are stable by `id` across sessions — that stability is what makes
/// cross-session comparison possible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintRule {
    pub id: String,
    pub name: String,
    pub category: ConstraintCategory,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Free-form validation descriptor ("latency budget < 200ms", a rule
    /// expression, a checklist reference) — opaque to the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<String>,
    /// Provenance: where this rule came from (policy doc, team charter).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

fn default_weight() -> f64 {
    1.0
}

impl ConstraintRule {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: ConstraintCategory,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            mandatory: false,
            weight: default_weight(),
            validation: None,
            source: None,
        }
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

// ---------------------------------------------------------------------------
// ConstraintDecision
// ---------------------------------------------------------------------------

/// The recorded outcome for one (session, constraint) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintDecision {
    pub constraint_id: String,
    pub action: ConstraintAction,
    /// How much this decision contributes to the constraint coverage
    /// dimension, 0–100.
    pub coverage_contribution: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<String>,
    pub justification: String,
    pub decided_at: DateTime<Utc>,
}

impl ConstraintDecision {
    pub fn new(
        constraint_id: impl Into<String>,
        action: ConstraintAction,
        justification: impl Into<String>,
    ) -> Self {
        Self {
            constraint_id: constraint_id.into(),
            action,
            coverage_contribution: action_contribution(action),
            violations: Vec::new(),
            justification: justification.into(),
            decided_at: Utc::now(),
        }
    }
}

/// Applied satisfies the constraint outright. Deferred is explicit but
/// unresolved, so it earns half credit. Skipped earns nothing.
pub fn action_contribution(action: ConstraintAction) -> f64 {
    match action {
        ConstraintAction::Applied => 100.0,
        ConstraintAction::Deferred => 50.0,
        ConstraintAction::Skipped => 0.0,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

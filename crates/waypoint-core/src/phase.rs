//! Pure phase-workflow rules.
//!
//! Nothing in this module touches session state. The store calls these
//! functions with explicit inputs and acts on the answers.

use crate::types::Phase;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Required-content checklists
// ---------------------------------------------------------------------------

/// Context fields a phase must carry before it counts as complete.
pub fn required_fields(phase: Phase) -> &'static [&'static str] {
    match phase {
        Phase::Discovery => &["problem_statement", "stakeholders", "context"],
        Phase::Requirements => &[
            "functional_requirements",
            "non_functional_requirements",
            "acceptance_criteria",
        ],
        Phase::Planning => &["approach", "milestones", "risks"],
        Phase::Specification => &["interfaces", "data_model", "constraints_resolved"],
        Phase::Architecture => &["components", "technology_choices", "tradeoffs"],
        Phase::Implementation => &["implementation_notes", "validation_plan"],
    }
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// A phase may re-enter itself or step to its immediate successor.
/// Everything else — skips, reversals — is rejected.
pub fn can_transition(from: Phase, to: Phase) -> bool {
    to == from || Some(to) == from.next()
}

/// All phases strictly before `phase` in the canonical order.
pub fn dependencies(phase: Phase) -> Vec<Phase> {
    Phase::all()
        .iter()
        .copied()
        .filter(|p| *p < phase)
        .collect()
}

/// Position of `phase` in the canonical order as a percentage,
/// where `implementation` is 100.
pub fn progress(phase: Phase) -> f64 {
    let last = Phase::all().len() - 1;
    (phase.index() as f64 / last as f64) * 100.0
}

// ---------------------------------------------------------------------------
// Completion check
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionCheck {
    pub valid: bool,
    pub missing: Vec<String>,
}

/// Set-difference check of `content` keys against the phase checklist.
/// A field present but set to JSON `null` counts as missing.
pub fn validate_completion(phase: Phase, content: &Map<String, Value>) -> CompletionCheck {
    let missing: Vec<String> = required_fields(phase)
        .iter()
        .filter(|f| !content.get(**f).map(|v| !v.is_null()).unwrap_or(false))
        .map(|f| f.to_string())
        .collect();
    CompletionCheck {
        valid: missing.is_empty(),
        missing,
    }
}

// ---------------------------------------------------------------------------
// Sequence validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceCheck {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Flag duplicate phase ids and ids outside the fixed set. Contiguity is
/// not required — a partial prefix of the canonical order is valid.
pub fn validate_sequence(ids: &[String]) -> SequenceCheck {
    let mut errors = Vec::new();
    let mut seen: Vec<Phase> = Vec::new();

    for id in ids {
        match Phase::from_str(id) {
            Ok(p) => {
                if seen.contains(&p) {
                    errors.push(format!("duplicate phase: {id}"));
                } else {
                    seen.push(p);
                }
            }
            Err(_) => errors.push(format!("unknown phase: {id}")),
        }
    }

    SequenceCheck {
        valid: errors.is_empty(),
        errors,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn content(keys: &[&str]) -> Map<String, Value> {
        keys.iter()
            .map(|k| (k.to_string(), json!("filled")))
            .collect()
    }

    #[test]
    fn self_and_successor_transitions_allowed() {
        assert!(can_transition(Phase::Discovery, Phase::Discovery));
        assert!(can_transition(Phase::Discovery, Phase::Requirements));
        assert!(can_transition(Phase::Architecture, Phase::Implementation));
    }

    #[test]
    fn skips_and_reversals_rejected() {
        assert!(!can_transition(Phase::Discovery, Phase::Planning));
        assert!(!can_transition(Phase::Requirements, Phase::Discovery));
        assert!(!can_transition(Phase::Implementation, Phase::Discovery));
    }

    #[test]
    fn terminal_phase_has_no_successor() {
        assert!(!can_transition(Phase::Implementation, Phase::Planning));
        assert!(can_transition(Phase::Implementation, Phase::Implementation));
    }

    #[test]
    fn dependencies_are_strict_predecessors() {
        assert!(dependencies(Phase::Discovery).is_empty());
        assert_eq!(
            dependencies(Phase::Planning),
            vec![Phase::Discovery, Phase::Requirements]
        );
        assert_eq!(dependencies(Phase::Implementation).len(), 5);
    }

    #[test]
    fn progress_spans_zero_to_hundred() {
        assert_eq!(progress(Phase::Discovery), 0.0);
        assert_eq!(progress(Phase::Implementation), 100.0);
        assert!(progress(Phase::Planning) > progress(Phase::Requirements));
    }

    #[test]
    fn completion_reports_missing_fields() {
        let check = validate_completion(Phase::Discovery, &content(&["problem_statement"]));
        assert!(!check.valid);
        assert!(check.missing.contains(&"stakeholders".to_string()));
        assert!(check.missing.contains(&"context".to_string()));
    }

    #[test]
    fn completion_passes_with_all_fields() {
        let check = validate_completion(
            Phase::Discovery,
            &content(&["problem_statement", "stakeholders", "context"]),
        );
        assert!(check.valid);
        assert!(check.missing.is_empty());
    }

    #[test]
    fn null_field_counts_as_missing() {
        let mut c = content(&["problem_statement", "stakeholders"]);
        c.insert("context".to_string(), Value::Null);
        let check = validate_completion(Phase::Discovery, &c);
        assert_eq!(check.missing, vec!["context".to_string()]);
    }

    #[test]
    fn sequence_accepts_partial_prefix() {
        let ids: Vec<String> = ["discovery", "requirements"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let check = validate_sequence(&ids);
        assert!(check.valid);
    }

    #[test]
    fn sequence_flags_duplicates_and_unknowns() {
        let ids: Vec<String> = ["discovery", "discovery", "qa"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let check = validate_sequence(&ids);
        assert!(!check.valid);
        assert_eq!(check.errors.len(), 2);
        assert!(check.errors[0].contains("duplicate"));
        assert!(check.errors[1].contains("unknown"));
    }
}

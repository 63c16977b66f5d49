//! Pivot evaluation: advisory only, never force-applied.

use crate::session::Session;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotConfig {
    /// Coverage below this floor makes a pivot worth considering.
    #[serde(default = "default_coverage_floor")]
    pub coverage_floor: f64,
    /// Combined risk/complexity signal (0–1) at or above this bound
    /// triggers the recommendation.
    #[serde(default = "default_risk_bound")]
    pub risk_bound: f64,
}

fn default_coverage_floor() -> f64 {
    60.0
}

fn default_risk_bound() -> f64 {
    0.6
}

impl Default for PivotConfig {
    fn default() -> Self {
        Self {
            coverage_floor: default_coverage_floor(),
            risk_bound: default_risk_bound(),
        }
    }
}

// ---------------------------------------------------------------------------
// Recommendation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PivotAlternative {
    pub direction: String,
    pub rationale: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PivotRecommendation {
    pub recommended: bool,
    pub rationale: String,
    /// 0–1 combined risk/complexity signal behind the call.
    pub signal: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<PivotAlternative>,
}

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

fn risk_signal(session: &Session) -> f64 {
    match session
        .context
        .get("risk_level")
        .and_then(|v| v.as_str())
        .unwrap_or("medium")
    {
        "low" => 0.2,
        "high" => 1.0,
        _ => 0.5,
    }
}

fn complexity_signal(session: &Session) -> f64 {
    let mandatory = session.constraints.iter().filter(|c| c.mandatory).count();
    let unresolved = session
        .coverage
        .assumptions
        .values()
        .filter(|pct| **pct < 100.0)
        .count();
    // Five of either saturates the signal.
    (((mandatory + unresolved) as f64) / 5.0).min(1.0)
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Recommend a pivot only when coverage is below the floor AND the
/// risk/complexity signal exceeds the bound. The session is never mutated.
pub fn evaluate(session: &Session, cfg: &PivotConfig) -> PivotRecommendation {
    let risk = risk_signal(session);
    let complexity = complexity_signal(session);
    let signal = risk.max(complexity);
    let coverage = session.coverage.overall;

    if coverage >= cfg.coverage_floor || signal < cfg.risk_bound {
        return PivotRecommendation {
            recommended: false,
            rationale: format!(
                "coverage {coverage:.1} (floor {:.1}) with risk/complexity signal {signal:.2} (bound {:.2}) — stay the course",
                cfg.coverage_floor, cfg.risk_bound
            ),
            signal,
            alternatives: Vec::new(),
        };
    }

    // Rank alternatives by which signal is doing the damage.
    let mut alternatives = vec![
        PivotAlternative {
            direction: "narrow-scope".to_string(),
            rationale: "cut the constraint surface to what the current coverage can carry".to_string(),
        },
        PivotAlternative {
            direction: "prototype-spike".to_string(),
            rationale: "retire the riskiest unknown with a timeboxed spike before re-planning".to_string(),
        },
        PivotAlternative {
            direction: "constraint-renegotiation".to_string(),
            rationale: "revisit skipped or deferred mandatory constraints with their owners".to_string(),
        },
    ];
    if risk > complexity {
        alternatives.swap(0, 1);
    }

    PivotRecommendation {
        recommended: true,
        rationale: format!(
            "coverage {coverage:.1} is below the floor {:.1} while risk/complexity sits at {signal:.2} — the current approach is unlikely to converge",
            cfg.coverage_floor
        ),
        signal,
        alternatives,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::ConstraintRule;
    use crate::session::SessionConfig;
    use crate::types::ConstraintCategory;
    use serde_json::{json, Map};

    fn session(risk: &str, mandatory: usize) -> Session {
        let constraints = (0..mandatory)
            .map(|i| {
                ConstraintRule::new(format!("c{i}"), format!("C{i}"), ConstraintCategory::Technical)
                    .mandatory()
            })
            .collect();
        let mut context = Map::new();
        context.insert("risk_level".to_string(), json!(risk));
        Session::new("pivot-test", context, constraints, SessionConfig::default())
    }

    #[test]
    fn low_coverage_high_risk_recommends_pivot() {
        let s = session("high", 4);
        assert!(s.coverage.overall < 60.0);
        let rec = evaluate(&s, &PivotConfig::default());
        assert!(rec.recommended);
        assert!(rec.alternatives.len() >= 2);
        assert!(!rec.rationale.is_empty());
    }

    #[test]
    fn low_risk_never_pivots_even_with_low_coverage() {
        let s = session("low", 0);
        assert!(s.coverage.overall < 60.0);
        let rec = evaluate(&s, &PivotConfig::default());
        assert!(!rec.recommended);
        assert!(rec.alternatives.is_empty());
    }

    #[test]
    fn good_coverage_never_pivots() {
        let mut s = session("high", 1);
        s.coverage.overall = 85.0;
        let rec = evaluate(&s, &PivotConfig::default());
        assert!(!rec.recommended);
    }

    #[test]
    fn risk_driven_pivot_leads_with_the_spike() {
        let s = session("high", 0);
        let rec = evaluate(&s, &PivotConfig::default());
        assert!(rec.recommended);
        assert_eq!(rec.alternatives[0].direction, "prototype-spike");
    }

    #[test]
    fn complexity_driven_pivot_leads_with_descoping() {
        let s = session("medium", 5);
        let rec = evaluate(&s, &PivotConfig::default());
        assert!(rec.recommended);
        assert_eq!(rec.alternatives[0].direction, "narrow-scope");
    }

    #[test]
    fn evaluation_does_not_mutate_the_session() {
        let s = session("high", 3);
        let before = serde_yaml::to_string(&s).unwrap();
        let _ = evaluate(&s, &PivotConfig::default());
        assert_eq!(serde_yaml::to_string(&s).unwrap(), before);
    }
}

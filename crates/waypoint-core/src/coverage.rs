//! Multi-dimensional coverage scoring.
//!
//! `overall` is always a weighted combination of the per-dimension values
//! and is recomputed on every session mutation — it is never stored stale.

use crate::error::{Result, WaypointError};
use crate::phase;
use crate::session::{PhaseRecord, Session};
use crate::types::{Phase, PhaseStatus};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// CoverageWeights
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageWeights {
    #[serde(default = "default_constraints_weight")]
    pub constraints: f64,
    #[serde(default = "default_phases_weight")]
    pub phases: f64,
    #[serde(default = "default_documentation_weight")]
    pub documentation: f64,
    #[serde(default = "default_assumptions_weight")]
    pub assumptions: f64,
}

fn default_constraints_weight() -> f64 {
    0.4
}

fn default_phases_weight() -> f64 {
    0.3
}

fn default_documentation_weight() -> f64 {
    0.15
}

fn default_assumptions_weight() -> f64 {
    0.15
}

impl Default for CoverageWeights {
    fn default() -> Self {
        Self {
            constraints: default_constraints_weight(),
            phases: default_phases_weight(),
            documentation: default_documentation_weight(),
            assumptions: default_assumptions_weight(),
        }
    }
}

impl CoverageWeights {
    pub fn sum(&self) -> f64 {
        self.constraints + self.phases + self.documentation + self.assumptions
    }
}

// ---------------------------------------------------------------------------
// CoverageReport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageReport {
    /// 0–100, weighted combination of the dimension aggregates.
    pub overall: f64,
    /// Per-phase completion percentage.
    pub phases: BTreeMap<Phase, f64>,
    /// Per-constraint-id decision percentage.
    pub constraints: BTreeMap<String, f64>,
    /// Per-assumption resolution (100 resolved, 0 open), keyed by text.
    pub assumptions: BTreeMap<String, f64>,
    /// Per-entered-phase documentation presence.
    pub documentation: BTreeMap<Phase, f64>,
    /// Supplied externally (CI, test harness). Never derived here.
    #[serde(default)]
    pub test_coverage: f64,
}

impl CoverageReport {
    pub fn empty() -> Self {
        Self {
            overall: 0.0,
            phases: BTreeMap::new(),
            constraints: BTreeMap::new(),
            assumptions: BTreeMap::new(),
            documentation: BTreeMap::new(),
            test_coverage: 0.0,
        }
    }
}

fn clamp_pct(v: f64) -> f64 {
    v.clamp(0.0, 100.0)
}

// ---------------------------------------------------------------------------
// Dimension computations
// ---------------------------------------------------------------------------

/// Completion percentage for one phase record.
///
/// Complete phases score 100 regardless of context drift afterwards —
/// the gate was passed. Active phases score their required-field fill
/// ratio; pending phases score 0.
pub fn phase_completion(p: Phase, rec: &PhaseRecord, context: &Map<String, Value>) -> f64 {
    match rec.status {
        PhaseStatus::Complete => 100.0,
        PhaseStatus::Pending => 0.0,
        PhaseStatus::Active => {
            let required = phase::required_fields(p);
            if required.is_empty() {
                return 100.0;
            }
            let check = phase::validate_completion(p, context);
            let filled = required.len() - check.missing.len();
            (filled as f64 / required.len() as f64) * 100.0
        }
    }
}

fn assumption_entries(context: &Map<String, Value>) -> Option<Vec<(String, bool)>> {
    let items = context.get("assumptions")?.as_array()?;
    let entries = items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            // Bare string: an assumption stated but not tracked → open.
            Value::String(s) => (s.clone(), false),
            Value::Object(o) => {
                let text = o
                    .get("text")
                    .and_then(|t| t.as_str())
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| format!("assumption-{i}"));
                let resolved = o.get("resolved").and_then(|r| r.as_bool()).unwrap_or(false);
                (text, resolved)
            }
            _ => (format!("assumption-{i}"), false),
        })
        .collect();
    Some(entries)
}

// ---------------------------------------------------------------------------
// compute_coverage
// ---------------------------------------------------------------------------

pub fn compute_coverage(session: &Session, weights: &CoverageWeights) -> CoverageReport {
    // Phases: mean completion across the whole sequence.
    let phases: BTreeMap<Phase, f64> = session
        .phases
        .iter()
        .map(|(&p, rec)| (p, phase_completion(p, rec, &session.context)))
        .collect();
    let phase_agg = if phases.is_empty() {
        0.0
    } else {
        phases.values().sum::<f64>() / phases.len() as f64
    };

    // Constraints: per-rule decision contribution, aggregated by weight.
    // No constraints declared → nothing owed.
    let mut constraints = BTreeMap::new();
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for rule in &session.constraints {
        let pct = session
            .decisions
            .get(&rule.id)
            .map(|d| clamp_pct(d.coverage_contribution))
            .unwrap_or(0.0);
        constraints.insert(rule.id.clone(), pct);
        weighted_sum += pct * rule.weight;
        weight_total += rule.weight;
    }
    let constraint_agg = if weight_total == 0.0 {
        100.0
    } else {
        weighted_sum / weight_total
    };

    // Assumptions: resolved fraction. An absent array claims nothing and
    // owes nothing.
    let (assumptions, assumption_agg) = match assumption_entries(&session.context) {
        None => (BTreeMap::new(), 100.0),
        Some(entries) if entries.is_empty() => (BTreeMap::new(), 100.0),
        Some(entries) => {
            let resolved = entries.iter().filter(|(_, r)| *r).count();
            let agg = (resolved as f64 / entries.len() as f64) * 100.0;
            let map = entries
                .into_iter()
                .map(|(text, r)| (text, if r { 100.0 } else { 0.0 }))
                .collect();
            (map, agg)
        }
    };

    // Documentation: entered phases carrying at least one artifact ref.
    let documentation: BTreeMap<Phase, f64> = session
        .phases
        .iter()
        .filter(|(_, rec)| rec.entered())
        .map(|(&p, rec)| (p, if rec.artifacts.is_empty() { 0.0 } else { 100.0 }))
        .collect();
    let doc_agg = if documentation.is_empty() {
        0.0
    } else {
        documentation.values().sum::<f64>() / documentation.len() as f64
    };

    let overall = clamp_pct(
        constraint_agg * weights.constraints
            + phase_agg * weights.phases
            + doc_agg * weights.documentation
            + assumption_agg * weights.assumptions,
    );

    CoverageReport {
        overall,
        phases,
        constraints,
        assumptions,
        documentation,
        test_coverage: session.coverage.test_coverage,
    }
}

// ---------------------------------------------------------------------------
// enforce_threshold
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageGap {
    pub dimension: String,
    /// Percentage points short of the threshold for this dimension.
    pub shortfall: f64,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdCheck {
    pub passed: bool,
    pub threshold: f64,
    pub overall: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gaps: Vec<CoverageGap>,
}

pub fn enforce_threshold(session: &Session, threshold: f64) -> Result<ThresholdCheck> {
    if !(0.0..=100.0).contains(&threshold) || threshold.is_nan() {
        return Err(WaypointError::ValidationFailed(format!(
            "coverage threshold must be within 0..=100, got {threshold}"
        )));
    }

    let report = &session.coverage;
    if report.overall >= threshold {
        return Ok(ThresholdCheck {
            passed: true,
            threshold,
            overall: report.overall,
            gaps: Vec::new(),
        });
    }

    let mut gaps = Vec::new();

    for rule in &session.constraints {
        if !session.decisions.contains_key(&rule.id) {
            gaps.push(CoverageGap {
                dimension: "constraints".to_string(),
                shortfall: threshold - report.constraints.get(&rule.id).copied().unwrap_or(0.0),
                detail: format!("constraint {} not yet decided", rule.id),
            });
        }
    }

    let current = session.current_phase;
    let check = phase::validate_completion(current, &session.context);
    for field in &check.missing {
        gaps.push(CoverageGap {
            dimension: "phases".to_string(),
            shortfall: threshold - report.phases.get(&current).copied().unwrap_or(0.0),
            detail: format!("phase {current} missing field {field}"),
        });
    }

    for (text, pct) in &report.assumptions {
        if *pct < 100.0 {
            gaps.push(CoverageGap {
                dimension: "assumptions".to_string(),
                shortfall: threshold - pct,
                detail: format!("assumption unresolved: {text}"),
            });
        }
    }

    for (p, pct) in &report.documentation {
        if *pct < 100.0 {
            gaps.push(CoverageGap {
                dimension: "documentation".to_string(),
                shortfall: threshold - pct,
                detail: format!("phase {p} has no recorded artifacts"),
            });
        }
    }

    // Shortfall always reportable even if no dimension produced a line.
    if gaps.is_empty() {
        gaps.push(CoverageGap {
            dimension: "overall".to_string(),
            shortfall: threshold - report.overall,
            detail: format!(
                "overall coverage {:.1} below threshold {threshold:.1}",
                report.overall
            ),
        });
    }

    Ok(ThresholdCheck {
        passed: false,
        threshold,
        overall: report.overall,
        gaps,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

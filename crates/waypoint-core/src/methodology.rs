//! Methodology selection from categorical project signals.
//!
//! Follows the same shape as the action classifier: a fixed,
//! priority-ordered candidate table scored against an input context,
//! with an explicit fallback when nothing matches well enough.

use crate::types::Phase;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    Greenfield,
    Legacy,
    Migration,
    Research,
    Product,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemFraming {
    WellDefined,
    Exploratory,
    Wicked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelinePressure {
    Relaxed,
    Normal,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakeholderMode {
    Single,
    Aligned,
    Divergent,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signals {
    pub project_type: ProjectType,
    pub problem_framing: ProblemFraming,
    pub risk_level: RiskLevel,
    pub timeline_pressure: TimelinePressure,
    pub stakeholder_mode: StakeholderMode,
}

// ---------------------------------------------------------------------------
// Methodology
// ---------------------------------------------------------------------------

/// Declaration order is the tie-break priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Methodology {
    DesignSprint,
    DoubleDiamond,
    LeanInception,
    ArchitectureFirst,
    PhaseGate,
}

impl Methodology {
    pub fn all() -> &'static [Methodology] {
        &[
            Methodology::DesignSprint,
            Methodology::DoubleDiamond,
            Methodology::LeanInception,
            Methodology::ArchitectureFirst,
            Methodology::PhaseGate,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Methodology::DesignSprint => "design-sprint",
            Methodology::DoubleDiamond => "double-diamond",
            Methodology::LeanInception => "lean-inception",
            Methodology::ArchitectureFirst => "architecture-first",
            Methodology::PhaseGate => "phase-gate",
        }
    }

    fn priority(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Methodology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Point tables
// ---------------------------------------------------------------------------

/// Signal→point mapping for one candidate. The tables are fixed in code;
/// only the selection floor is configurable.
fn points(m: Methodology, s: &Signals) -> u32 {
    use Methodology::*;
    let mut pts = 0;
    match m {
        DesignSprint => {
            if s.problem_framing == ProblemFraming::Exploratory {
                pts += 3;
            }
            if s.timeline_pressure == TimelinePressure::Urgent {
                pts += 4;
            }
            if s.stakeholder_mode == StakeholderMode::Divergent {
                pts += 2;
            }
            if s.project_type == ProjectType::Greenfield {
                pts += 2;
            }
        }
        DoubleDiamond => {
            if s.problem_framing == ProblemFraming::Exploratory {
                pts += 4;
            }
            if s.problem_framing == ProblemFraming::Wicked {
                pts += 3;
            }
            if s.project_type == ProjectType::Research {
                pts += 3;
            }
            if s.timeline_pressure == TimelinePressure::Relaxed {
                pts += 2;
            }
            if s.stakeholder_mode == StakeholderMode::Divergent {
                pts += 2;
            }
        }
        LeanInception => {
            if s.project_type == ProjectType::Product {
                pts += 4;
            }
            if s.project_type == ProjectType::Greenfield {
                pts += 3;
            }
            if s.problem_framing == ProblemFraming::WellDefined {
                pts += 2;
            }
            if s.stakeholder_mode == StakeholderMode::Aligned {
                pts += 2;
            }
            if s.timeline_pressure == TimelinePressure::Urgent {
                pts += 1;
            }
        }
        ArchitectureFirst => {
            if s.project_type == ProjectType::Migration {
                pts += 4;
            }
            if s.project_type == ProjectType::Legacy {
                pts += 3;
            }
            if s.risk_level == RiskLevel::High {
                pts += 4;
            }
            if s.problem_framing == ProblemFraming::WellDefined {
                pts += 2;
            }
        }
        PhaseGate => {
            if s.risk_level == RiskLevel::High {
                pts += 2;
            }
            if s.problem_framing == ProblemFraming::WellDefined {
                pts += 2;
            }
            if s.stakeholder_mode == StakeholderMode::Aligned {
                pts += 1;
            }
        }
    }
    pts
}

fn max_points(m: Methodology) -> u32 {
    use Methodology::*;
    match m {
        DesignSprint => 11,
        DoubleDiamond => 11,
        LeanInception => 9,
        ArchitectureFirst => 10,
        PhaseGate => 5,
    }
}

/// Minimum winning score. Below it the fallback methodology is returned
/// with a reduced confidence band.
pub const SELECTION_FLOOR: u32 = 4;

const FALLBACK_CONFIDENCE: f64 = 35.0;

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredMethodology {
    pub methodology: Methodology,
    pub points: u32,
    /// 0–100.
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodologySelection {
    pub primary: ScoredMethodology,
    /// Ranked runners-up — always at least two, so callers can display
    /// trade-offs.
    pub alternatives: Vec<ScoredMethodology>,
    /// True when no candidate reached the selection floor and the
    /// phase-gate fallback was substituted. Never silent.
    pub fallback: bool,
}

fn confidence_for(m: Methodology, pts: u32) -> f64 {
    ((pts as f64 / max_points(m) as f64) * 100.0).clamp(0.0, 100.0)
}

pub fn select(signals: &Signals) -> MethodologySelection {
    let mut scored: Vec<ScoredMethodology> = Methodology::all()
        .iter()
        .map(|&m| ScoredMethodology {
            methodology: m,
            points: points(m, signals),
            confidence: confidence_for(m, points(m, signals)),
        })
        .collect();

    // Highest points first; declaration order breaks ties.
    scored.sort_by(|a, b| {
        b.points
            .cmp(&a.points)
            .then(a.methodology.priority().cmp(&b.methodology.priority()))
    });

    let winner = scored[0].clone();
    if winner.points < SELECTION_FLOOR {
        // Nothing matched well enough: phase-gate with a low band, and
        // the actual top scorers surface as alternatives.
        let alternatives: Vec<ScoredMethodology> = scored
            .into_iter()
            .filter(|s| s.methodology != Methodology::PhaseGate)
            .take(3)
            .collect();
        return MethodologySelection {
            primary: ScoredMethodology {
                methodology: Methodology::PhaseGate,
                points: 0,
                confidence: FALLBACK_CONFIDENCE,
            },
            alternatives,
            fallback: true,
        };
    }

    let alternatives: Vec<ScoredMethodology> = scored[1..].to_vec();
    MethodologySelection {
        primary: winner,
        alternatives,
        fallback: false,
    }
}

// ---------------------------------------------------------------------------
// Profile generation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseMapping {
    pub phase: Phase,
    pub focus: String,
}

/// Produced, never stored — recomputed each time signals are supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodologyProfile {
    pub name: String,
    pub phases: Vec<PhaseMapping>,
    pub milestones: Vec<String>,
    pub confidence: f64,
    pub success_metrics: Vec<String>,
    pub prompts: Vec<String>,
}

fn phase_focus(m: Methodology, p: Phase) -> &'static str {
    use Methodology::*;
    match (m, p) {
        (DesignSprint, Phase::Discovery) => "map the problem and pick a target in a day",
        (DesignSprint, Phase::Requirements) => "sketch competing solutions",
        (DesignSprint, Phase::Planning) => "storyboard the prototype",
        (DesignSprint, Phase::Specification) => "decide and specify the prototype",
        (DesignSprint, Phase::Architecture) => "prototype architecture, throwaway allowed",
        (DesignSprint, Phase::Implementation) => "build and user-test the prototype",

        (DoubleDiamond, Phase::Discovery) => "diverge: explore the problem space broadly",
        (DoubleDiamond, Phase::Requirements) => "converge: define the problem worth solving",
        (DoubleDiamond, Phase::Planning) => "diverge: develop candidate solutions",
        (DoubleDiamond, Phase::Specification) => "converge: specify the chosen solution",
        (DoubleDiamond, Phase::Architecture) => "shape delivery architecture",
        (DoubleDiamond, Phase::Implementation) => "deliver and validate",

        (LeanInception, Phase::Discovery) => "product vision and personas",
        (LeanInception, Phase::Requirements) => "feature brainstorm and MVP cut",
        (LeanInception, Phase::Planning) => "sequence the MVP canvas",
        (LeanInception, Phase::Specification) => "write thin-slice specifications",
        (LeanInception, Phase::Architecture) => "minimum viable architecture",
        (LeanInception, Phase::Implementation) => "ship the MVP increment",

        (ArchitectureFirst, Phase::Discovery) => "inventory existing systems and constraints",
        (ArchitectureFirst, Phase::Requirements) => "quality-attribute requirements first",
        (ArchitectureFirst, Phase::Planning) => "plan around architectural risk",
        (ArchitectureFirst, Phase::Specification) => "interface contracts before behavior",
        (ArchitectureFirst, Phase::Architecture) => "evaluate architecture against scenarios",
        (ArchitectureFirst, Phase::Implementation) => "implement along architectural seams",

        (PhaseGate, Phase::Discovery) => "establish scope and stakeholders",
        (PhaseGate, Phase::Requirements) => "baseline the requirements",
        (PhaseGate, Phase::Planning) => "gate review: plan and risks",
        (PhaseGate, Phase::Specification) => "gate review: complete specification",
        (PhaseGate, Phase::Architecture) => "gate review: architecture sign-off",
        (PhaseGate, Phase::Implementation) => "controlled build-out",
    }
}

fn base_milestones(m: Methodology) -> Vec<String> {
    let names: &[&str] = match m {
        Methodology::DesignSprint => &["sprint map agreed", "prototype decided", "user test done"],
        Methodology::DoubleDiamond => &[
            "problem definition signed off",
            "solution direction chosen",
            "delivery validated",
        ],
        Methodology::LeanInception => &["MVP cut agreed", "thin slice specified", "MVP shipped"],
        Methodology::ArchitectureFirst => &[
            "constraint inventory complete",
            "architecture evaluated",
            "seam-by-seam delivery started",
        ],
        Methodology::PhaseGate => &["gate 1: plan", "gate 2: specification", "gate 3: architecture"],
    };
    names.iter().map(|s| s.to_string()).collect()
}

pub fn generate_profile(selected: &ScoredMethodology, signals: &Signals) -> MethodologyProfile {
    let m = selected.methodology;
    let phases = Phase::all()
        .iter()
        .map(|&p| PhaseMapping {
            phase: p,
            focus: phase_focus(m, p).to_string(),
        })
        .collect();

    let mut milestones = base_milestones(m);
    let mut success_metrics = vec![
        "all mandatory constraints decided before architecture".to_string(),
        "coverage threshold met at every phase gate".to_string(),
    ];
    let mut prompts = vec![
        format!("What outcome makes the {m} effort a success?"),
        "Which constraint, if skipped, would sink the design?".to_string(),
    ];

    if signals.risk_level == RiskLevel::High {
        milestones.push("risk register reviewed".to_string());
        success_metrics.push("no critical risk left unowned".to_string());
        prompts.push("Which risk would you pay to retire first?".to_string());
    }
    if signals.stakeholder_mode == StakeholderMode::Divergent {
        prompts.push("Where do stakeholders actually disagree, in one sentence each?".to_string());
    }
    if signals.timeline_pressure == TimelinePressure::Urgent {
        success_metrics.push("scope cut list exists before planning ends".to_string());
    }

    MethodologyProfile {
        name: m.as_str().to_string(),
        phases,
        milestones,
        confidence: selected.confidence,
        success_metrics,
        prompts,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

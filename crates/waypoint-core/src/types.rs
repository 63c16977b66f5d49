use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Discovery,
    Requirements,
    Planning,
    Specification,
    Architecture,
    Implementation,
}

impl Phase {
    pub fn all() -> &'static [Phase] {
        &[
            Phase::Discovery,
            Phase::Requirements,
            Phase::Planning,
            Phase::Specification,
            Phase::Architecture,
            Phase::Implementation,
        ]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Option<Phase> {
        let all = Phase::all();
        let i = self.index();
        all.get(i + 1).copied()
    }

    pub fn previous(self) -> Option<Phase> {
        let i = self.index();
        if i == 0 {
            return None;
        }
        Phase::all().get(i - 1).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Discovery => "discovery",
            Phase::Requirements => "requirements",
            Phase::Planning => "planning",
            Phase::Specification => "specification",
            Phase::Architecture => "architecture",
            Phase::Implementation => "implementation",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Phase {
    type Err = crate::error::WaypointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discovery" => Ok(Phase::Discovery),
            "requirements" => Ok(Phase::Requirements),
            "planning" => Ok(Phase::Planning),
            "specification" => Ok(Phase::Specification),
            "architecture" => Ok(Phase::Architecture),
            "implementation" => Ok(Phase::Implementation),
            _ => Err(crate::error::WaypointError::InvalidPhase(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// PhaseStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Pending,
    Active,
    Complete,
}

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Paused,
    Completed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Active => "active",
            SessionStatus::Paused => "paused",
            SessionStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ConstraintCategory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintCategory {
    Technical,
    Business,
    Regulatory,
    Security,
    Operational,
}

impl fmt::Display for ConstraintCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConstraintCategory::Technical => "technical",
            ConstraintCategory::Business => "business",
            ConstraintCategory::Regulatory => "regulatory",
            ConstraintCategory::Security => "security",
            ConstraintCategory::Operational => "operational",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ConstraintAction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintAction {
    Applied,
    Skipped,
    Deferred,
}

impl ConstraintAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ConstraintAction::Applied => "applied",
            ConstraintAction::Skipped => "skipped",
            ConstraintAction::Deferred => "deferred",
        }
    }
}

impl fmt::Display for ConstraintAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConstraintAction {
    type Err = crate::error::WaypointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "applied" => Ok(ConstraintAction::Applied),
            "skipped" => Ok(ConstraintAction::Skipped),
            "deferred" => Ok(ConstraintAction::Deferred),
            _ => Err(crate::error::WaypointError::ValidationFailed(format!(
                "unknown constraint action: {s}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Roadmap projection: phases and coverage state rendered as a timeline,
//! a graph notation, or a machine-readable tree.
//!
//! Dependency extraction is a text heuristic, best-effort by design.
//! Missing a marker phrase is acceptable; the phrase list lives in config,
//! not in code, so deployments can tune it.

use crate::phase;
use crate::session::Session;
use crate::types::{Phase, PhaseStatus};
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadmapFormat {
    #[default]
    Timeline,
    Graph,
    Tree,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    #[default]
    Summary,
    /// Include the per-phase required-field checklist as milestone tasks.
    Detailed,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoadmapOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<String>,
    #[serde(default)]
    pub format: RoadmapFormat,
    #[serde(default)]
    pub granularity: Granularity,
    #[serde(default)]
    pub include_dependencies: bool,
    #[serde(default)]
    pub include_resources: bool,
}

// ---------------------------------------------------------------------------
// Marker config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerRule {
    /// Synthetic dependency node id, e.g. `external-services`.
    pub node: String,
    /// Case-insensitive phrases whose presence triggers the node.
    pub phrases: Vec<String>,
}

pub fn default_markers() -> Vec<MarkerRule> {
    vec![
        MarkerRule {
            node: "external-services".to_string(),
            phrases: [
                "third-party",
                "third party",
                "integration",
                "external api",
                "payment provider",
                "webhook",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        },
        MarkerRule {
            node: "database".to_string(),
            phrases: ["database", "persistence", "durable", "storage"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapConfig {
    /// Phase coverage below this floor marks the milestone at risk when a
    /// mandatory constraint is still open.
    #[serde(default = "default_risk_floor")]
    pub risk_floor: f64,
    #[serde(default = "default_markers")]
    pub markers: Vec<MarkerRule>,
}

fn default_risk_floor() -> f64 {
    50.0
}

impl Default for RoadmapConfig {
    fn default() -> Self {
        Self {
            risk_floor: default_risk_floor(),
            markers: default_markers(),
        }
    }
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadmapMilestone {
    pub phase: Phase,
    pub title: String,
    pub status: PhaseStatus,
    pub coverage: f64,
    pub at_risk: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<Phase>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyNode {
    pub id: String,
    /// Phrase that triggered the node, for traceability.
    pub triggered_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceHint {
    pub phase: Phase,
    pub hint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Roadmap {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<String>,
    pub format: RoadmapFormat,
    pub milestones: Vec<RoadmapMilestone>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<DependencyNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ResourceHint>,
    /// The caller-selected encoding of the plan.
    pub rendered: String,
}

// ---------------------------------------------------------------------------
// Dependency extraction
// ---------------------------------------------------------------------------

fn collect_text(value: &Value, out: &mut String) {
    match value {
        Value::String(s) => {
            out.push_str(s);
            out.push('\n');
        }
        Value::Array(items) => {
            for item in items {
                collect_text(item, out);
            }
        }
        Value::Object(map) => {
            for v in map.values() {
                collect_text(v, out);
            }
        }
        _ => {}
    }
}

/// Scan all requirement-bearing context text for marker phrases.
pub fn extract_dependencies(session: &Session, markers: &[MarkerRule]) -> Vec<DependencyNode> {
    let mut text = String::new();
    for value in session.context.values() {
        collect_text(value, &mut text);
    }

    let mut nodes = Vec::new();
    for rule in markers {
        for phrase in &rule.phrases {
            let Ok(re) = RegexBuilder::new(&regex::escape(phrase))
                .case_insensitive(true)
                .build()
            else {
                continue;
            };
            if re.is_match(&text) {
                if !nodes.iter().any(|n: &DependencyNode| n.id == rule.node) {
                    nodes.push(DependencyNode {
                        id: rule.node.clone(),
                        triggered_by: phrase.clone(),
                    });
                }
                break;
            }
        }
    }
    nodes
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render_timeline(roadmap: &Roadmap) -> String {
    let mut out = String::new();
    out.push_str(&format!("roadmap: {}\n", roadmap.session_id));
    if let Some(tf) = &roadmap.timeframe {
        out.push_str(&format!("timeframe: {tf}\n"));
    }
    for m in &roadmap.milestones {
        let marker = match m.status {
            PhaseStatus::Complete => "[x]",
            PhaseStatus::Active => "[>]",
            PhaseStatus::Pending => "[ ]",
        };
        let risk = if m.at_risk { "  !at-risk" } else { "" };
        out.push_str(&format!(
            "{marker} {} — {} ({:.0}%){risk}\n",
            m.phase, m.title, m.coverage
        ));
        for task in &m.tasks {
            out.push_str(&format!("      - {task}\n"));
        }
    }
    for d in &roadmap.dependencies {
        out.push_str(&format!("dep: {} (via \"{}\")\n", d.id, d.triggered_by));
    }
    for r in &roadmap.resources {
        out.push_str(&format!("resource: {} — {}\n", r.phase, r.hint));
    }
    out
}

fn render_graph(roadmap: &Roadmap) -> String {
    let mut out = String::from("flowchart LR\n");
    for m in &roadmap.milestones {
        let shape = if m.at_risk {
            format!("    {0}{{{{{0}}}}}\n", m.phase)
        } else {
            format!("    {0}[{0}]\n", m.phase)
        };
        out.push_str(&shape);
    }
    for pair in roadmap.milestones.windows(2) {
        out.push_str(&format!("    {} --> {}\n", pair[0].phase, pair[1].phase));
    }
    for d in &roadmap.dependencies {
        out.push_str(&format!("    {}([{}])\n", d.id, d.id));
        if let Some(first) = roadmap.milestones.first() {
            out.push_str(&format!("    {} -.-> {}\n", d.id, first.phase));
        }
    }
    out
}

fn render_tree(roadmap: &Roadmap) -> String {
    let value = json!({
        "session": roadmap.session_id,
        "timeframe": roadmap.timeframe,
        "milestones": roadmap.milestones,
        "dependencies": roadmap.dependencies,
        "resources": roadmap.resources,
    });
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

pub fn generate_roadmap(
    session: &Session,
    options: &RoadmapOptions,
    cfg: &RoadmapConfig,
) -> Roadmap {
    let has_open_mandatory = !session.undecided_mandatory().is_empty();

    let milestones: Vec<RoadmapMilestone> = Phase::all()
        .iter()
        .filter_map(|&p| {
            let rec = session.phases.get(&p)?;
            if !rec.entered() {
                return None;
            }
            let at_risk = rec.coverage < cfg.risk_floor && has_open_mandatory;
            let risk_reason = at_risk.then(|| {
                format!(
                    "coverage {:.0}% below floor {:.0}% with mandatory constraints open",
                    rec.coverage, cfg.risk_floor
                )
            });
            let tasks = match options.granularity {
                Granularity::Summary => Vec::new(),
                Granularity::Detailed => phase::required_fields(p)
                    .iter()
                    .map(|f| f.to_string())
                    .collect(),
            };
            Some(RoadmapMilestone {
                phase: p,
                title: format!("{} complete", p),
                status: rec.status,
                coverage: rec.coverage,
                at_risk,
                risk_reason,
                tasks,
                depends_on: phase::dependencies(p),
            })
        })
        .collect();

    let dependencies = if options.include_dependencies {
        extract_dependencies(session, &cfg.markers)
    } else {
        Vec::new()
    };

    let resources = if options.include_resources {
        milestones
            .iter()
            .filter(|m| m.status == PhaseStatus::Active)
            .map(|m| ResourceHint {
                phase: m.phase,
                hint: match m.phase {
                    Phase::Discovery | Phase::Requirements => {
                        "facilitator plus domain stakeholders".to_string()
                    }
                    Phase::Planning | Phase::Specification => {
                        "design lead plus reviewing engineers".to_string()
                    }
                    Phase::Architecture | Phase::Implementation => {
                        "architect plus implementation pairs".to_string()
                    }
                },
            })
            .collect()
    } else {
        Vec::new()
    };

    let mut roadmap = Roadmap {
        session_id: session.id.clone(),
        timeframe: options.timeframe.clone(),
        format: options.format,
        milestones,
        dependencies,
        resources,
        rendered: String::new(),
    };
    roadmap.rendered = match options.format {
        RoadmapFormat::Timeline => render_timeline(&roadmap),
        RoadmapFormat::Graph => render_graph(&roadmap),
        RoadmapFormat::Tree => render_tree(&roadmap),
    };
    roadmap
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

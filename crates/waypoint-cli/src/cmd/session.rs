use crate::output::{print_json, print_table};
use crate::workspace::Workspace;
use anyhow::Context;
use clap::Subcommand;
use serde_json::{Map, Value};
use std::path::Path;
use std::str::FromStr;
use waypoint_core::constraint::ConstraintRule;
use waypoint_core::session::SessionConfig;
use waypoint_core::types::{ConstraintAction, Phase, SessionStatus};

#[derive(Subcommand)]
pub enum SessionSubcommand {
    /// Create a new design session at the discovery phase
    Create {
        id: String,
        /// Initial context as a JSON object
        #[arg(long, value_name = "JSON")]
        context: Option<String>,
        /// YAML file with the session's constraint rules
        #[arg(long, value_name = "PATH")]
        constraints: Option<String>,
        /// Coverage threshold for this session (default from config)
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// List all sessions
    List,
    /// Show one session in full
    Info { id: String },
    /// Advance a session to the next phase
    Advance {
        id: String,
        /// Target phase (discovery..implementation)
        phase: String,
        /// Human-readable reason recorded in history
        #[arg(long)]
        description: Option<String>,
    },
    /// Merge a JSON object into the session context (existing keys survive)
    Merge {
        id: String,
        #[arg(long, value_name = "JSON")]
        context: String,
    },
    /// Record a constraint decision (applied | skipped | deferred)
    Decide {
        id: String,
        constraint_id: String,
        action: String,
        #[arg(long)]
        reason: String,
    },
    /// Pause a session
    Pause { id: String },
    /// Resume a paused session
    Resume { id: String },
    /// Mark a session completed
    Complete { id: String },
    /// Delete a session (no-op if it does not exist)
    Delete { id: String },
}

pub fn run(root: &Path, subcmd: SessionSubcommand, json: bool) -> anyhow::Result<()> {
    let ws = Workspace::open(root)?;
    match subcmd {
        SessionSubcommand::Create {
            id,
            context,
            constraints,
            threshold,
        } => create(&ws, &id, context.as_deref(), constraints.as_deref(), threshold, json),
        SessionSubcommand::List => list(&ws, json),
        SessionSubcommand::Info { id } => info(&ws, &id, json),
        SessionSubcommand::Advance {
            id,
            phase,
            description,
        } => advance(&ws, &id, &phase, description, json),
        SessionSubcommand::Merge { id, context } => merge(&ws, &id, &context, json),
        SessionSubcommand::Decide {
            id,
            constraint_id,
            action,
            reason,
        } => decide(&ws, &id, &constraint_id, &action, &reason, json),
        SessionSubcommand::Pause { id } => set_status(&ws, &id, SessionStatus::Paused, json),
        SessionSubcommand::Resume { id } => set_status(&ws, &id, SessionStatus::Active, json),
        SessionSubcommand::Complete { id } => set_status(&ws, &id, SessionStatus::Completed, json),
        SessionSubcommand::Delete { id } => delete(&ws, &id, json),
    }
}

fn parse_context(raw: Option<&str>) -> anyhow::Result<Map<String, Value>> {
    let Some(raw) = raw else {
        return Ok(Map::new());
    };
    let value: Value = serde_json::from_str(raw).context("context must be valid JSON")?;
    match value {
        Value::Object(map) => Ok(map),
        _ => anyhow::bail!("context must be a JSON object"),
    }
}

fn load_constraints(path: Option<&str>) -> anyhow::Result<Vec<ConstraintRule>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read constraints file {path}"))?;
    let rules: Vec<ConstraintRule> =
        serde_yaml::from_str(&data).context("constraints file must be a YAML list of rules")?;
    Ok(rules)
}

fn create(
    ws: &Workspace,
    id: &str,
    context: Option<&str>,
    constraints: Option<&str>,
    threshold: Option<f64>,
    json: bool,
) -> anyhow::Result<()> {
    let context = parse_context(context)?;
    let rules = load_constraints(constraints)?;
    let config = SessionConfig {
        coverage_threshold: threshold.unwrap_or(ws.config.coverage.default_threshold),
    };
    let session = ws.store.create(id, context, rules, Some(config))?;
    ws.save_session(&session)?;

    if json {
        print_json(&session)?;
    } else {
        println!(
            "created session '{}' at phase {} ({} constraints)",
            session.id,
            session.current_phase,
            session.constraints.len()
        );
    }
    Ok(())
}

fn list(ws: &Workspace, json: bool) -> anyhow::Result<()> {
    let sessions = ws.store.list();
    if json {
        return print_json(&sessions);
    }
    let rows = sessions
        .iter()
        .map(|s| {
            vec![
                s.id.clone(),
                s.current_phase.to_string(),
                s.status.to_string(),
                format!("{:.1}", s.coverage.overall),
                s.history.len().to_string(),
            ]
        })
        .collect();
    print_table(&["ID", "PHASE", "STATUS", "COVERAGE", "TRANSITIONS"], rows);
    Ok(())
}

fn info(ws: &Workspace, id: &str, json: bool) -> anyhow::Result<()> {
    let session = ws.store.get(id)?;
    if json {
        return print_json(&session);
    }
    println!("session:  {}", session.id);
    println!("phase:    {}", session.current_phase);
    println!("status:   {}", session.status);
    println!("coverage: {:.1}", session.coverage.overall);
    println!("threshold: {:.1}", session.config.coverage_threshold);
    if !session.constraints.is_empty() {
        println!("constraints:");
        for c in &session.constraints {
            let decided = session
                .decision(&c.id)
                .map(|d| d.action.to_string())
                .unwrap_or_else(|| "undecided".to_string());
            let flag = if c.mandatory { " (mandatory)" } else { "" };
            println!("  {} [{}]{} — {}", c.id, c.category, flag, decided);
        }
    }
    if !session.history.is_empty() {
        println!("history:");
        for t in &session.history {
            println!("  {} -> {}: {}", t.from, t.to, t.description);
        }
    }
    Ok(())
}

fn advance(
    ws: &Workspace,
    id: &str,
    phase: &str,
    description: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let target = Phase::from_str(phase)?;
    let session = ws.store.advance_phase(id, target, description)?;
    ws.save_session(&session)?;
    if json {
        print_json(&session)?;
    } else {
        println!(
            "session '{}' now at phase {} (coverage {:.1})",
            session.id, session.current_phase, session.coverage.overall
        );
    }
    Ok(())
}

fn merge(ws: &Workspace, id: &str, context: &str, json: bool) -> anyhow::Result<()> {
    let patch = parse_context(Some(context))?;
    let session = ws.store.merge_context(id, patch)?;
    ws.save_session(&session)?;
    if json {
        print_json(&session)?;
    } else {
        println!(
            "merged context into '{}' ({} keys, coverage {:.1})",
            session.id,
            session.context.len(),
            session.coverage.overall
        );
    }
    Ok(())
}

fn decide(
    ws: &Workspace,
    id: &str,
    constraint_id: &str,
    action: &str,
    reason: &str,
    json: bool,
) -> anyhow::Result<()> {
    let action = ConstraintAction::from_str(action)?;
    let decision = ws
        .store
        .record_decision(id, constraint_id, action, reason, &ws.ledger)?;
    let session = ws.store.get(id)?;
    ws.save_session(&session)?;
    ws.save_ledger()?;
    if json {
        print_json(&decision)?;
    } else {
        println!(
            "recorded {} for constraint '{}' on session '{}'",
            decision.action, constraint_id, id
        );
    }
    Ok(())
}

fn set_status(ws: &Workspace, id: &str, status: SessionStatus, json: bool) -> anyhow::Result<()> {
    let session = ws.store.set_status(id, status)?;
    ws.save_session(&session)?;
    if json {
        print_json(&session)?;
    } else {
        println!("session '{}' is now {}", session.id, session.status);
    }
    Ok(())
}

fn delete(ws: &Workspace, id: &str, json: bool) -> anyhow::Result<()> {
    let removed = ws.store.delete(id);
    let removed_file = ws.delete_session(id)?;
    let removed = removed || removed_file;
    if json {
        print_json(&serde_json::json!({ "id": id, "deleted": removed }))?;
    } else if removed {
        println!("deleted session '{id}'");
    } else {
        println!("session '{id}' did not exist");
    }
    Ok(())
}

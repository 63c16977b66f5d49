use crate::output::print_json;
use crate::workspace::Workspace;
use clap::Subcommand;
use std::path::Path;
use waypoint_core::consistency::{self, ConsistencyStore};

#[derive(Subcommand)]
pub enum ConsistencySubcommand {
    /// Audit a session against the cross-session decision history
    Enforce { id: String },
    /// Generate remediation prompts for a session's violations
    Prompts { id: String },
    /// Render the ADR and remediation roadmap for a session
    Docs { id: String },
    /// Show how a constraint has been decided across all sessions
    Patterns { constraint_id: String },
    /// Reset the process-wide decision ledger
    Clear,
}

pub fn run(root: &Path, subcmd: ConsistencySubcommand, json: bool) -> anyhow::Result<()> {
    let ws = Workspace::open(root)?;
    match subcmd {
        ConsistencySubcommand::Enforce { id } => enforce(&ws, &id, json),
        ConsistencySubcommand::Prompts { id } => prompts(&ws, &id, json),
        ConsistencySubcommand::Docs { id } => docs(&ws, &id),
        ConsistencySubcommand::Patterns { constraint_id } => patterns(&ws, &constraint_id, json),
        ConsistencySubcommand::Clear => clear(&ws),
    }
}

fn enforce(ws: &Workspace, id: &str, json: bool) -> anyhow::Result<()> {
    let session = ws.store.get(id)?;
    let report = consistency::enforce_consistency(&session, &ws.ledger, &ws.config.consistency)?;
    if json {
        return print_json(&report);
    }
    println!(
        "session '{}': alignment {:.1}/100, {} violation(s)",
        report.session_id,
        report.alignment_score,
        report.violations.len()
    );
    for v in &report.violations {
        let constraint = v
            .constraint_id
            .as_deref()
            .map(|c| format!(" [{c}]"))
            .unwrap_or_default();
        println!("  {} ({}){}: {}", v.kind.as_str(), v.severity, constraint, v.message);
    }
    Ok(())
}

fn prompts(ws: &Workspace, id: &str, json: bool) -> anyhow::Result<()> {
    let session = ws.store.get(id)?;
    let report = consistency::enforce_consistency(&session, &ws.ledger, &ws.config.consistency)?;
    let prompts = consistency::generate_enforcement_prompts(&session, &report);
    if json {
        return print_json(&prompts);
    }
    if prompts.is_empty() {
        println!("no remediation needed for '{id}'");
    }
    for p in &prompts {
        println!("[{}] {}", p.severity, p.text);
    }
    Ok(())
}

fn docs(ws: &Workspace, id: &str) -> anyhow::Result<()> {
    let session = ws.store.get(id)?;
    let report = consistency::enforce_consistency(&session, &ws.ledger, &ws.config.consistency)?;
    let docs = consistency::generate_constraint_documentation(&session, &report);
    println!("{}", docs.adr);
    println!("---");
    println!("{}", docs.roadmap);
    Ok(())
}

fn patterns(ws: &Workspace, constraint_id: &str, json: bool) -> anyhow::Result<()> {
    let pattern = consistency::usage_patterns(&ws.ledger, constraint_id);
    if json {
        return print_json(&pattern);
    }
    println!(
        "constraint '{}': {} decision(s) across {} session(s)",
        pattern.constraint_id,
        pattern.total,
        pattern.sessions.len()
    );
    println!(
        "  applied {}  skipped {}  deferred {}",
        pattern.applied, pattern.skipped, pattern.deferred
    );
    match pattern.majority {
        Some(action) => println!("  majority: {action}"),
        None => println!("  majority: none (tie or no history)"),
    }
    Ok(())
}

fn clear(ws: &Workspace) -> anyhow::Result<()> {
    ws.ledger.clear();
    ws.save_ledger()?;
    println!("cleared the consistency ledger");
    Ok(())
}

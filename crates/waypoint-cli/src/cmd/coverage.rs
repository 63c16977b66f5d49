use crate::output::{print_json, print_table};
use crate::workspace::Workspace;
use clap::Subcommand;
use std::path::Path;
use waypoint_core::coverage;

#[derive(Subcommand)]
pub enum CoverageSubcommand {
    /// Recompute and show the coverage report for a session
    Compute { id: String },
    /// Check overall coverage against a threshold and list gaps
    Enforce {
        id: String,
        /// Threshold 0..=100 (default: the session's configured threshold)
        #[arg(long)]
        threshold: Option<f64>,
    },
}

pub fn run(root: &Path, subcmd: CoverageSubcommand, json: bool) -> anyhow::Result<()> {
    let ws = Workspace::open(root)?;
    match subcmd {
        CoverageSubcommand::Compute { id } => compute(&ws, &id, json),
        CoverageSubcommand::Enforce { id, threshold } => enforce(&ws, &id, threshold, json),
    }
}

fn compute(ws: &Workspace, id: &str, json: bool) -> anyhow::Result<()> {
    let session = ws.store.recompute_coverage(id)?;
    ws.save_session(&session)?;
    let report = &session.coverage;
    if json {
        return print_json(report);
    }
    println!("overall: {:.1}", report.overall);
    let rows = report
        .phases
        .iter()
        .map(|(p, pct)| vec![p.to_string(), format!("{pct:.1}")])
        .collect();
    print_table(&["PHASE", "COVERAGE"], rows);
    if !report.constraints.is_empty() {
        let rows = report
            .constraints
            .iter()
            .map(|(c, pct)| vec![c.clone(), format!("{pct:.1}")])
            .collect();
        print_table(&["CONSTRAINT", "COVERAGE"], rows);
    }
    Ok(())
}

fn enforce(ws: &Workspace, id: &str, threshold: Option<f64>, json: bool) -> anyhow::Result<()> {
    let session = ws.store.get(id)?;
    let threshold = threshold.unwrap_or(session.config.coverage_threshold);
    let check = coverage::enforce_threshold(&session, threshold)?;
    if json {
        return print_json(&check);
    }
    if check.passed {
        println!(
            "passed: overall {:.1} meets threshold {:.1}",
            check.overall, check.threshold
        );
    } else {
        println!(
            "failed: overall {:.1} below threshold {:.1}",
            check.overall, check.threshold
        );
        for gap in &check.gaps {
            println!("  [{}] {}", gap.dimension, gap.detail);
        }
    }
    Ok(())
}

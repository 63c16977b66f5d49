use crate::output::print_json;
use anyhow::Context;
use clap::{Args, Subcommand};
use waypoint_core::methodology::{self, Signals};

#[derive(Args)]
pub struct SignalArgs {
    /// greenfield | legacy | migration | research | product
    #[arg(long)]
    pub project_type: String,
    /// well_defined | exploratory | wicked
    #[arg(long)]
    pub problem_framing: String,
    /// low | medium | high
    #[arg(long)]
    pub risk_level: String,
    /// relaxed | normal | urgent
    #[arg(long)]
    pub timeline_pressure: String,
    /// single | aligned | divergent
    #[arg(long)]
    pub stakeholder_mode: String,
}

impl SignalArgs {
    fn parse(&self) -> anyhow::Result<Signals> {
        // The signal enums deserialize from their snake_case names, so a
        // bare YAML scalar is the cheapest parser.
        fn field<T: serde::de::DeserializeOwned>(name: &str, raw: &str) -> anyhow::Result<T> {
            serde_yaml::from_str(raw).with_context(|| format!("invalid {name}: {raw}"))
        }
        Ok(Signals {
            project_type: field("project type", &self.project_type)?,
            problem_framing: field("problem framing", &self.problem_framing)?,
            risk_level: field("risk level", &self.risk_level)?,
            timeline_pressure: field("timeline pressure", &self.timeline_pressure)?,
            stakeholder_mode: field("stakeholder mode", &self.stakeholder_mode)?,
        })
    }
}

#[derive(Subcommand)]
pub enum MethodologySubcommand {
    /// Rank methodologies for the given project signals
    Select {
        #[command(flatten)]
        signals: SignalArgs,
    },
    /// Expand the winning methodology into a full profile
    Profile {
        #[command(flatten)]
        signals: SignalArgs,
    },
}

pub fn run(subcmd: MethodologySubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        MethodologySubcommand::Select { signals } => select(&signals, json),
        MethodologySubcommand::Profile { signals } => profile(&signals, json),
    }
}

fn select(args: &SignalArgs, json: bool) -> anyhow::Result<()> {
    let selection = methodology::select(&args.parse()?);
    if json {
        return print_json(&selection);
    }
    let marker = if selection.fallback { " (fallback)" } else { "" };
    println!(
        "primary: {}{} — confidence {:.0}",
        selection.primary.methodology, marker, selection.primary.confidence
    );
    for alt in &selection.alternatives {
        println!(
            "  alternative: {} — {} points, confidence {:.0}",
            alt.methodology, alt.points, alt.confidence
        );
    }
    Ok(())
}

fn profile(args: &SignalArgs, json: bool) -> anyhow::Result<()> {
    let signals = args.parse()?;
    let selection = methodology::select(&signals);
    let profile = methodology::generate_profile(&selection.primary, &signals);
    if json {
        return print_json(&profile);
    }
    println!("methodology: {} (confidence {:.0})", profile.name, profile.confidence);
    println!("phases:");
    for pm in &profile.phases {
        println!("  {} — {}", pm.phase, pm.focus);
    }
    println!("milestones:");
    for m in &profile.milestones {
        println!("  - {m}");
    }
    println!("success metrics:");
    for m in &profile.success_metrics {
        println!("  - {m}");
    }
    println!("prompts:");
    for p in &profile.prompts {
        println!("  - {p}");
    }
    Ok(())
}

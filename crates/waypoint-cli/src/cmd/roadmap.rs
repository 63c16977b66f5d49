use crate::output::print_json;
use crate::workspace::Workspace;
use anyhow::Context;
use clap::Args;
use std::path::Path;
use waypoint_core::roadmap::{self, Granularity, RoadmapFormat, RoadmapOptions};

#[derive(Args)]
pub struct RoadmapArgs {
    pub id: String,
    /// timeline | graph | tree
    #[arg(long, default_value = "timeline")]
    pub format: String,
    /// summary | detailed
    #[arg(long, default_value = "summary")]
    pub granularity: String,
    /// Free-form timeframe label embedded in the output (e.g. "Q3")
    #[arg(long)]
    pub timeframe: Option<String>,
    /// Extract dependency nodes from requirement text
    #[arg(long)]
    pub dependencies: bool,
    /// Include resource hints for active phases
    #[arg(long)]
    pub resources: bool,
}

pub fn run(root: &Path, args: RoadmapArgs, json: bool) -> anyhow::Result<()> {
    let ws = Workspace::open(root)?;
    let session = ws.store.get(&args.id)?;

    let format: RoadmapFormat = serde_yaml::from_str(&args.format)
        .with_context(|| format!("invalid format: {}", args.format))?;
    let granularity: Granularity = serde_yaml::from_str(&args.granularity)
        .with_context(|| format!("invalid granularity: {}", args.granularity))?;

    let options = RoadmapOptions {
        timeframe: args.timeframe,
        format,
        granularity,
        include_dependencies: args.dependencies,
        include_resources: args.resources,
    };
    let roadmap = roadmap::generate_roadmap(&session, &options, &ws.config.roadmap);
    if json {
        return print_json(&roadmap);
    }
    print!("{}", roadmap.rendered);
    Ok(())
}

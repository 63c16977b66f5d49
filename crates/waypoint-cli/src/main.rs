mod cmd;
mod output;
mod root;
mod workspace;

use clap::{Parser, Subcommand};
use cmd::{
    config::ConfigSubcommand, consistency::ConsistencySubcommand, coverage::CoverageSubcommand,
    methodology::MethodologySubcommand, roadmap::RoadmapArgs, session::SessionSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "waypoint",
    about = "Design workflow guidance — phases, coverage, and cross-session consistency",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .waypoint/ or .git/)
    #[arg(long, global = true, env = "WAYPOINT_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize waypoint in the current project
    Init,

    /// Manage design sessions
    Session {
        #[command(subcommand)]
        subcommand: SessionSubcommand,
    },

    /// Coverage scoring and threshold checks
    Coverage {
        #[command(subcommand)]
        subcommand: CoverageSubcommand,
    },

    /// Select a methodology from project signals
    Methodology {
        #[command(subcommand)]
        subcommand: MethodologySubcommand,
    },

    /// Cross-session consistency auditing
    Consistency {
        #[command(subcommand)]
        subcommand: ConsistencySubcommand,
    },

    /// Evaluate whether a session should pivot
    Pivot { id: String },

    /// Project a session into a roadmap
    Roadmap {
        #[command(flatten)]
        args: RoadmapArgs,
    },

    /// Validate or show the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let root_path = cli.root.as_deref();
    let root = root::resolve_root(root_path);

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Session { subcommand } => cmd::session::run(&root, subcommand, cli.json),
        Commands::Coverage { subcommand } => cmd::coverage::run(&root, subcommand, cli.json),
        Commands::Methodology { subcommand } => cmd::methodology::run(subcommand, cli.json),
        Commands::Consistency { subcommand } => cmd::consistency::run(&root, subcommand, cli.json),
        Commands::Pivot { id } => cmd::pivot::run(&root, &id, cli.json),
        Commands::Roadmap { args } => cmd::roadmap::run(&root, args, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

use crate::output::print_json;
use clap::Subcommand;
use std::path::Path;
use waypoint_core::config::{EngineConfig, WarnLevel};
use waypoint_core::paths;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Validate .waypoint/config.yaml and report problems
    Validate,
    /// Print the effective configuration
    Show,
}

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    let config = EngineConfig::load(&paths::config_path(root))?;
    match subcmd {
        ConfigSubcommand::Validate => validate(&config, json),
        ConfigSubcommand::Show => {
            if json {
                print_json(&config)
            } else {
                println!("{}", serde_yaml::to_string(&config)?);
                Ok(())
            }
        }
    }
}

fn validate(config: &EngineConfig, json: bool) -> anyhow::Result<()> {
    let warnings = config.validate();
    if json {
        return print_json(&warnings);
    }
    if warnings.is_empty() {
        println!("configuration ok");
        return Ok(());
    }
    for w in &warnings {
        let level = match w.level {
            WarnLevel::Error => "error",
            WarnLevel::Warning => "warning",
        };
        println!("{level}: {}", w.message);
    }
    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("configuration has errors");
    }
    Ok(())
}

use std::path::Path;
use waypoint_core::config::EngineConfig;
use waypoint_core::{io, paths};

/// Create the `.waypoint/` tree with a default config and empty ledger.
/// Idempotent: existing files are left alone.
pub fn run(root: &Path) -> anyhow::Result<()> {
    io::ensure_dir(&root.join(paths::WAYPOINT_DIR))?;
    io::ensure_dir(&paths::sessions_dir(root))?;

    let config_path = paths::config_path(root);
    if !config_path.exists() {
        EngineConfig::default().save(&config_path)?;
    }
    io::write_if_missing(&paths::ledger_path(root), b"{}\n")?;

    println!("initialized waypoint in {}", root.display());
    Ok(())
}

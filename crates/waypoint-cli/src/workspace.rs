use anyhow::{bail, Context};
use std::path::{Path, PathBuf};
use waypoint_core::config::EngineConfig;
use waypoint_core::consistency::MemoryLedger;
use waypoint_core::session::Session;
use waypoint_core::store::SessionStore;
use waypoint_core::{paths, snapshot};

/// Everything a command needs: config, the session store hydrated from
/// disk, and the decision ledger. The engine stays in-memory; the CLI
/// owns when snapshots hit disk.
pub struct Workspace {
    root: PathBuf,
    pub config: EngineConfig,
    pub store: SessionStore,
    pub ledger: MemoryLedger,
}

impl Workspace {
    pub fn open(root: &Path) -> anyhow::Result<Self> {
        if !root.join(paths::WAYPOINT_DIR).is_dir() {
            bail!("not initialized: run 'waypoint init'");
        }
        let config = EngineConfig::load(&paths::config_path(root))
            .context("failed to load .waypoint/config.yaml")?;
        let store = snapshot::load_store(root, config.coverage.weights.clone())
            .context("failed to load sessions")?;
        let ledger = snapshot::load_ledger(root).context("failed to load ledger")?;
        Ok(Self {
            root: root.to_path_buf(),
            config,
            store,
            ledger,
        })
    }

    pub fn save_session(&self, session: &Session) -> anyhow::Result<()> {
        snapshot::save_session(&self.root, session)?;
        Ok(())
    }

    pub fn delete_session(&self, id: &str) -> anyhow::Result<bool> {
        Ok(snapshot::delete_session(&self.root, id)?)
    }

    pub fn save_ledger(&self) -> anyhow::Result<()> {
        snapshot::save_ledger(&self.root, &self.ledger)?;
        Ok(())
    }
}

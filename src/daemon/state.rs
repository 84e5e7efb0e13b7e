use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// The state of a single managed program, per the state machine in §4.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgramState {
    Stopped,
    Starting,
    Running,
    Stopping,
    Restarting,
    Installing,
    Error,
    Broken,
}

impl ProgramState {
    /// Whether a `pid` should be present while in this state.
    pub fn has_pid(self) -> bool {
        matches!(
            self,
            ProgramState::Running | ProgramState::Stopping | ProgramState::Restarting
        )
    }
}

const CPU_SAMPLE_CAPACITY: usize = 60;

/// The live, in-memory state of a single managed program. One of these
/// exists for every declared [`Program`](crate::daemon::program::Program),
/// for its entire lifetime.
#[derive(Debug, Clone)]
pub struct ProcessInfo {
    pub state: ProgramState,
    pub pid: Option<u32>,
    pub started_at: Option<u64>,
    pub consecutive_failures: u32,
    pub last_failure_at: Option<u64>,
    pub cpu_samples: VecDeque<f32>,
    pub last_exit_reason: Option<String>,
}

impl Default for ProcessInfo {
    fn default() -> Self {
        ProcessInfo {
            state: ProgramState::Stopped,
            pid: None,
            started_at: None,
            consecutive_failures: 0,
            last_failure_at: None,
            cpu_samples: VecDeque::with_capacity(CPU_SAMPLE_CAPACITY),
            last_exit_reason: None,
        }
    }
}

impl ProcessInfo {
    pub fn push_cpu_sample(&mut self, sample: f32) {
        if self.cpu_samples.len() == CPU_SAMPLE_CAPACITY {
            self.cpu_samples.pop_front();
        }
        self.cpu_samples.push_back(sample);
    }

    pub fn latest_cpu_sample(&self) -> Option<f32> {
        self.cpu_samples.back().copied()
    }

    pub fn uptime_seconds(&self, now: u64) -> Option<u64> {
        if self.state == ProgramState::Running {
            self.started_at.map(|start| now.saturating_sub(start))
        } else {
            None
        }
    }
}

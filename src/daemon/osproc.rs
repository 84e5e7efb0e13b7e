use parking_lot::Mutex;
use sysinfo::{PidExt, ProcessExt, System, SystemExt};

/// Thin wrapper around a shared [`sysinfo::System`] used for the two OS
/// observation points the spec requires: "is this pid alive" and "when was
/// it created". Both the CPU Sampler and the Persistence Store's reattach
/// protocol need this; sharing one `System` avoids re-scanning `/proc` twice
/// per tick.
pub struct OsProcessTable {
    system: Mutex<System>,
}

impl OsProcessTable {
    pub fn new() -> Self {
        OsProcessTable {
            system: Mutex::new(System::new()),
        }
    }

    /// Refreshes the process table. Should be called once per monitor tick
    /// before any `is_alive`/`start_time`/`cpu_percent` calls for that tick.
    pub fn refresh(&self) {
        self.system.lock().refresh_processes();
    }

    pub fn is_alive(&self, pid: u32) -> bool {
        self.system.lock().process(sysinfo::Pid::from_u32(pid)).is_some()
    }

    /// Returns the process's creation time as a unix epoch timestamp, if the
    /// process is currently visible.
    pub fn start_time(&self, pid: u32) -> Option<u64> {
        self.system
            .lock()
            .process(sysinfo::Pid::from_u32(pid))
            .map(|p| p.start_time())
    }

    /// Returns instantaneous CPU usage percent (0-100 * num_cpus) for `pid`,
    /// if it is alive. `sysinfo` computes this relative to the previous
    /// refresh, so callers should refresh on a steady cadence (the monitor
    /// tick) rather than on demand.
    pub fn cpu_percent(&self, pid: u32) -> Option<f32> {
        self.system
            .lock()
            .process(sysinfo::Pid::from_u32(pid))
            .map(|p| p.cpu_usage())
    }
}

impl Default for OsProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

/// The maximum allowed skew, in seconds, between a persisted `started_at`
/// and the OS-reported process creation time when verifying a reattach
/// candidate. The OS clock and our own `epoch_now()` are not guaranteed to
/// agree to the second, so some tolerance is required (§4.7).
pub const REATTACH_SKEW_TOLERANCE_SECS: u64 = 5;

/// Checks whether a persisted `(pid, started_at)` pair plausibly refers to
/// the same process we originally spawned, rather than an unrelated process
/// that has since reused the pid.
pub fn verify_reattach(table: &OsProcessTable, pid: u32, started_at: u64) -> bool {
    match table.start_time(pid) {
        Some(creation) => {
            let diff = if creation > started_at {
                creation - started_at
            } else {
                started_at - creation
            };
            diff <= REATTACH_SKEW_TOLERANCE_SECS
        }
        None => false,
    }
}

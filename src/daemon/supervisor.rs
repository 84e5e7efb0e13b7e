use crate::config::Settings;
use crate::daemon::cpu::CpuSampler;
use crate::daemon::logs::LogManager;
use crate::daemon::osproc::{verify_reattach, OsProcessTable};
use crate::daemon::persistence::{PersistedEntry, PersistenceStore};
use crate::daemon::program::Program;
use crate::daemon::registry::Registry;
use crate::daemon::spawner::Spawner;
use crate::daemon::state::{ProcessInfo, ProgramState};
use crate::daemon::time::epoch_now;
use crate::error::{Result, SupervisorError};
use crate::process::Process;
use log::{info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Everything the Supervisor Engine tracks for a single program, guarded by
/// one mutex per program (§4.2's concurrency contract: all state
/// transitions for a given program are serialised).
struct ProgramRuntime {
    info: ProcessInfo,
    child: Option<Process>,
}

impl Default for ProgramRuntime {
    fn default() -> Self {
        ProgramRuntime {
            info: ProcessInfo::default(),
            child: None,
        }
    }
}

/// A consistent point-in-time view of a single program's status, safe to
/// hand to the HTTP layer without holding any lock.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub name: String,
    pub state: ProgramState,
    pub pid: Option<u32>,
    pub started_at: Option<u64>,
    pub uptime_seconds: Option<u64>,
    pub consecutive_failures: u32,
    /// The bounded CPU% ring (§3, §4.5), oldest sample first. Empty when the
    /// CPU-inspection capability is unavailable or no sample has been taken
    /// yet -- never fabricated zeroes.
    pub cpu_samples: Vec<f32>,
}

/// The Supervisor Engine (§4.2): owns the live [`ProcessInfo`]/child handle
/// for every declared program and drives the state machine described there.
pub struct Supervisor {
    registry: Arc<Registry>,
    settings: Settings,
    base_dir: std::path::PathBuf,
    runtimes: parking_lot::RwLock<HashMap<String, Arc<Mutex<ProgramRuntime>>>>,
    log_manager: LogManager,
    persistence: PersistenceStore,
    os_table: OsProcessTable,
    /// A weak handle to the enclosing `Arc<Supervisor>`, used only to
    /// schedule the delayed restart of a crashed program from a background
    /// thread without the supervisor needing to outlive itself.
    self_weak: std::sync::Weak<Supervisor>,
}

impl Supervisor {
    pub fn new_arc(
        registry: Arc<Registry>,
        settings: Settings,
        base_dir: std::path::PathBuf,
        log_manager: LogManager,
        persistence: PersistenceStore,
    ) -> Arc<Self> {
        let mut runtimes = HashMap::new();
        for program in registry.list() {
            runtimes.insert(program.name.clone(), Arc::new(Mutex::new(ProgramRuntime::default())));
        }
        Arc::new_cyclic(|weak| Supervisor {
            registry,
            settings,
            base_dir,
            runtimes: parking_lot::RwLock::new(runtimes),
            log_manager,
            persistence,
            os_table: OsProcessTable::new(),
            self_weak: weak.clone(),
        })
    }

    fn runtime_for(&self, name: &str) -> Result<Arc<Mutex<ProgramRuntime>>> {
        self.runtimes
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| SupervisorError::NotFound(name.to_string()))
    }

    /// Registers a freshly-added program with a blank runtime entry. Called
    /// by the Control Interface right after [`Registry::add`] succeeds.
    pub fn register(&self, name: &str) {
        self.runtimes
            .write()
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(ProgramRuntime::default())));
    }

    pub fn deregister(&self, name: &str) {
        self.runtimes.write().remove(name);
    }

    /// Reattach protocol, run once at startup (§4.7).
    pub fn reattach(&self) {
        self.os_table.refresh();
        let snapshot = self.persistence.load();
        for (name, entry) in snapshot {
            if !self.registry.contains(&name) {
                continue;
            }
            self.register(&name);
            let runtime = match self.runtime_for(&name) {
                Ok(r) => r,
                Err(_) => continue,
            };
            let mut runtime = runtime.lock();
            if verify_reattach(&self.os_table, entry.pid, entry.started_at) {
                info!(
                    "Reattached to program '{}' (pid {}, started at {})",
                    name, entry.pid, entry.started_at
                );
                runtime.info.state = ProgramState::Running;
                runtime.info.pid = Some(entry.pid);
                runtime.info.started_at = Some(entry.started_at);
            } else {
                warn!(
                    "Discarding stale reattach candidate for '{}' (pid {})",
                    name, entry.pid
                );
                runtime.info.state = ProgramState::Stopped;
            }
        }

        // Auto-start anything enabled that didn't reattach.
        for program in self.registry.list() {
            if !program.enabled {
                continue;
            }
            let runtime = match self.runtime_for(&program.name) {
                Ok(r) => r,
                Err(_) => continue,
            };
            let should_start = runtime.lock().info.state == ProgramState::Stopped;
            if should_start {
                if let Err(e) = self.start(&program.name) {
                    warn!("Failed to auto-start '{}': {}", program.name, e);
                }
            }
        }
    }

    /// Starts `name`. Valid from `stopped`, `error`, `restarting` and,
    /// manually, `broken` (which resets the failure counter).
    pub fn start(&self, name: &str) -> Result<()> {
        let program = self.registry.get(name)?;
        let runtime = self.runtime_for(name)?;
        let mut runtime = runtime.lock();

        match runtime.info.state {
            ProgramState::Stopped | ProgramState::Error | ProgramState::Restarting => {}
            ProgramState::Broken => {
                runtime.info.consecutive_failures = 0;
            }
            other => {
                return Err(SupervisorError::Busy(
                    name.to_string(),
                    format!("cannot start while {:?}", other),
                ))
            }
        }

        runtime.info.state = ProgramState::Starting;
        let result = self.spawn_locked(&program, &mut runtime);
        match result {
            Ok(()) => {
                runtime.info.state = ProgramState::Running;
                runtime.info.started_at = Some(epoch_now());
                drop(runtime);
                self.persist_snapshot();
                Ok(())
            }
            Err(e) => {
                runtime.info.state = ProgramState::Error;
                let _ = self
                    .log_manager
                    .append_banner(&program.slug(), &format!("spawn failed: {}", e));
                Err(e)
            }
        }
    }

    fn spawn_locked(&self, program: &Program, runtime: &mut ProgramRuntime) -> Result<()> {
        let spawner = Spawner::new(&self.settings, &self.base_dir);
        let invocation = spawner.build(program)?;

        let log_file = self
            .log_manager
            .open_for_append(&program.slug())
            .map_err(|e| SupervisorError::SpawnFailed(program.name.clone(), e.to_string()))?;
        let stderr_file = log_file
            .try_clone()
            .map_err(|e| SupervisorError::SpawnFailed(program.name.clone(), e.to_string()))?;

        let child = Process::spawn(
            &invocation.command,
            &invocation.env,
            log_file,
            stderr_file,
            invocation.work_dir.as_deref(),
        )
        .map_err(|e| SupervisorError::SpawnFailed(program.name.clone(), e.to_string()))?;

        runtime.info.pid = Some(child.id());
        runtime.child = Some(child);
        info!("Started program '{}' (pid {})", program.name, runtime.info.pid.unwrap());
        Ok(())
    }

    /// Stops `name`. Idempotent: returns success immediately if already
    /// stopped (§4.2 Stop operation).
    pub fn stop(&self, name: &str) -> Result<()> {
        let runtime = self.runtime_for(name)?;
        let mut guard = runtime.lock();

        match guard.info.state {
            ProgramState::Stopped | ProgramState::Error | ProgramState::Broken => return Ok(()),
            _ => {}
        }

        guard.info.state = ProgramState::Stopping;
        match guard.child.as_mut() {
            Some(child) => {
                child.terminate();
                let deadline = std::time::Instant::now() + Duration::from_secs(10);
                loop {
                    match child.try_wait() {
                        Ok(Some(_)) => break,
                        Ok(None) => {
                            if std::time::Instant::now() >= deadline {
                                warn!("Program '{}' ignored graceful stop, killing", name);
                                child.kill();
                                let _ = child.try_wait();
                                break;
                            }
                            std::thread::sleep(Duration::from_millis(200));
                        }
                        Err(_) => break,
                    }
                }
            }
            // Reattached program: there is no owned `Child` handle (this
            // supervisor instance never spawned it), so it can't be waited
            // on -- signal its process group directly and poll the OS
            // process table for liveness instead.
            None => {
                if let Some(pid) = guard.info.pid {
                    self.stop_unowned(name, pid);
                }
            }
        }
        guard.child = None;
        guard.info.pid = None;
        guard.info.state = ProgramState::Stopped;
        drop(guard);
        self.persist_snapshot();
        info!("Stopped program '{}'", name);
        Ok(())
    }

    /// Graceful-then-forceful stop of a reattached child, which this
    /// supervisor instance never spawned and so holds no `Child` handle
    /// for. Signals `pid`'s own process group directly (every managed
    /// program is its own session/group leader, §5) and polls the OS
    /// process table rather than `waitpid`.
    fn stop_unowned(&self, name: &str, pid: u32) {
        signal_pgid(pid, nix::sys::signal::Signal::SIGTERM);
        let deadline = std::time::Instant::now() + Duration::from_secs(10);
        loop {
            self.os_table.refresh();
            if !self.os_table.is_alive(pid) {
                return;
            }
            if std::time::Instant::now() >= deadline {
                warn!(
                    "Program '{}' (reattached, pid {}) ignored graceful stop, killing",
                    name, pid
                );
                signal_pgid(pid, nix::sys::signal::Signal::SIGKILL);
                return;
            }
            std::thread::sleep(Duration::from_millis(200));
        }
    }

    /// Restart: stop then start, resetting the failure counter and any
    /// `broken` state.
    pub fn restart(&self, name: &str) -> Result<()> {
        self.stop(name)?;
        {
            let runtime = self.runtime_for(name)?;
            runtime.lock().info.consecutive_failures = 0;
        }
        self.start(name)
    }

    /// One monitor tick: polls every tracked program for liveness, samples
    /// CPU, rotates logs, and drives crash/backoff transitions (§4.2, §4.5).
    pub fn tick(&self) {
        self.os_table.refresh();
        let names: Vec<String> = self.runtimes.read().keys().cloned().collect();
        let sampler = CpuSampler::new(&self.os_table);

        for name in names {
            let program = match self.registry.get(&name) {
                Ok(p) => p,
                Err(_) => continue,
            };
            let runtime = match self.runtime_for(&name) {
                Ok(r) => r,
                Err(_) => continue,
            };
            let mut guard = runtime.lock();

            if guard.info.state == ProgramState::Running {
                if let Some(pid) = guard.info.pid {
                    if let Some(cpu) = sampler.sample(pid) {
                        guard.info.push_cpu_sample(cpu);
                    }
                }
            }

            let _ = self.log_manager.rotate_if_needed(&program.slug());

            if guard.info.state != ProgramState::Running {
                continue;
            }

            // Owned children (spawned by this supervisor instance) are
            // waited on directly; reattached children have no `Child`
            // handle (we are not their parent from the OS's point of view),
            // so liveness can only be observed through the OS process table
            // (§4.2 step 1, "non-blocking wait, or OS-specific 'is alive'
            // check").
            let died = match guard.child.as_mut() {
                Some(child) => child.try_wait().ok().flatten().map(|status| status.success()),
                None => match guard.info.pid {
                    Some(pid) if !self.os_table.is_alive(pid) => Some(false),
                    _ => None,
                },
            };

            if let Some(clean) = died {
                self.handle_exit(&program, &mut guard, clean);
            } else if let Some(started_at) = guard.info.started_at {
                let now = epoch_now();
                if now.saturating_sub(started_at) >= self.settings.restart.failure_reset_seconds {
                    guard.info.consecutive_failures = 0;
                }
            }
        }
    }

    /// Handles a detected death of `program`'s current run. `clean` is
    /// whether the exit should be treated as orderly (exit code 0 for an
    /// owned child; always `false` for a reattached child, since a process
    /// we no longer own can't be waited on for its real exit code -- see
    /// `tick`'s reattached-liveness branch).
    fn handle_exit(
        &self,
        program: &Program,
        guard: &mut parking_lot::MutexGuard<ProgramRuntime>,
        clean: bool,
    ) {
        let started_at = guard.info.started_at.unwrap_or_else(epoch_now);
        let ran_seconds = epoch_now().saturating_sub(started_at);
        guard.child = None;
        guard.info.pid = None;

        if !program.enabled {
            guard.info.state = ProgramState::Stopped;
            let _ = self
                .log_manager
                .append_banner(&program.slug(), "process exited, program is disabled");
            self.persist_snapshot();
            return;
        }

        let ran_long_enough = ran_seconds >= self.settings.restart.failure_reset_seconds;
        if clean && ran_long_enough {
            guard.info.state = ProgramState::Stopped;
            guard.info.consecutive_failures = 0;
            info!("Program '{}' exited cleanly", program.name);
            let _ = self
                .log_manager
                .append_banner(&program.slug(), "process exited cleanly");
            self.persist_snapshot();
            return;
        }

        // Either a non-zero exit, or a clean exit that happened too fast to
        // count as a stable run -- both count against the failure budget.
        guard.info.last_failure_at = Some(epoch_now());
        guard.info.consecutive_failures += 1;

        if guard.info.consecutive_failures >= self.settings.restart.max_consecutive_failures {
            guard.info.state = ProgramState::Broken;
            warn!(
                "Program '{}' reached {} consecutive failures, marking broken",
                program.name, guard.info.consecutive_failures
            );
            let _ = self.log_manager.append_banner(
                &program.slug(),
                "too many consecutive failures, auto-restart suspended",
            );
            self.persist_snapshot();
            return;
        }

        guard.info.state = ProgramState::Restarting;
        let _ = self.log_manager.append_banner(
            &program.slug(),
            &format!(
                "process exited (failure #{}), restarting shortly",
                guard.info.consecutive_failures
            ),
        );
        self.persist_snapshot();

        let name = program.name.clone();
        let delay = Duration::from_secs(self.settings.restart.delay_seconds);
        let supervisor = self.self_weak.clone();
        // Scheduled on a detached thread rather than blocking the monitor
        // tick for `delay_seconds`. If the supervisor has since been torn
        // down, `upgrade()` fails and the restart is simply dropped.
        std::thread::spawn(move || {
            std::thread::sleep(delay);
            if let Some(supervisor) = supervisor.upgrade() {
                if let Err(e) = supervisor.start(&name) {
                    warn!("Restart of '{}' failed: {}", name, e);
                }
            }
        });
    }

    pub fn status(&self, name: &str) -> Result<StatusSnapshot> {
        let runtime = self.runtime_for(name)?;
        let guard = runtime.lock();
        Ok(snapshot(name, &guard.info))
    }

    pub fn status_all(&self) -> Vec<StatusSnapshot> {
        self.registry
            .list()
            .iter()
            .filter_map(|p| self.status(&p.name).ok())
            .collect()
    }

    fn persist_snapshot(&self) {
        let mut entries = HashMap::new();
        for (name, runtime) in self.runtimes.read().iter() {
            let guard = runtime.lock();
            if guard.info.state.has_pid() {
                if let (Some(pid), Some(started_at)) = (guard.info.pid, guard.info.started_at) {
                    entries.insert(
                        name.clone(),
                        PersistedEntry {
                            name: name.clone(),
                            pid,
                            started_at,
                            state: guard.info.state,
                        },
                    );
                }
            }
        }
        if let Err(e) = self.persistence.save(&entries) {
            warn!("Failed to persist state snapshot: {}", e);
        }
    }

    /// Called from the signal handler on SIGTERM/SIGINT: persists state and
    /// returns without touching any child process, leaving them running
    /// for the next supervisor instance to reattach to.
    pub fn shutdown(&self) {
        self.persist_snapshot();
    }

    pub fn log_manager(&self) -> &LogManager {
        &self.log_manager
    }

    /// Marks `name` as `installing`. Fails with `Busy` unless the program
    /// is currently `stopped` or `error` (§4.6 step 2).
    pub fn begin_install(&self, name: &str) -> Result<()> {
        let runtime = self.runtime_for(name)?;
        let mut guard = runtime.lock();
        match guard.info.state {
            ProgramState::Stopped | ProgramState::Error => {
                guard.info.state = ProgramState::Installing;
                Ok(())
            }
            other => Err(SupervisorError::Busy(
                name.to_string(),
                format!("cannot install while {:?}", other),
            )),
        }
    }

    /// Ends an install started with [`begin_install`]: `stopped` on success,
    /// `error` on failure. The install worker never leaves the program in
    /// `installing` state.
    pub fn end_install(&self, name: &str, success: bool) -> Result<()> {
        let runtime = self.runtime_for(name)?;
        let mut guard = runtime.lock();
        guard.info.state = if success {
            ProgramState::Stopped
        } else {
            ProgramState::Error
        };
        Ok(())
    }
}

fn snapshot(name: &str, info: &ProcessInfo) -> StatusSnapshot {
    let now = epoch_now();
    StatusSnapshot {
        name: name.to_string(),
        state: info.state,
        pid: info.pid,
        started_at: info.started_at,
        uptime_seconds: info.uptime_seconds(now),
        consecutive_failures: info.consecutive_failures,
        cpu_samples: info.cpu_samples.iter().copied().collect(),
    }
}

/// Sends `sig` to `pid`'s own process group. Every program spawned by
/// [`Process::spawn`] calls `setsid`, so its pgid equals its pid; this lets
/// a reattached entry (no owned [`Process`]/`Child` handle) be signalled
/// the same way `Process::terminate`/`kill` signal an owned one.
fn signal_pgid(pid: u32, sig: nix::sys::signal::Signal) {
    use nix::unistd::Pid;
    let pgid = -(pid as i32);
    let _ = nix::sys::signal::kill(Pid::from_raw(pgid), sig);
}

use crate::daemon::installer::Installer;
use crate::daemon::program::{Program, ProgramPatch};
use crate::daemon::registry::Registry;
use crate::daemon::supervisor::{StatusSnapshot, Supervisor};
use crate::error::{Result, SupervisorError};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Bound on concurrently running installer jobs (§5).
const MAX_CONCURRENT_INSTALLS: usize = 4;

/// The Control Interface: a thin facade over the Registry and Supervisor
/// that the HTTP layer and, eventually, any other front-end calls. Mirrors
/// the "one small struct, not expected to be contended" shape of the
/// teacher's own deployment planner.
pub struct Core {
    registry: Arc<Registry>,
    supervisor: Arc<Supervisor>,
    installer: Arc<Installer>,
    install_permits: Arc<Semaphore>,
    runtime: tokio::runtime::Handle,
}

impl Core {
    pub fn new(
        registry: Arc<Registry>,
        supervisor: Arc<Supervisor>,
        installer: Arc<Installer>,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        Core {
            registry,
            supervisor,
            installer,
            install_permits: Arc::new(Semaphore::new(MAX_CONCURRENT_INSTALLS)),
            runtime,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    pub fn status_all(&self) -> Vec<StatusSnapshot> {
        self.supervisor.status_all()
    }

    pub fn status(&self, name: &str) -> Result<StatusSnapshot> {
        self.supervisor.status(name)
    }

    pub fn start(&self, name: &str) -> Result<()> {
        self.supervisor.start(name)
    }

    pub fn stop(&self, name: &str) -> Result<()> {
        self.supervisor.stop(name)
    }

    pub fn restart(&self, name: &str) -> Result<()> {
        self.supervisor.restart(name)
    }

    pub fn add(&self, program: Program) -> Result<()> {
        self.registry.add(program.clone())?;
        self.supervisor.register(&program.name);
        Ok(())
    }

    pub fn edit(&self, name: &str, patch: ProgramPatch) -> Result<Program> {
        self.registry.edit(name, patch)
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        let program = self.registry.get(name)?;
        let status = self.supervisor.status(name)?;
        if !matches!(
            status.state,
            crate::daemon::state::ProgramState::Stopped | crate::daemon::state::ProgramState::Error
        ) {
            return Err(SupervisorError::Busy(
                name.to_string(),
                "stop the program before removing it".to_string(),
            ));
        }
        self.registry.remove(name)?;
        self.supervisor.deregister(name);
        if program.uploaded {
            let dir = self.installer.program_dir(&program.slug());
            if dir.exists() {
                if let Err(e) = std::fs::remove_dir_all(&dir) {
                    warn!("Failed to remove program directory {}: {}", dir.display(), e);
                }
            }
        }
        Ok(())
    }

    /// Queues a new uploaded program for installation. `archive_path` is a
    /// temp file owned by the caller; the installer reads it synchronously
    /// on its worker before the caller is allowed to clean it up, so this
    /// function blocks until the archive has been consumed (not until the
    /// install finishes).
    pub fn upload(&self, program: Program, archive_path: PathBuf, auto_start: bool) -> Result<()> {
        self.registry.add(program.clone())?;
        self.supervisor.register(&program.name);
        self.queue_install(program, archive_path, false, auto_start)
    }

    /// Queues a code update for an already-declared uploaded program.
    pub fn update(&self, name: &str, archive_path: PathBuf) -> Result<()> {
        let program = self.registry.get(name)?;
        if !program.uploaded {
            return Err(SupervisorError::BadDeclaration(format!(
                "program '{}' was not created via upload",
                name
            )));
        }
        self.queue_install(program, archive_path, true, false)
    }

    fn queue_install(
        &self,
        program: Program,
        archive_path: PathBuf,
        is_update: bool,
        auto_start: bool,
    ) -> Result<()> {
        self.supervisor.begin_install(&program.name)?;

        let installer = Arc::clone(&self.installer);
        let supervisor = Arc::clone(&self.supervisor);
        let permits = Arc::clone(&self.install_permits);
        let name = program.name.clone();
        let archive_cleanup = archive_path.clone();

        self.runtime.spawn(async move {
            let _permit = permits.acquire().await;
            let result = tokio::task::spawn_blocking(move || {
                installer.install(&program, &archive_path, is_update)
            })
            .await;
            let _ = std::fs::remove_file(&archive_cleanup);

            let success = matches!(result, Ok(Ok(()))) ;
            if let Ok(Err(e)) = &result {
                warn!("Install for '{}' failed: {}", name, e);
            }
            if let Err(e) = &result {
                warn!("Install task for '{}' panicked: {}", name, e);
            }

            if let Err(e) = supervisor.end_install(&name, success) {
                warn!("Failed to finalize install state for '{}': {}", name, e);
                return;
            }

            if success && auto_start {
                if let Err(e) = supervisor.start(&name) {
                    warn!("Auto-start after install failed for '{}': {}", name, e);
                } else {
                    info!("Auto-started '{}' after install", name);
                }
            }
        });

        Ok(())
    }
}

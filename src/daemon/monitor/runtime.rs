use crate::daemon::supervisor::Supervisor;
use log::info;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{self, Runtime};

/// The interval between monitor ticks (§4.2).
const MONITOR_INTERVAL: Duration = Duration::from_secs(2);

/// A handle to the monitor worker's dedicated tokio runtime. Dropping this
/// does not stop the worker -- it runs for the daemon's lifetime on its own
/// thread, the same shape as the teacher's own `MonitorHandle`.
pub struct MonitorHandle {
    _runtime: Runtime,
}

fn setup_runtime() -> std::io::Result<Runtime> {
    runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("monitor-worker-thread")
        .enable_all()
        .build()
}

/// Spawns the monitor worker: a single dedicated thread running its own
/// tokio runtime, ticking [`Supervisor::tick`] every [`MONITOR_INTERVAL`].
pub fn spawn_runtime(supervisor: Arc<Supervisor>) -> MonitorHandle {
    let runtime = setup_runtime().expect("failed to create monitor runtime");
    info!("Monitor runtime started (tick interval {:?})", MONITOR_INTERVAL);

    runtime.spawn(async move {
        let mut interval = tokio::time::interval(MONITOR_INTERVAL);
        loop {
            interval.tick().await;
            supervisor.tick();
        }
    });

    MonitorHandle { _runtime: runtime }
}

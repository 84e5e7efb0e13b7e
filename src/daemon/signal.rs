use crate::daemon::core::Core;
use log::info;
use signal_hook::iterator::Signals;
use signal_hook::{SIGINT, SIGTERM};
use std::error::Error;
use std::sync::Arc;

/// Installs handlers for `SIGINT`/`SIGTERM`: on either, persist the fleet's
/// state snapshot and exit, *without* signalling any managed child (§6.3).
/// Children that outlive this process are picked up by the reattach
/// protocol the next time the daemon starts.
pub fn setup_signal_handlers(core: Arc<Core>) -> Result<(), Box<dyn Error>> {
    let signals = Signals::new([SIGTERM, SIGINT])?;

    std::thread::spawn(move || {
        for sig in signals.forever() {
            if sig == SIGTERM || sig == SIGINT {
                info!("Received shutdown signal, persisting state and exiting...");
                core.supervisor().shutdown();
                std::process::exit(0);
            }
        }
    });
    Ok(())
}

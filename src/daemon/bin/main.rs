use clap::Parser;
use log::{error, info};
use overseer::config::Settings;
use overseer::daemon::installer::Installer;
use overseer::daemon::logs::LogManager;
use overseer::daemon::persistence::PersistenceStore;
use overseer::daemon::registry::Registry;
use overseer::daemon::signal::setup_signal_handlers;
use overseer::daemon::supervisor::Supervisor;
use overseer::daemon::{api, monitor, Core};
use std::path::PathBuf;
use std::sync::Arc;

/// Minimal CLI surface for the daemon: where its state lives, and where its
/// two YAML documents are. Everything else (restart policy, web UI host and
/// port, logging thresholds) comes from `manager.yaml` itself (§6.1).
#[derive(Parser)]
#[command(name = "overseerd", version, about = "Process supervisor daemon")]
struct Args {
    /// Base directory holding manager.yaml, progs.yaml, pids.json, log/ and
    /// uploaded_programs/ (§6.4). Defaults to the current directory.
    #[arg(long, default_value = ".")]
    base_dir: PathBuf,

    /// Override the settings document path (defaults to <base_dir>/manager.yaml).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Override the program declarations path (defaults to <base_dir>/progs.yaml).
    #[arg(long)]
    programs: Option<PathBuf>,
}

/// Exit codes per §6.2: 0 normal shutdown, 1 fatal startup error, 2 port in
/// use.
const EXIT_OK: i32 = 0;
const EXIT_FATAL: i32 = 1;
const EXIT_PORT_IN_USE: i32 = 2;

fn fatal(msg: impl std::fmt::Display) -> ! {
    error!("{}", msg);
    std::process::exit(EXIT_FATAL);
}

#[rocket::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    let base_dir = args.base_dir;
    if let Err(e) = std::fs::create_dir_all(&base_dir) {
        fatal(format!("failed to create base directory {}: {}", base_dir.display(), e));
    }

    let settings_path = args.settings.unwrap_or_else(|| base_dir.join("manager.yaml"));
    let programs_path = args.programs.unwrap_or_else(|| base_dir.join("progs.yaml"));

    let settings = match Settings::load(&settings_path) {
        Ok(s) => s,
        Err(e) => fatal(format!("failed to load {}: {}", settings_path.display(), e)),
    };

    let registry = match Registry::load(programs_path.clone()) {
        Ok(r) => Arc::new(r),
        Err(e) => fatal(format!("failed to load {}: {}", programs_path.display(), e)),
    };

    let log_manager = LogManager::new(base_dir.join("log"), settings.logging.max_size_mb);
    let persistence = PersistenceStore::new(base_dir.join("pids.json"));
    let supervisor = Supervisor::new_arc(
        Arc::clone(&registry),
        settings.clone(),
        base_dir.clone(),
        log_manager,
        persistence,
    );

    let installer_log_manager = LogManager::new(base_dir.join("log"), settings.logging.max_size_mb);
    let installer = Arc::new(Installer::new(
        base_dir.join("uploaded_programs"),
        installer_log_manager,
    ));

    let runtime_handle = tokio::runtime::Handle::current();
    let core = Arc::new(Core::new(
        Arc::clone(&registry),
        Arc::clone(&supervisor),
        installer,
        runtime_handle,
    ));

    info!("Reattaching to any surviving children...");
    supervisor.reattach();

    let _monitor = monitor::spawn_runtime(Arc::clone(&supervisor));

    if let Err(e) = setup_signal_handlers(Arc::clone(&core)) {
        fatal(format!("failed to install signal handlers: {}", e));
    }

    let host = settings.web_ui.host.clone();
    let port = settings.web_ui.port;
    info!("{} listening on {}:{}", settings.web_ui.title, host, port);

    let rocket = api::build(core, &host, port);
    match rocket.launch().await {
        Ok(_) => {
            info!("Shut down normally");
            std::process::exit(EXIT_OK);
        }
        Err(e) => {
            if is_addr_in_use(&e) {
                error!("Port {} is already in use", port);
                std::process::exit(EXIT_PORT_IN_USE);
            }
            error!("Fatal error starting the web UI: {}", e);
            std::process::exit(EXIT_FATAL);
        }
    }
}

fn is_addr_in_use(e: &rocket::Error) -> bool {
    if let Some(io_err) = find_io_error(e) {
        return io_err.kind() == std::io::ErrorKind::AddrInUse;
    }
    e.to_string().to_lowercase().contains("address already in use")
}

fn find_io_error(e: &rocket::Error) -> Option<&std::io::Error> {
    let mut source: Option<&(dyn std::error::Error + 'static)> = std::error::Error::source(e);
    while let Some(err) = source {
        if let Some(io_err) = err.downcast_ref::<std::io::Error>() {
            return Some(io_err);
        }
        source = std::error::Error::source(err);
    }
    None
}

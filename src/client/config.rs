use std::env;

const DEFAULT_DAEMON_URL: &str = "http://127.0.0.1:8700";
const DAEMON_URL_ENV: &str = "OVERSEER_URL";

/// Resolves the base URL of the daemon's HTTP surface: an explicit
/// `--url` flag wins, then the `OVERSEER_URL` environment variable, then
/// the default matching `manager.yaml`'s default `web_ui` settings.
pub fn resolve_daemon_url(explicit: Option<String>) -> String {
    explicit
        .or_else(|| env::var(DAEMON_URL_ENV).ok())
        .unwrap_or_else(|| DEFAULT_DAEMON_URL.to_string())
}

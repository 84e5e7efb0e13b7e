use crate::client::emoji::{HOUR_GLASS, SUCCESS};
use crate::client::progress::{SpinnerOptions, WaitResult, WaitUntil};
use crate::client::request;
use anyhow::Result;
use console::style;

pub fn start_cmd(base_url: &str, name: &str) -> Result<()> {
    run("Starting", name, base_url, request::start)
}

pub fn stop_cmd(base_url: &str, name: &str) -> Result<()> {
    run("Stopping", name, base_url, request::stop)
}

pub fn restart_cmd(base_url: &str, name: &str) -> Result<()> {
    run("Restarting", name, base_url, request::restart)
}

fn run(
    verb: &str,
    name: &str,
    base_url: &str,
    op: impl FnOnce(&str, &str) -> Result<()>,
) -> Result<()> {
    let message = format!("{}{} {}", HOUR_GLASS, verb, style(name).white().bold());
    let spin_opts = SpinnerOptions::new(message);
    let wu = WaitUntil::new(&spin_opts);

    wu.spin_until_status(|| {
        op(base_url, name)?;
        let status = style(format!("{}", SUCCESS)).green().bold().to_string();
        Ok(WaitResult::from((), status))
    })
}

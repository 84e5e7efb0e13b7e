use crate::client::emoji::VAN;
use crate::client::progress::{SpinnerOptions, WaitResult, WaitUntil};
use crate::client::request;
use anyhow::Result;
use console::style;
use std::path::Path;

#[allow(clippy::too_many_arguments)]
pub fn upload_cmd(
    base_url: &str,
    name: &str,
    kind: &str,
    script: Option<&str>,
    module: Option<&str>,
    auto_start: bool,
    archive: &Path,
) -> Result<()> {
    let message = format!("{}Uploading {}", VAN, style(name).white().bold());
    let spin_opts = SpinnerOptions::new(message);
    let wu = WaitUntil::new(&spin_opts);

    wu.spin_until_status(|| {
        request::upload(base_url, name, kind, script, module, auto_start, archive)?;
        let status = style("(installing in background)").dim().to_string();
        Ok(WaitResult::from((), status))
    })
}

pub fn update_cmd(base_url: &str, name: &str, archive: &Path) -> Result<()> {
    let message = format!("{}Updating {}", VAN, style(name).white().bold());
    let spin_opts = SpinnerOptions::new(message);
    let wu = WaitUntil::new(&spin_opts);

    wu.spin_until_status(|| {
        request::update(base_url, name, archive)?;
        let status = style("(installing in background)").dim().to_string();
        Ok(WaitResult::from((), status))
    })
}

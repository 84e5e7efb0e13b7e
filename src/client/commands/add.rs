use crate::client::request;
use crate::dto::AddProgramDto;
use crate::tprint;
use anyhow::Result;

#[allow(clippy::too_many_arguments)]
pub fn add_cmd(
    base_url: &str,
    name: &str,
    kind: crate::daemon::program::ProgramKind,
    script: Option<String>,
    module: Option<String>,
    enabled: Option<bool>,
    venv: Option<String>,
    cwd: Option<String>,
    args: Vec<String>,
    environment: Vec<String>,
    comment: Option<String>,
) -> Result<()> {
    let dto = AddProgramDto {
        name: name.to_string(),
        kind,
        script,
        module,
        enabled,
        venv,
        cwd,
        args,
        environment,
        comment,
    };
    request::add(base_url, &dto)?;
    tprint!("Added program '{}'", name);
    Ok(())
}

pub fn remove_cmd(base_url: &str, name: &str) -> Result<()> {
    request::remove(base_url, name)?;
    tprint!("Removed program '{}'", name);
    Ok(())
}

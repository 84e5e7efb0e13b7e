//! Thin HTTP client for the daemon's Control Interface surface (§6.2).
//! Every call is synchronous and short-lived; there is no long-poll or
//! streaming endpoint in this core.

use crate::dto::{
    AcceptedDto, AddProgramDto, EditProgramDto, ErrorResponseDto, LogResponseDto, StatusDto,
};
use anyhow::{anyhow, bail, Result};
use reqwest::blocking::{multipart, Client, Response};
use std::path::Path;
use std::time::Duration;

fn client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .expect("failed to build HTTP client")
}

/// Turns a non-success response into an `Err` carrying the daemon's own
/// error message, falling back to the raw status line if the body isn't
/// the expected JSON shape.
fn check(resp: Response) -> Result<Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    match resp.json::<ErrorResponseDto>() {
        Ok(body) => bail!(body.message),
        Err(_) => bail!("request failed with status {}", status),
    }
}

pub fn status_all(base_url: &str) -> Result<Vec<StatusDto>> {
    let resp = client().get(format!("{}/api/status", base_url)).send()?;
    Ok(check(resp)?.json()?)
}

pub fn status_one(base_url: &str, name: &str) -> Result<StatusDto> {
    let resp = client()
        .get(format!("{}/api/status/{}", base_url, name))
        .send()?;
    Ok(check(resp)?.json()?)
}

pub fn logs(base_url: &str, name: &str, offset: usize, lines: usize) -> Result<LogResponseDto> {
    let resp = client()
        .get(format!("{}/api/logs/{}", base_url, name))
        .query(&[("offset", offset), ("lines", lines)])
        .send()?;
    Ok(check(resp)?.json()?)
}

pub fn start(base_url: &str, name: &str) -> Result<()> {
    let resp = client()
        .post(format!("{}/api/start/{}", base_url, name))
        .send()?;
    check(resp)?.json::<AcceptedDto>()?;
    Ok(())
}

pub fn stop(base_url: &str, name: &str) -> Result<()> {
    let resp = client()
        .post(format!("{}/api/stop/{}", base_url, name))
        .send()?;
    check(resp)?.json::<AcceptedDto>()?;
    Ok(())
}

pub fn restart(base_url: &str, name: &str) -> Result<()> {
    let resp = client()
        .post(format!("{}/api/restart/{}", base_url, name))
        .send()?;
    check(resp)?.json::<AcceptedDto>()?;
    Ok(())
}

pub fn add(base_url: &str, program: &AddProgramDto) -> Result<()> {
    let resp = client()
        .post(format!("{}/api/add", base_url))
        .json(program)
        .send()?;
    check(resp)?.json::<AcceptedDto>()?;
    Ok(())
}

pub fn edit(base_url: &str, name: &str, patch: &EditProgramDto) -> Result<()> {
    let resp = client()
        .post(format!("{}/api/edit/{}", base_url, name))
        .json(patch)
        .send()?;
    check(resp)?.json::<AcceptedDto>()?;
    Ok(())
}

pub fn remove(base_url: &str, name: &str) -> Result<()> {
    let resp = client()
        .post(format!("{}/api/remove/{}", base_url, name))
        .send()?;
    check(resp)?.json::<AcceptedDto>()?;
    Ok(())
}

/// Uploads a new program declaration plus its code archive in one
/// multipart request. `fields` mirrors the daemon's `UploadForm`.
#[allow(clippy::too_many_arguments)]
pub fn upload(
    base_url: &str,
    name: &str,
    kind: &str,
    script: Option<&str>,
    module: Option<&str>,
    auto_start: bool,
    archive_path: &Path,
) -> Result<()> {
    let mut form = multipart::Form::new()
        .text("name", name.to_string())
        .text("type", kind.to_string())
        .text("auto_start", auto_start.to_string())
        .file("file", archive_path)
        .map_err(|e| anyhow!("failed to attach archive '{}': {}", archive_path.display(), e))?;

    if let Some(script) = script {
        form = form.text("script", script.to_string());
    }
    if let Some(module) = module {
        form = form.text("module", module.to_string());
    }

    let resp = client()
        .post(format!("{}/api/upload", base_url))
        .multipart(form)
        .send()?;
    check(resp)?.json::<AcceptedDto>()?;
    Ok(())
}

pub fn update(base_url: &str, name: &str, archive_path: &Path) -> Result<()> {
    let form = multipart::Form::new()
        .file("file", archive_path)
        .map_err(|e| anyhow!("failed to attach archive '{}': {}", archive_path.display(), e))?;

    let resp = client()
        .post(format!("{}/api/update/{}", base_url, name))
        .multipart(form)
        .send()?;
    check(resp)?.json::<AcceptedDto>()?;
    Ok(())
}

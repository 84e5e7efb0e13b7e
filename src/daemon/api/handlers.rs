use crate::daemon::api::error::{ApiError, ApiResult};
use crate::daemon::core::Core;
use crate::daemon::program::ProgramKind;
use crate::dto::{
    AcceptedDto, AddProgramDto, EditProgramDto, ErrorResponseDto, LogResponseDto, StatusDto,
};
use rocket::form::Form;
use rocket::fs::TempFile;
use rocket::serde::json::Json;
use rocket::State;
use std::sync::Arc;

const DEFAULT_LOG_LINES: usize = 100;
const MAX_LOG_LINES: usize = 10_000;

#[get("/api/status")]
pub fn status_all(core: &State<Arc<Core>>) -> Json<Vec<StatusDto>> {
    let dtos = core
        .status_all()
        .into_iter()
        .filter_map(|snapshot| {
            core.registry()
                .get(&snapshot.name)
                .ok()
                .map(|program| StatusDto::from_snapshot(&snapshot, &program))
        })
        .collect();
    Json(dtos)
}

#[get("/api/status/<name>")]
pub fn status_one(core: &State<Arc<Core>>, name: &str) -> ApiResult<Json<StatusDto>> {
    let program = core.registry().get(name)?;
    let snapshot = core.status(name)?;
    Ok(Json(StatusDto::from_snapshot(&snapshot, &program)))
}

#[get("/api/logs/<name>?<offset>&<lines>")]
pub fn logs(
    core: &State<Arc<Core>>,
    name: &str,
    offset: Option<usize>,
    lines: Option<usize>,
) -> ApiResult<Json<LogResponseDto>> {
    let program = core.registry().get(name)?;
    let max_lines = lines.unwrap_or(DEFAULT_LOG_LINES).clamp(1, MAX_LOG_LINES);
    let offset = offset.unwrap_or(0);

    let page = core
        .supervisor()
        .log_manager()
        .read(&program.slug(), offset, max_lines)
        .map_err(crate::error::SupervisorError::Other)?;

    Ok(Json(LogResponseDto {
        lines: page.lines,
        offset: page.offset,
        total_lines: page.total_lines,
        total_bytes: page.total_bytes,
        rotated: page.rotated,
    }))
}

#[post("/api/start/<name>")]
pub fn start(core: &State<Arc<Core>>, name: &str) -> ApiResult<Json<AcceptedDto>> {
    core.start(name)?;
    Ok(Json(AcceptedDto { accepted: true }))
}

#[post("/api/stop/<name>")]
pub fn stop(core: &State<Arc<Core>>, name: &str) -> ApiResult<Json<AcceptedDto>> {
    core.stop(name)?;
    Ok(Json(AcceptedDto { accepted: true }))
}

#[post("/api/restart/<name>")]
pub fn restart(core: &State<Arc<Core>>, name: &str) -> ApiResult<Json<AcceptedDto>> {
    core.restart(name)?;
    Ok(Json(AcceptedDto { accepted: true }))
}

#[post("/api/add", data = "<body>")]
pub fn add(core: &State<Arc<Core>>, body: Json<AddProgramDto>) -> ApiResult<Json<AcceptedDto>> {
    core.add(body.into_inner().into_program())?;
    Ok(Json(AcceptedDto { accepted: true }))
}

#[post("/api/edit/<name>", data = "<body>")]
pub fn edit(
    core: &State<Arc<Core>>,
    name: &str,
    body: Json<EditProgramDto>,
) -> ApiResult<Json<AcceptedDto>> {
    core.edit(name, body.into_inner().into_patch())?;
    Ok(Json(AcceptedDto { accepted: true }))
}

#[post("/api/remove/<name>")]
pub fn remove(core: &State<Arc<Core>>, name: &str) -> ApiResult<Json<AcceptedDto>> {
    core.remove(name)?;
    Ok(Json(AcceptedDto { accepted: true }))
}

#[derive(FromForm)]
pub struct UploadForm<'r> {
    pub name: String,
    #[field(name = "type")]
    pub kind: Option<String>,
    pub module: Option<String>,
    pub script: Option<String>,
    pub enabled: Option<bool>,
    pub auto_start: Option<bool>,
    pub venv: Option<String>,
    pub cwd: Option<String>,
    /// Newline-separated argument list.
    pub args: Option<String>,
    /// Newline-separated `KEY=VALUE` entries.
    pub environment: Option<String>,
    pub comment: Option<String>,
    pub file: TempFile<'r>,
}

fn split_lines(text: &Option<String>) -> Vec<String> {
    text.as_deref()
        .map(|t| t.lines().map(str::trim).filter(|l| !l.is_empty()).map(String::from).collect())
        .unwrap_or_default()
}

fn parse_kind(kind: &Option<String>) -> ProgramKind {
    match kind.as_deref() {
        Some("node") => ProgramKind::Node,
        Some("exec") => ProgramKind::Exec,
        _ => ProgramKind::Python,
    }
}

#[post("/api/upload", data = "<form>")]
pub async fn upload(core: &State<Arc<Core>>, mut form: Form<UploadForm<'_>>) -> ApiResult<Json<AcceptedDto>> {
    let archive_path = std::env::temp_dir().join(format!("overseer-upload-{}.zip", uuid::Uuid::new_v4()));
    form.file
        .copy_to(&archive_path)
        .await
        .map_err(|e| crate::error::SupervisorError::Other(e.into()))?;

    let program = crate::daemon::program::Program {
        name: form.name.clone(),
        kind: parse_kind(&form.kind),
        script: form.script.clone(),
        module: form.module.clone(),
        enabled: form.enabled.unwrap_or(true),
        uploaded: true,
        venv: form.venv.clone(),
        cwd: form.cwd.clone(),
        args: split_lines(&form.args),
        environment: split_lines(&form.environment)
            .into_iter()
            .map(crate::daemon::program::EnvEntry)
            .collect(),
        comment: form.comment.clone(),
    };
    let auto_start = form.auto_start.unwrap_or(true);

    let result = core.upload(program, archive_path.clone(), auto_start);
    if result.is_err() {
        let _ = std::fs::remove_file(&archive_path);
    }
    result?;
    Ok(Json(AcceptedDto { accepted: true }))
}

#[derive(FromForm)]
pub struct UpdateForm<'r> {
    pub file: TempFile<'r>,
}

#[post("/api/update/<name>", data = "<form>")]
pub async fn update(
    core: &State<Arc<Core>>,
    name: &str,
    mut form: Form<UpdateForm<'_>>,
) -> ApiResult<Json<AcceptedDto>> {
    let archive_path = std::env::temp_dir().join(format!("overseer-update-{}.zip", uuid::Uuid::new_v4()));
    form.file
        .copy_to(&archive_path)
        .await
        .map_err(|e| crate::error::SupervisorError::Other(e.into()))?;

    let result = core.update(name, archive_path.clone());
    if result.is_err() {
        let _ = std::fs::remove_file(&archive_path);
    }
    result?;
    Ok(Json(AcceptedDto { accepted: true }))
}

#[catch(default)]
pub fn default_catcher(status: rocket::http::Status, _req: &rocket::Request) -> Json<ErrorResponseDto> {
    Json(ErrorResponseDto {
        status: status.code,
        message: status.reason().unwrap_or("unknown error").to_string(),
    })
}

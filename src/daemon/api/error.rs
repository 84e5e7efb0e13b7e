use crate::dto::ErrorResponseDto;
use crate::error::SupervisorError;
use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use rocket::Request;

/// Wraps a [`SupervisorError`] so it can be returned directly from a Rocket
/// handler; maps each kind onto the status code from §7's error taxonomy.
pub struct ApiError(pub SupervisorError);

impl From<SupervisorError> for ApiError {
    fn from(e: SupervisorError) -> Self {
        ApiError(e)
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let status = match &self.0 {
            SupervisorError::NameConflict(_) => Status::Conflict,
            SupervisorError::NotFound(_) => Status::NotFound,
            SupervisorError::Busy(_, _) => Status::Conflict,
            SupervisorError::BadDeclaration(_) => Status::BadRequest,
            SupervisorError::UnsafePath(_) => Status::BadRequest,
            SupervisorError::ArchiveTooLarge(_) => Status::PayloadTooLarge,
            SupervisorError::InstallTimeout(_) => Status::InternalServerError,
            SupervisorError::SpawnFailed(_, _) => Status::InternalServerError,
            SupervisorError::Other(_) => Status::InternalServerError,
            SupervisorError::Io(_) => Status::InternalServerError,
        };

        let body = ErrorResponseDto {
            status: status.code,
            message: self.0.to_string(),
        };
        Json(body).respond_to(req).map(|mut r| {
            r.set_status(status);
            r
        })
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::{
    DbErr,
    models::{
        group::GroupError, project::ProjectError, task::TaskError, task_status::TaskStatusError,
        user::UserError,
    },
};
use services::services::access::AccessError;
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error, ts_rs::TS)]
#[ts(type = "string")]
pub enum ApiError {
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error(transparent)]
    Group(#[from] GroupError),
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    TaskStatus(#[from] TaskStatusError),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
}

impl From<&'static str> for ApiError {
    fn from(msg: &'static str) -> Self {
        ApiError::BadRequest(msg.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_type) = match &self {
            ApiError::User(err) => match err {
                UserError::EmailTaken => (StatusCode::BAD_REQUEST, "UserError"),
                UserError::NotFound => (StatusCode::NOT_FOUND, "UserError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "UserError"),
            },
            ApiError::Project(err) => match err {
                ProjectError::NotFound => (StatusCode::NOT_FOUND, "ProjectError"),
                ProjectError::OwnerNotFound => (StatusCode::BAD_REQUEST, "ProjectError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "ProjectError"),
            },
            ApiError::Group(err) => match err {
                GroupError::NotFound => (StatusCode::NOT_FOUND, "GroupError"),
                GroupError::OwnerNotFound => (StatusCode::BAD_REQUEST, "GroupError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "GroupError"),
            },
            ApiError::Task(err) => match err {
                TaskError::NotFound | TaskError::ProjectNotFound => {
                    (StatusCode::NOT_FOUND, "TaskError")
                }
                TaskError::AssigneeNotFound => (StatusCode::BAD_REQUEST, "TaskError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "TaskError"),
            },
            ApiError::TaskStatus(err) => match err {
                TaskStatusError::NotFound => (StatusCode::NOT_FOUND, "TaskStatusError"),
                TaskStatusError::Duplicate
                | TaskStatusError::InUse(_)
                | TaskStatusError::NoFieldsToUpdate => {
                    (StatusCode::BAD_REQUEST, "TaskStatusError")
                }
                TaskStatusError::SystemProtected => (StatusCode::FORBIDDEN, "TaskStatusError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "TaskStatusError"),
            },
            ApiError::Access(err) => match err {
                AccessError::Forbidden => (StatusCode::FORBIDDEN, "AccessError"),
                AccessError::NotFound => (StatusCode::NOT_FOUND, "AccessError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "AccessError"),
            },
            ApiError::Database(db_err) => match db_err {
                DbErr::RecordNotFound(_) => (StatusCode::NOT_FOUND, "DatabaseError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError"),
            },
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "ConflictError"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "ForbiddenError"),
        };

        let error_message = match &self {
            ApiError::Unauthorized => "Unauthorized. Please sign in again.".to_string(),
            ApiError::NotFound(msg) => msg.clone(),
            ApiError::Internal(msg) => msg.clone(),
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Conflict(msg) => msg.clone(),
            ApiError::Forbidden(msg) => msg.clone(),
            _ => format!("{}: {}", error_type, self),
        };

        if status_code.is_server_error() {
            tracing::error!(
                status = %status_code,
                error_type,
                error = %self,
                "API request failed"
            );
        }
        let response = ApiResponse::<()>::error(&error_message);
        (status_code, Json(response)).into_response()
    }
}

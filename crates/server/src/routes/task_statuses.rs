use axum::{
    Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, put},
};
use db::models::task_status::{
    CreateTaskStatus, TaskStatus, UpdateTaskStatus, derive_key,
};
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/task-statuses", get(list_statuses).post(create_status))
        .route(
            "/task-statuses/{status_id}",
            put(update_status).delete(delete_status),
        )
}

pub async fn list_statuses(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<TaskStatus>>>, ApiError> {
    let statuses = TaskStatus::find_all(&state.db().conn).await?;
    Ok(ResponseJson(ApiResponse::success(statuses)))
}

pub async fn create_status(
    State(state): State<AppState>,
    Json(payload): Json<CreateTaskStatus>,
) -> Result<ResponseJson<ApiResponse<TaskStatus>>, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Status name is required".to_string()));
    }
    if derive_key(&payload.name).is_empty() {
        return Err(ApiError::BadRequest(
            "Status name must contain letters or digits".to_string(),
        ));
    }

    let status = TaskStatus::create(&state.db().conn, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(status)))
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(status_id): Path<i64>,
    Json(payload): Json<UpdateTaskStatus>,
) -> Result<ResponseJson<ApiResponse<TaskStatus>>, ApiError> {
    let status = TaskStatus::update(&state.db().conn, status_id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(status)))
}

pub async fn delete_status(
    State(state): State<AppState>,
    Path(status_id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    TaskStatus::delete(&state.db().conn, status_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

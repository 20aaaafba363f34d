use axum::{
    Extension, Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, put},
};
use chrono::{DateTime, Utc};
use db::models::{
    project::Project,
    project_member::ProjectMember,
    task::{CreateTask, Task, TaskWithStatus, UpdateTask},
    task_status::{StatusInput, TaskStatus},
};
use serde::Deserialize;
use services::services::access::ensure_project_member;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError, http::auth::AuthUser, middleware::load_task_middleware};

#[derive(Debug, Deserialize, TS)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<StatusInput>,
    pub assigned_to: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Partial update. Omitted fields keep their value; an empty description
/// clears it; an explicit `null` clears the assignee or the due date.
#[derive(Debug, Deserialize, TS)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<StatusInput>,
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<DateTime<Utc>>>,
}

/// Maps a present-but-null field to `Some(None)` so it stays distinguishable
/// from an omitted field, which `#[serde(default)]` leaves as `None`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize, TS)]
pub struct AssignTaskRequest {
    pub user_id: Option<Uuid>,
}

/// Routes mounted under `/projects/{project_id}/tasks`.
pub fn project_scoped_router() -> Router<AppState> {
    Router::new().route("/", get(list_project_tasks).post(create_task))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let task_id_router = Router::new()
        .route("/", get(get_task).put(update_task).delete(delete_task))
        .route("/assign", put(assign_task))
        .layer(from_fn_with_state(state.clone(), load_task_middleware));

    Router::new().nest("/tasks/{task_id}", task_id_router)
}

async fn resolve_status(state: &AppState, input: &StatusInput) -> Result<i64, ApiError> {
    TaskStatus::resolve(&state.db().conn, input)
        .await?
        .map(|status| status.id)
        .ok_or_else(|| ApiError::BadRequest("Unknown task status".to_string()))
}

async fn ensure_assignee_is_member(
    state: &AppState,
    project_id: Uuid,
    assignee: Uuid,
) -> Result<(), ApiError> {
    if ProjectMember::exists(&state.db().conn, project_id, assignee).await? {
        Ok(())
    } else {
        Err(ApiError::BadRequest(
            "Assignee is not a project member".to_string(),
        ))
    }
}

pub async fn list_project_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Extension(project): Extension<Project>,
) -> Result<ResponseJson<ApiResponse<Vec<TaskWithStatus>>>, ApiError> {
    ensure_project_member(&state.db().conn, project.id, auth.id).await?;
    let tasks = Task::find_by_project(&state.db().conn, project.id, Utc::now()).await?;
    Ok(ResponseJson(ApiResponse::success(tasks)))
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Extension(project): Extension<Project>,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<ResponseJson<ApiResponse<TaskWithStatus>>, ApiError> {
    ensure_project_member(&state.db().conn, project.id, auth.id).await?;

    if payload.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Task title is required".to_string()));
    }
    if let Some(due_date) = payload.due_date
        && due_date < Utc::now()
    {
        return Err(ApiError::BadRequest(
            "Due date cannot be in the past".to_string(),
        ));
    }

    let status_id = match &payload.status {
        Some(input) => Some(resolve_status(&state, input).await?),
        None => None,
    };
    if let Some(assignee) = payload.assigned_to {
        ensure_assignee_is_member(&state, project.id, assignee).await?;
    }

    let task = Task::create(
        &state.db().conn,
        &CreateTask {
            title: payload.title.trim().to_string(),
            description: payload.description.clone(),
            status_id,
            assigned_to: payload.assigned_to,
            due_date: payload.due_date,
        },
        Uuid::new_v4(),
        project.id,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Extension(task): Extension<TaskWithStatus>,
) -> Result<ResponseJson<ApiResponse<TaskWithStatus>>, ApiError> {
    ensure_project_member(&state.db().conn, task.project_id, auth.id).await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Extension(task): Extension<TaskWithStatus>,
    Json(payload): Json<UpdateTaskRequest>,
) -> Result<ResponseJson<ApiResponse<TaskWithStatus>>, ApiError> {
    ensure_project_member(&state.db().conn, task.project_id, auth.id).await?;

    let status_id = match &payload.status {
        Some(input) => resolve_status(&state, input).await?,
        None => task.status_id,
    };
    let due_date = match payload.due_date {
        None => task.due_date,
        Some(None) => None,
        Some(Some(due_date)) => {
            if Some(due_date) != task.due_date && due_date < Utc::now() {
                return Err(ApiError::BadRequest(
                    "Due date cannot be in the past".to_string(),
                ));
            }
            Some(due_date)
        }
    };
    let assigned_to = match payload.assigned_to {
        None => task.assigned_to,
        Some(None) => None,
        Some(Some(assignee)) => {
            ensure_assignee_is_member(&state, task.project_id, assignee).await?;
            Some(assignee)
        }
    };
    let description = match payload.description.as_deref() {
        None => task.description.clone(),
        Some(text) if text.trim().is_empty() => None,
        Some(text) => Some(text.to_string()),
    };

    let updated = Task::update(
        &state.db().conn,
        task.id,
        &UpdateTask {
            title: payload.title.clone().unwrap_or_else(|| task.title.clone()),
            description,
            status_id,
            assigned_to,
            due_date,
        },
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

/// Sets or clears the assignee. A null `user_id` unassigns the task.
pub async fn assign_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Extension(task): Extension<TaskWithStatus>,
    Json(payload): Json<AssignTaskRequest>,
) -> Result<ResponseJson<ApiResponse<TaskWithStatus>>, ApiError> {
    ensure_project_member(&state.db().conn, task.project_id, auth.id).await?;
    if let Some(assignee) = payload.user_id {
        ensure_assignee_is_member(&state, task.project_id, assignee).await?;
    }

    let updated = Task::assign(&state.db().conn, task.id, payload.user_id).await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Extension(task): Extension<TaskWithStatus>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    ensure_project_member(&state.db().conn, task.project_id, auth.id).await?;
    Task::delete(&state.db().conn, task.id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

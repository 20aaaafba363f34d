use std::{fmt::Display, future::Future};

use axum::{
    extract::{RawPathParams, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use db::models::{group::Group, project::Project, task::Task};
use uuid::Uuid;

use crate::AppState;

async fn fetch_model_or_status<M, E, Fut>(
    model_name: &'static str,
    model_id: Uuid,
    load_future: Fut,
) -> Result<M, StatusCode>
where
    E: Display,
    Fut: Future<Output = Result<Option<M>, E>>,
{
    match load_future.await {
        Ok(Some(model)) => Ok(model),
        Ok(None) => {
            tracing::warn!("{model_name} {model_id} not found");
            Err(StatusCode::NOT_FOUND)
        }
        Err(error) => {
            tracing::error!("Failed to fetch {model_name} {model_id}: {error}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn load_request_extension<M, E, Fut>(
    request: Request,
    next: Next,
    model_name: &'static str,
    model_id: Uuid,
    load_future: Fut,
) -> Result<Response, StatusCode>
where
    M: Clone + Send + Sync + 'static,
    E: Display,
    Fut: Future<Output = Result<Option<M>, E>>,
{
    let model = fetch_model_or_status(model_name, model_id, load_future).await?;
    let mut request = request;
    request.extensions_mut().insert(model);
    Ok(next.run(request).await)
}

// Routes below a loader can carry extra path params, so the id is picked out
// by name instead of deserializing the whole path.
fn path_uuid(params: &RawPathParams, key: &str) -> Result<Uuid, StatusCode> {
    params
        .iter()
        .find(|(name, _)| *name == key)
        .and_then(|(_, value)| Uuid::parse_str(value).ok())
        .ok_or(StatusCode::BAD_REQUEST)
}

pub async fn load_project_middleware(
    State(state): State<AppState>,
    params: RawPathParams,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let project_id = path_uuid(&params, "project_id")?;
    load_request_extension(
        request,
        next,
        "Project",
        project_id,
        Project::find_by_uuid(&state.db().conn, project_id),
    )
    .await
}

pub async fn load_task_middleware(
    State(state): State<AppState>,
    params: RawPathParams,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let task_id = path_uuid(&params, "task_id")?;
    load_request_extension(
        request,
        next,
        "Task",
        task_id,
        Task::find_by_uuid(&state.db().conn, task_id, Utc::now()),
    )
    .await
}

/// Loads an active group. Soft-deleted groups fail here with 404, so callers
/// cannot tell them apart from groups that never existed.
pub async fn load_group_middleware(
    State(state): State<AppState>,
    params: RawPathParams,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let group_id = path_uuid(&params, "group_id")?;
    load_request_extension(
        request,
        next,
        "Group",
        group_id,
        Group::find_by_uuid(&state.db().conn, group_id),
    )
    .await
}

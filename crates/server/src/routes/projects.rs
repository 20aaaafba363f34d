use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{delete, get, patch},
};
use db::DbErr;
use db::models::{
    project::{CreateProject, Project, ProjectWithRole, UpdateProject},
    project_member::{ProjectMember, ProjectMemberInfo},
    role::Role,
};
use db::types::RoleName;
use serde::Deserialize;
use services::services::access::{ensure_project_member, ensure_project_owner};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    AppState, error::ApiError, http::auth::AuthUser, middleware::load_project_middleware, routes,
};

#[derive(Debug, Deserialize, TS)]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: Option<String>,
    /// Additional members to enroll right away. Unknown ids are skipped.
    pub members: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize, TS)]
pub struct AddMemberRequest {
    pub user_id: Uuid,
    pub role: Option<String>,
}

pub fn router(state: &AppState) -> Router<AppState> {
    let members_router = Router::new()
        .route("/", get(list_members).post(add_member))
        .route("/{user_id}", delete(remove_member));

    let project_id_router = Router::new()
        .route(
            "/",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/finish", patch(finish_project))
        .nest("/members", members_router)
        .nest("/tasks", routes::tasks::project_scoped_router())
        .layer(from_fn_with_state(state.clone(), load_project_middleware));

    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .nest("/projects/{project_id}", project_id_router)
}

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<ResponseJson<ApiResponse<Vec<ProjectWithRole>>>, ApiError> {
    let projects = Project::find_for_user(&state.db().conn, auth.id).await?;
    Ok(ResponseJson(ApiResponse::success(projects)))
}

pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<CreateProjectRequest>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Project name is required".to_string()));
    }

    let project = Project::create(
        &state.db().conn,
        &CreateProject {
            name: payload.name.trim().to_string(),
            description: payload.description.clone(),
        },
        Uuid::new_v4(),
        auth.id,
    )
    .await?;

    if let Some(members) = &payload.members {
        let member_role = Role::find_by_name(&state.db().conn, RoleName::Member)
            .await?
            .ok_or_else(|| ApiError::Internal("Member role not seeded".to_string()))?;
        for user_id in members {
            match ProjectMember::add(&state.db().conn, project.id, *user_id, member_role.id).await {
                Ok(_) => {}
                Err(DbErr::RecordNotFound(_)) => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }

    Ok(ResponseJson(ApiResponse::success(project)))
}

pub async fn get_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Extension(project): Extension<Project>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    ensure_project_member(&state.db().conn, project.id, auth.id).await?;
    Ok(ResponseJson(ApiResponse::success(project)))
}

pub async fn update_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Extension(project): Extension<Project>,
    Json(payload): Json<UpdateProject>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    ensure_project_owner(&state.db().conn, project.id, auth.id).await?;
    let updated = Project::update(&state.db().conn, project.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

pub async fn finish_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Extension(project): Extension<Project>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    ensure_project_owner(&state.db().conn, project.id, auth.id).await?;
    let finished = Project::finish(&state.db().conn, project.id).await?;
    Ok(ResponseJson(ApiResponse::success(finished)))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Extension(project): Extension<Project>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    ensure_project_owner(&state.db().conn, project.id, auth.id).await?;
    Project::delete(&state.db().conn, project.id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn list_members(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Extension(project): Extension<Project>,
) -> Result<ResponseJson<ApiResponse<Vec<ProjectMemberInfo>>>, ApiError> {
    ensure_project_member(&state.db().conn, project.id, auth.id).await?;
    let members = ProjectMember::members_of(&state.db().conn, project.id).await?;
    Ok(ResponseJson(ApiResponse::success(members)))
}

pub async fn add_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Extension(project): Extension<Project>,
    Json(payload): Json<AddMemberRequest>,
) -> Result<ResponseJson<ApiResponse<Vec<ProjectMemberInfo>>>, ApiError> {
    ensure_project_owner(&state.db().conn, project.id, auth.id).await?;

    let role_name = match payload.role.as_deref() {
        None => RoleName::Member,
        Some(raw) => raw
            .parse::<RoleName>()
            .map_err(|_| ApiError::BadRequest(format!("Unknown role '{raw}'")))?,
    };
    let role = Role::find_by_name(&state.db().conn, role_name)
        .await?
        .ok_or_else(|| ApiError::Internal("Role not seeded".to_string()))?;

    match ProjectMember::add(&state.db().conn, project.id, payload.user_id, role.id).await {
        Ok(_) => {}
        Err(DbErr::RecordNotFound(_)) => {
            return Err(ApiError::NotFound("User not found".to_string()));
        }
        Err(err) => return Err(err.into()),
    }

    let members = ProjectMember::members_of(&state.db().conn, project.id).await?;
    Ok(ResponseJson(ApiResponse::success(members)))
}

pub async fn remove_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Extension(project): Extension<Project>,
    Path((_, user_id)): Path<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    ensure_project_owner(&state.db().conn, project.id, auth.id).await?;

    if user_id == project.owner_id {
        return Err(ApiError::BadRequest(
            "The project owner cannot be removed".to_string(),
        ));
    }

    let removed = ProjectMember::remove(&state.db().conn, project.id, user_id).await?;
    if removed == 0 {
        return Err(ApiError::NotFound("Member not found".to_string()));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

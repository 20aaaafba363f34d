use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{delete, get},
};
use db::models::{
    group::{CreateGroup, Group, UpdateGroup},
    group_member::{GroupMember, GroupMemberInfo},
};
use serde::{Deserialize, Serialize};
use services::services::access::{ensure_group_member, ensure_group_owner};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError, http::auth::AuthUser, middleware::load_group_middleware};

#[derive(Debug, Deserialize, TS)]
pub struct AddGroupMembersRequest {
    pub user_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize, TS)]
pub struct AddedGroupMembers {
    pub added: usize,
}

pub fn router(state: &AppState) -> Router<AppState> {
    let members_router = Router::new()
        .route("/", get(list_members).post(add_members))
        .route("/{user_id}", delete(remove_member));

    let group_id_router = Router::new()
        .route("/", get(get_group).put(update_group).delete(delete_group))
        .nest("/members", members_router)
        .layer(from_fn_with_state(state.clone(), load_group_middleware));

    Router::new()
        .route("/groups", get(list_groups).post(create_group))
        .nest("/groups/{group_id}", group_id_router)
}

pub async fn list_groups(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<ResponseJson<ApiResponse<Vec<Group>>>, ApiError> {
    let groups = Group::find_for_user(&state.db().conn, auth.id).await?;
    Ok(ResponseJson(ApiResponse::success(groups)))
}

pub async fn create_group(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<CreateGroup>,
) -> Result<ResponseJson<ApiResponse<Group>>, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Group name is required".to_string()));
    }

    let group = Group::create(&state.db().conn, &payload, Uuid::new_v4(), auth.id).await?;
    Ok(ResponseJson(ApiResponse::success(group)))
}

pub async fn get_group(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Extension(group): Extension<Group>,
) -> Result<ResponseJson<ApiResponse<Group>>, ApiError> {
    ensure_group_member(&state.db().conn, group.id, auth.id).await?;
    Ok(ResponseJson(ApiResponse::success(group)))
}

pub async fn update_group(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Extension(group): Extension<Group>,
    Json(payload): Json<UpdateGroup>,
) -> Result<ResponseJson<ApiResponse<Group>>, ApiError> {
    ensure_group_owner(&state.db().conn, group.id, auth.id).await?;
    let updated = Group::update(&state.db().conn, group.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

pub async fn delete_group(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Extension(group): Extension<Group>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    ensure_group_owner(&state.db().conn, group.id, auth.id).await?;
    Group::soft_delete(&state.db().conn, group.id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn list_members(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Extension(group): Extension<Group>,
) -> Result<ResponseJson<ApiResponse<Vec<GroupMemberInfo>>>, ApiError> {
    ensure_group_member(&state.db().conn, group.id, auth.id).await?;
    let members = GroupMember::members_of(&state.db().conn, group.id).await?;
    Ok(ResponseJson(ApiResponse::success(members)))
}

/// Bulk enrollment. Unknown users are skipped; the response reports how many
/// memberships were actually created.
pub async fn add_members(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Extension(group): Extension<Group>,
    Json(payload): Json<AddGroupMembersRequest>,
) -> Result<ResponseJson<ApiResponse<AddedGroupMembers>>, ApiError> {
    ensure_group_owner(&state.db().conn, group.id, auth.id).await?;
    let added = GroupMember::add_many(&state.db().conn, group.id, &payload.user_ids).await?;
    Ok(ResponseJson(ApiResponse::success(AddedGroupMembers {
        added,
    })))
}

pub async fn remove_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Extension(group): Extension<Group>,
    Path((_, user_id)): Path<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    ensure_group_owner(&state.db().conn, group.id, auth.id).await?;

    if user_id == group.owner_id {
        return Err(ApiError::BadRequest(
            "The group owner cannot be removed".to_string(),
        ));
    }

    let removed = GroupMember::remove(&state.db().conn, group.id, user_id).await?;
    if removed == 0 {
        return Err(ApiError::NotFound("Member not found".to_string()));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

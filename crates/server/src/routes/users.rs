use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::user::{UpdateUser, User};
use serde::Deserialize;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError, http::auth::AuthUser};

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub name: Option<String>,
    pub email: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{user_id}", get(get_user).put(update_user))
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<User>>>, ApiError> {
    let users = User::search(
        &state.db().conn,
        query.name.as_deref(),
        query.email.as_deref(),
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(users)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    let user = User::find_by_uuid(&state.db().conn, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(ResponseJson(ApiResponse::success(user)))
}

/// Users can only edit their own profile.
pub async fn update_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateUser>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    if user_id != auth.id {
        return Err(ApiError::Forbidden(
            "You can only update your own profile".to_string(),
        ));
    }

    let user = User::update(&state.db().conn, user_id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(user)))
}

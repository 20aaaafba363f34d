use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use db::models::role::Role;
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

pub fn router() -> Router<AppState> {
    Router::new().route("/roles", get(list_roles))
}

pub async fn list_roles(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Role>>>, ApiError> {
    let roles = Role::find_all(&state.db().conn).await?;
    Ok(ResponseJson(ApiResponse::success(roles)))
}

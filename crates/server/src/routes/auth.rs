use axum::{
    Json, Router,
    extract::{Request, State},
    response::Json as ResponseJson,
    routing::post,
};
use chrono::{DateTime, Utc};
use db::models::{
    token_blocklist::TokenBlocklist,
    user::{CreateUser, User},
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError, http::auth::bearer_token};

#[derive(Debug, Deserialize, TS)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, TS)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, TS)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/auth/logout", post(logout))
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    if payload.name.trim().is_empty()
        || payload.email.trim().is_empty()
        || payload.password.is_empty()
    {
        return Err(ApiError::BadRequest(
            "Name, email and password are required".to_string(),
        ));
    }

    let password_hash = bcrypt::hash(&payload.password, bcrypt::DEFAULT_COST)
        .map_err(|err| ApiError::Internal(format!("Failed to hash password: {err}")))?;

    let user = User::create(
        &state.db().conn,
        &CreateUser {
            name: payload.name.trim().to_string(),
            email: payload.email.trim().to_string(),
            password_hash,
        },
        Uuid::new_v4(),
    )
    .await?;

    Ok(ResponseJson(ApiResponse::success(user)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<ResponseJson<ApiResponse<LoginResponse>>, ApiError> {
    let Some((user, password_hash)) =
        User::find_by_email_with_password(&state.db().conn, payload.email.trim()).await?
    else {
        return Err(ApiError::Unauthorized);
    };

    let valid = bcrypt::verify(&payload.password, &password_hash)
        .map_err(|err| ApiError::Internal(format!("Failed to verify password: {err}")))?;
    if !valid {
        return Err(ApiError::Unauthorized);
    }

    let ttl = utils_jwt::parse_expiry(&state.config().jwt_expiry)
        .map_err(|err| ApiError::Internal(err.to_string()))?;
    let token = utils_jwt::sign(&state.config().jwt_secret, user.id, &user.email, ttl)
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    Ok(ResponseJson(ApiResponse::success(LoginResponse {
        token,
        user,
    })))
}

/// Revokes the presented token until its natural expiry.
pub async fn logout(
    State(state): State<AppState>,
    req: Request,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let Some(token) = bearer_token(&req).map(str::to_string) else {
        return Err(ApiError::Unauthorized);
    };

    let expires_at = utils_jwt::decode_unverified(&token)
        .ok()
        .and_then(|claims| DateTime::<Utc>::from_timestamp(claims.exp, 0))
        .unwrap_or_else(Utc::now);

    TokenBlocklist::block(&state.db().conn, &token, expires_at).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Logged out",
    )))
}

use axum::{
    Json,
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use db::models::{
    api_key::ApiKey,
    token_blocklist::TokenBlocklist,
    user::{SYSTEM_BOT_EMAIL, User},
};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::AppState;

/// The authenticated caller, inserted as a request extension by
/// [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

pub fn parse_authorization_bearer(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    let (prefix, rest) = trimmed.split_once(' ')?;
    if !prefix.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = rest.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

pub fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_authorization_bearer)
}

fn reject(status: StatusCode, message: &str) -> Response {
    let response = ApiResponse::<()>::error(message);
    (status, Json(response)).into_response()
}

/// Authentication boundary for the `/api` surface. A missing or revoked token
/// is a 401; a present but invalid token is a 403. The configured system
/// token authenticates as the automation bot account.
pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let Some(token) = bearer_token(&req).map(str::to_string) else {
        return reject(StatusCode::UNAUTHORIZED, "Missing authentication token");
    };

    if let Some(system_token) = state.config().system_token.as_deref()
        && token == system_token
    {
        match User::find_by_email_with_password(&state.db().conn, SYSTEM_BOT_EMAIL).await {
            Ok(Some((bot, _))) => {
                req.extensions_mut().insert(AuthUser {
                    id: bot.id,
                    email: bot.email,
                });
                return next.run(req).await;
            }
            Ok(None) => {
                tracing::error!("System token presented but the bot account does not exist");
                return reject(StatusCode::UNAUTHORIZED, "System account unavailable");
            }
            Err(err) => {
                tracing::error!("Failed to load system bot account: {err}");
                return reject(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
            }
        }
    }

    // A blocklist lookup failure must not lock everyone out.
    match TokenBlocklist::is_blocked(&state.db().conn, &token).await {
        Ok(true) => return reject(StatusCode::UNAUTHORIZED, "Token has been revoked"),
        Ok(false) => {}
        Err(err) => tracing::warn!("Failed to check token blocklist: {err}"),
    }

    match utils_jwt::verify(&state.config().jwt_secret, &token) {
        Ok(claims) => {
            req.extensions_mut().insert(AuthUser {
                id: claims.id,
                email: claims.email,
            });
            next.run(req).await
        }
        Err(_) => reject(StatusCode::FORBIDDEN, "Invalid or expired token"),
    }
}

/// Gate for machine-to-machine routes keyed by `x-api-key`.
pub async fn require_api_key(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(key) = req
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
    else {
        return reject(StatusCode::UNAUTHORIZED, "Missing API key");
    };

    match ApiKey::is_active(&state.db().conn, key).await {
        Ok(true) => next.run(req).await,
        Ok(false) => reject(StatusCode::FORBIDDEN, "Invalid API key"),
        Err(err) => {
            tracing::error!("Failed to validate API key: {err}");
            reject(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_parsing() {
        assert_eq!(parse_authorization_bearer("Bearer abc"), Some("abc"));
        assert_eq!(parse_authorization_bearer("bearer  abc "), Some("abc"));
        assert_eq!(parse_authorization_bearer("Basic abc"), None);
        assert_eq!(parse_authorization_bearer("Bearer "), None);
        assert_eq!(parse_authorization_bearer("abc"), None);
    }
}

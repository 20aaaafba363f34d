use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use db::{DBService, models::user::User};
use serde_json::{Value, json};
use services::services::config::Config;
use tower::ServiceExt;
use uuid::Uuid;

use crate::{AppState, http};

pub const TEST_SYSTEM_TOKEN: &str = "sekrit-system-token";
pub const TEST_PASSWORD: &str = "hunter2!";

fn test_config(database_url: String) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url,
        jwt_secret: "test-secret".to_string(),
        jwt_expiry: "1h".to_string(),
        system_token: Some(TEST_SYSTEM_TOKEN.to_string()),
    }
}

/// Spins up a fresh app backed by a throwaway sqlite file, with the system
/// bot account seeded like `main` does at startup.
pub async fn test_app() -> (AppState, Router) {
    let temp_root = std::env::temp_dir().join(format!("pm-test-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&temp_root).unwrap();
    let db_path = temp_root.join("db.sqlite");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.to_string_lossy());

    let db = DBService::new(&db_url).await.expect("test database");
    let bot_hash = bcrypt::hash("bot-password", 4).expect("hash bot password");
    User::ensure_system_bot(&db.conn, &bot_hash)
        .await
        .expect("seed system bot");

    let state = AppState::new(db, test_config(db_url));
    let app = http::router(state.clone());
    (state, app)
}

pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn response_json(response: Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

pub async fn register_and_login(app: &Router, name: &str, email: &str) -> (String, Uuid) {
    let response = send(
        app,
        json_request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "name": name, "email": email, "password": TEST_PASSWORD })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK, "registration failed");

    let response = send(
        app,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": TEST_PASSWORD })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK, "login failed");

    let body = response_json(response).await;
    let token = body["data"]["token"].as_str().unwrap().to_string();
    let user_id = body["data"]["user"]["id"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    (token, user_id)
}

pub async fn create_project(app: &Router, token: &str, name: &str) -> Value {
    let response = send(
        app,
        json_request(
            "POST",
            "/api/projects",
            Some(token),
            Some(json!({ "name": name })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK, "project creation failed");
    let body = response_json(response).await;
    body["data"].clone()
}

pub async fn create_group(app: &Router, token: &str, name: &str) -> Value {
    let response = send(
        app,
        json_request(
            "POST",
            "/api/groups",
            Some(token),
            Some(json!({ "name": name })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK, "group creation failed");
    let body = response_json(response).await;
    body["data"].clone()
}

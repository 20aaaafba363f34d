use axum::{Router, middleware::from_fn_with_state, routing::get};
use tower_http::trace::TraceLayer;

use crate::{AppState, routes};

pub mod auth;

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .merge(routes::auth::router())
        .merge(routes::users::router())
        .merge(routes::roles::router())
        .merge(routes::projects::router(&state))
        .merge(routes::tasks::router(&state))
        .merge(routes::task_statuses::router())
        .merge(routes::groups::router(&state))
        .layer(from_fn_with_state(state.clone(), auth::require_auth));

    // Read-only surface for external automation, keyed by api key instead of
    // a user token.
    let integrations = Router::new()
        .route(
            "/integrations/task-statuses",
            get(routes::task_statuses::list_statuses),
        )
        .layer(from_fn_with_state(state.clone(), auth::require_api_key));

    let api_routes = routes::auth::public_router()
        .merge(protected)
        .merge(integrations);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

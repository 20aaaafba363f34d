use chrono::Utc;
use db::{DBService, DbErr, models::token_blocklist::TokenBlocklist, models::user::User};
use server::{AppState, http};
use services::services::config::{Config, ConfigError};
use thiserror::Error;
use tracing_subscriber::{EnvFilter, prelude::*};
use uuid::Uuid;

const BLOCKLIST_PRUNE_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60 * 60);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    User(#[from] db::models::user::UserError),
    #[error("failed to hash bot credentials: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter_string = format!(
        "warn,server={level},services={level},db={level},utils={level},utils_jwt={level}",
        level = log_level
    );
    let env_filter = EnvFilter::try_new(filter_string).expect("Failed to create tracing filter");
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .init();

    let config = Config::from_env()?;
    let db = DBService::new(&config.database_url).await?;

    // The bot account backs the system token; nobody logs in with it, so its
    // password is a throwaway.
    let bot_password_hash = bcrypt::hash(Uuid::new_v4().to_string(), bcrypt::DEFAULT_COST)?;
    User::ensure_system_bot(&db.conn, &bot_password_hash).await?;

    let prune_conn = db.conn.clone();
    tokio::spawn(async move {
        loop {
            match TokenBlocklist::prune_expired(&prune_conn, Utc::now()).await {
                Ok(0) => {}
                Ok(removed) => tracing::info!(removed, "Pruned expired blocklist tokens"),
                Err(err) => tracing::warn!(error = %err, "Failed to prune token blocklist"),
            }
            tokio::time::sleep(BLOCKLIST_PRUNE_INTERVAL).await;
        }
    });

    let state = AppState::new(db, config.clone());
    let app_router = http::router(state);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;
    let actual_addr = listener.local_addr()?;
    tracing::info!("Server running on http://{actual_addr}");

    axum::serve(listener, app_router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {err}");
        return;
    }
    tracing::info!("Shutdown signal received, stopping");
}

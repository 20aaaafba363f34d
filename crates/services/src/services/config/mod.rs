use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(String),
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Runtime configuration, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiry: String,
    /// Shared secret that lets trusted automation act as the system bot.
    pub system_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = match std::env::var("PORT") {
            Ok(raw) => raw.parse::<u16>().map_err(|_| ConfigError::Invalid {
                var: "PORT".to_string(),
                reason: format!("'{raw}' is not a port number"),
            })?,
            Err(_) => 3000,
        };
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://data.db?mode=rwc".to_string());
        let jwt_secret = std::env::var("JWT_SECRET")
            .map_err(|_| ConfigError::MissingVar("JWT_SECRET".to_string()))?;
        let jwt_expiry = std::env::var("JWT_EXPIRY").unwrap_or_else(|_| "1h".to_string());
        utils_jwt::parse_expiry(&jwt_expiry).map_err(|err| ConfigError::Invalid {
            var: "JWT_EXPIRY".to_string(),
            reason: err.to_string(),
        })?;
        let system_token = std::env::var("SYSTEM_TOKEN").ok().filter(|t| !t.is_empty());

        Ok(Self {
            host,
            port,
            database_url,
            jwt_secret,
            jwt_expiry,
            system_token,
        })
    }
}

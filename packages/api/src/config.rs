use std::{env, path::PathBuf};

const DEFAULT_SESSION_TTL_HOURS: i64 = 12;
// Matches the browser "remember me" checkbox: two weeks.
const DEFAULT_REMEMBER_ME_TTL_HOURS: i64 = 24 * 14;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// HMAC secret for session tokens
    pub session_secret: String,
    pub session_ttl_hours: i64,
    pub remember_me_ttl_hours: i64,
    /// Root directory for uploaded product images
    pub media_dir: PathBuf,
    /// Bootstrap credentials for the first staff account (see login route)
    pub initial_admin_username: Option<String>,
    pub initial_admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Config {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PORT"))?,
            database_url: env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?,
            session_secret: env::var("SESSION_SECRET").map_err(|_| ConfigError::Missing("SESSION_SECRET"))?,
            session_ttl_hours: env::var("SESSION_TTL_HOURS")
                .unwrap_or_else(|_| DEFAULT_SESSION_TTL_HOURS.to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("SESSION_TTL_HOURS"))?,
            remember_me_ttl_hours: env::var("REMEMBER_ME_TTL_HOURS")
                .unwrap_or_else(|_| DEFAULT_REMEMBER_ME_TTL_HOURS.to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("REMEMBER_ME_TTL_HOURS"))?,
            media_dir: PathBuf::from(env::var("MEDIA_DIR").unwrap_or_else(|_| "media".to_string())),
            initial_admin_username: env::var("INITIAL_ADMIN_USERNAME").ok(),
            initial_admin_password: env::var("INITIAL_ADMIN_PASSWORD").ok(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    Missing(&'static str),
    #[error("Invalid value for: {0}")]
    InvalidValue(&'static str),
}

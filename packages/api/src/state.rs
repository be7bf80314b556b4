use std::sync::Arc;
use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use crate::config::Config;
use crate::session::{SessionClaims, SessionKeys, SessionStore};

pub type AppState = Arc<State>;

pub struct State {
    pub config: Config,
    pub db: DatabaseConnection,
    pub sessions: SessionStore,
    session_keys: SessionKeys,
}

impl State {
    pub async fn new(config: Config) -> Self {
        let mut opt = ConnectOptions::new(config.database_url.clone());
        opt.max_connections(10)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(8))
            .sqlx_logging(false);

        let db = Database::connect(opt)
            .await
            .expect("Failed to connect to database");

        // The cache-level TTL only has to outlive the longest session.
        let max_ttl = Duration::from_secs(
            config.remember_me_ttl_hours.max(config.session_ttl_hours).unsigned_abs() * 3600,
        );
        let sessions = SessionStore::new(max_ttl);
        let session_keys = SessionKeys::new(&config.session_secret);

        Self {
            config,
            db,
            sessions,
            session_keys,
        }
    }

    pub fn issue_session_token(
        &self,
        user_id: &str,
        session_id: &str,
        expires_at: chrono::NaiveDateTime,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        self.session_keys.issue(user_id, session_id, expires_at)
    }

    pub fn validate_session_token(
        &self,
        token: &str,
    ) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
        self.session_keys.validate(token)
    }
}

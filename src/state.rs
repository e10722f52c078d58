use crate::auth::repo::{InMemoryUserRepository, UserRepository};
use crate::config::AppConfig;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepository>,
}

impl AppState {
    pub fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        tracing::info!(
            token_format = ?config.token.format,
            token_ttl_minutes = config.token.ttl_minutes,
            "user directory is in-memory; users are lost on restart"
        );
        let users = Arc::new(InMemoryUserRepository::new()) as Arc<dyn UserRepository>;
        Ok(Self::from_parts(config, users))
    }

    pub fn from_parts(config: Arc<AppConfig>, users: Arc<dyn UserRepository>) -> Self {
        Self { config, users }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::from_parts(
            Arc::new(AppConfig::default()),
            Arc::new(InMemoryUserRepository::new()),
        )
    }
}

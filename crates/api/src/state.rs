use coursedeck_auth::{AuthSession, Authenticator, User};
use coursedeck_config::StorageConfig;
use sqlx::SqlitePool;

use crate::ApiError;

#[derive(Clone)]
pub struct AppState {
    pool: SqlitePool,
    authenticator: Authenticator,
    storage: StorageConfig,
}

impl AppState {
    pub fn new(pool: SqlitePool, authenticator: Authenticator, storage: StorageConfig) -> Self {
        Self {
            pool,
            authenticator,
            storage,
        }
    }

    pub fn db_pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.storage
    }

    pub async fn authenticate(&self, token: &str) -> Result<(User, AuthSession), ApiError> {
        self.authenticator
            .authenticate_token(token)
            .await
            .map_err(ApiError::from)
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<ServiceError> for crate::ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(msg) => crate::ApiError::not_found(msg),
            ServiceError::BadRequest(msg) => crate::ApiError::bad_request(msg),
            ServiceError::Database(db_err) => {
                tracing::error!("database error: {}", db_err);
                crate::ApiError::internal_server_error("Database operation failed")
            }
            ServiceError::Internal(msg) => {
                tracing::error!("internal error: {}", msg);
                crate::ApiError::internal_server_error(msg)
            }
        }
    }
}

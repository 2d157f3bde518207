use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("no credential available, please log in")]
    NoCredential,
    #[error("Invalid token, please log in again")]
    InvalidToken,
    #[error("request rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("credential storage error: {0}")]
    Storage(#[from] std::io::Error),
    #[error("malformed credential file: {0}")]
    Corrupt(#[from] serde_json::Error),
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TkError {
    #[error("Token must not be empty")]
    EmptyToken,
    #[error("Invalid expiration timestamp: {0}")]
    InvalidExpiry(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Timer runtime error: {0}")]
    Runtime(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TkError>;

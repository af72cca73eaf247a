use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatwireError {
    #[error("Invalid command envelope: {0}")]
    Parse(String),

    #[error("Unknown event type")]
    UnknownCommand,

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// The command's target entity is required but absent (e.g. a pending
    /// call that already expired). The message is user-facing as-is.
    #[error("{0}")]
    TargetNotFound(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ChatwireError>;

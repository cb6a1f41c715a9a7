use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Exchange API error: {0}")]
    Exchange(String),

    #[error("Order rejected: HTTP {status}: {body}")]
    OrderRejected { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bot already running")]
    AlreadyRunning,

    #[error("Bot not running")]
    NotRunning,

    #[error("Engine is not accepting commands")]
    EngineUnavailable,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

use thiserror::Error;

use room_negotiation::NegotiationError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Config(#[from] toml::de::Error),
    #[error("invalid signaling message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("log file path \"{0}\" has no file name")]
    InvalidLogFile(String),
    #[error("invalid log level \"{0}\"")]
    InvalidLogLevel(String),
    #[error("logging already initialized: {0}")]
    Logging(String),
    #[error("{0} channel closed")]
    ChannelClosed(&'static str),
    #[error(transparent)]
    Negotiation(#[from] NegotiationError),
}

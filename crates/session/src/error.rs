use thiserror::Error;

/// Failure reported by a [`crate::PreviewTransport`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// 403: another session owns the display.
    #[error("display is owned by another preview session")]
    Conflict,
    /// 404: the server has no active preview for this session.
    #[error("no active preview on the server")]
    NotFound,
    #[error("server responded with status {0}")]
    Status(u16),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() { TransportError::Decode(err.to_string()) } else { TransportError::Network(err.to_string()) }
    }
}

/// Errors surfaced to callers of the coordinator. Cloneable because every
/// caller joined on one pending start receives the same outcome.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("preview already active elsewhere")]
    InUseElsewhere,
    #[error("preview session expired")]
    SessionLost,
    #[error("preview session was stopped")]
    Stopped,
    #[error("preview transport failed: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

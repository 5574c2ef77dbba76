use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("http {status}: {body}")]
    Remote { status: u16, body: String },
    #[error("invalid base url: {0}")]
    BaseUrl(String),
    #[error("response decode failed: {0}")]
    Decode(String),
}

impl RemoteError {
    /// Transient failures worth retrying with backoff; non-retryable 4xx
    /// responses surface to the caller immediately.
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Remote { status, .. } => (500..=599).contains(status),
            Self::BaseUrl(_) | Self::Decode(_) => false,
        }
    }
}

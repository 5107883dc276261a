//! Error types for vyabridge

/// Errors raised by the playback synchronization layer
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Playback descriptor carries no source locator")]
    MissingSource,

    #[error("Playback error on {backend}: {message}")]
    Playback {
        backend: &'static str,
        message: String,
    },

    #[error("Unknown server command: {0}")]
    UnknownCommand(String),

    #[error("Invalid payload for '{event}': {source}")]
    InvalidPayload {
        event: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("No async runtime available to schedule '{0}'")]
    NoRuntime(&'static str),

    #[error("Server link error: {0}")]
    ServerLink(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn playback(backend: &'static str, message: impl Into<String>) -> Self {
        Error::Playback {
            backend,
            message: message.into(),
        }
    }

    pub fn invalid_payload(event: &str, source: serde_json::Error) -> Self {
        Error::InvalidPayload {
            event: event.to_string(),
            source,
        }
    }
}

/// Type Result spécialisé pour vyabridge
pub type Result<T> = std::result::Result<T, Error>;

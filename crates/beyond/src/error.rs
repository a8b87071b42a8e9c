use std::error::Error as StdError;

use beyond_http_server::HttpServerError;

/// Ways a client frame can violate the wire protocol. All of them end the
/// connection that sent the frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(String),
    #[error("message has no `type` field")]
    MissingType,
    #[error("msg type '{0}' is not supported yet")]
    UnsupportedMessageType(String),
    #[error("unsupported websocket frame: {0}")]
    UnsupportedFrame(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum BeyondError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("no event handler registered for key {key}")]
    DispatchMiss { key: String },
    #[error("could not mint a unique event key after {attempts} attempts")]
    KeyspaceExhausted { attempts: usize },
    #[error("invalid route pattern `{pattern}`: {source}")]
    InvalidRoute {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("transport error: {0}")]
    Transport(#[from] HttpServerError),
    #[error("failed to encode update: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("connection closed")]
    Closed,
    #[error("application error: {0}")]
    Application(#[source] Box<dyn StdError + Send + Sync>),
    #[error("invalid config: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("logging setup failed: {0}")]
    Logging(String),
}

impl BeyondError {
    /// Wraps an error raised by application code (handlers, init functions).
    pub fn application(err: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Application(err.into())
    }
}

pub type Result<T, E = BeyondError> = std::result::Result<T, E>;

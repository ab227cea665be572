//! Error types for auth sessions

use thiserror::Error;

/// Main error type for session operations
#[derive(Error, Debug)]
pub enum SessionError {
    /// The external auth client reported a failure
    #[error("Auth client error: {0}")]
    Client(String),

    /// The external auth client rejected initialization
    #[error("Auth client initialization failed: {0}")]
    InitFailed(String),

    /// A session consumer was used without a session in scope
    #[error("{consumer} must be used within an auth session scope")]
    MissingContext {
        /// Name of the consumer that required the session
        consumer: &'static str,
    },

    /// Invalid client configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// HTTP error while fetching configuration
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Operation aborted through its cancellation token
    #[error("Operation cancelled")]
    Cancelled,

    /// Session was disposed and no longer talks to the client
    #[error("Session disposed. Create a new session to continue.")]
    Disposed,

    /// JSON decode error
    #[error("JSON decode error: {0}")]
    JsonDecode(#[from] serde_json::Error),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

impl SessionError {
    /// Create an auth client error
    pub fn client(msg: impl Into<String>) -> Self {
        Self::Client(msg.into())
    }

    /// Create an initialization failure
    pub fn init_failed(msg: impl Into<String>) -> Self {
        Self::InitFailed(msg.into())
    }

    /// Create a missing context error for the named consumer
    #[must_use]
    pub fn missing_context(consumer: &'static str) -> Self {
        Self::MissingContext { consumer }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Whether this error indicates a programming mistake rather than a
    /// runtime condition
    #[must_use]
    pub fn is_programming_error(&self) -> bool {
        matches!(self, Self::MissingContext { .. } | Self::Disposed)
    }
}

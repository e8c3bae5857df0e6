//! Error types for the voice assistant gateway

use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the voice assistant gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (missing credentials, invalid settings)
    #[error("configuration error: {0}")]
    Config(String),

    /// Inbound audio could not be decoded
    #[error("decode error: {0}")]
    Decode(String),

    /// Speech-to-text provider failed
    #[error("transcription provider error: {0}")]
    Transcription(String),

    /// Transcription succeeded but produced no text
    #[error("could not transcribe audio")]
    EmptyTranscript,

    /// Language model provider failed
    #[error("generation provider error: {0}")]
    Generation(String),

    /// Text-to-speech provider failed
    #[error("synthesis provider error: {0}")]
    Synthesis(String),

    /// Lookup store could not be read
    #[error("lookup error: {0}")]
    Lookup(String),

    /// Request exceeded its deadline
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl Error {
    /// Whether the error was caused by the caller's input rather than a
    /// provider or the gateway itself
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::EmptyTranscript)
    }
}

/*!
 * Error types for the subrecon library.
 *
 * This module contains custom error types for the different parts of the
 * translation pipeline, using the thiserror crate for ergonomic error definitions.
 * Reconciliation gaps are deliberately absent: they are recovered inside the
 * engine and only surface as lowered confidence.
 */

use thiserror::Error;

/// Errors that can occur when calling a translation provider
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The account's character quota is used up
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),
}

impl ProviderError {
    /// HTTP-like status associated with this error, when one exists
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ApiError { status_code, .. } => Some(*status_code),
            Self::AuthenticationError(_) => Some(403),
            Self::RateLimitExceeded(_) => Some(429),
            Self::QuotaExceeded(_) => Some(456),
            _ => None,
        }
    }

    /// Whether a retrying adapter may try the same call again
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionError(_) | Self::RateLimitExceeded(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }
}

/// Errors that can occur while reading subtitle content
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubtitleError {
    /// Content failed the SRT pre-flight validation
    #[error("Not a valid SRT file: {0}")]
    InvalidFormat(String),

    /// Content contained no subtitle records at all
    #[error("No subtitle entries found in content")]
    Empty,
}

/// Errors that can occur during translation of a document
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error with subtitle processing
    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    /// The session was cancelled between batches
    #[error("Translation cancelled")]
    Cancelled,

    /// Internal fault in the pipeline
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised by the progress session registry
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// No session exists under this id
    #[error("Session not found: {0}")]
    NotFound(String),

    /// The session already reached a terminal phase
    #[error("Session {session_id} is already {phase}")]
    Terminal {
        /// Session id
        session_id: String,
        /// Terminal phase name
        phase: String,
    },

    /// Another pipeline already drives this session
    #[error("Session {0} already has an active writer")]
    WriterTaken(String),

    /// The requested phase change is not allowed by the state machine
    #[error("Illegal phase transition: {from} -> {to}")]
    IllegalTransition {
        /// Current phase
        from: String,
        /// Requested phase
        to: String,
    },
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from subtitle processing
    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Error from the session registry
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

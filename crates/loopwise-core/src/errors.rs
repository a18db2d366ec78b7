//! Error types for Loopwise

use thiserror::Error;

/// Core errors that can occur in Loopwise
#[derive(Debug, Error)]
pub enum Error {
    #[error("Loop error: {0}")]
    Loop(#[from] LoopError),

    #[error("Market data error: {0}")]
    Market(#[from] MarketError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Errors raised by the APY aggregator and the loop simulator
#[derive(Debug, Error)]
pub enum LoopError {
    #[error("Invalid parameter `{param}`: {message}")]
    InvalidParameter {
        param: &'static str,
        message: String,
    },

    #[error("Collaborator call `{call}` failed: {source}")]
    CollaboratorUnavailable {
        call: &'static str,
        #[source]
        source: MarketError,
    },
}

/// Market-data collaborator errors
#[derive(Debug, Error)]
pub enum MarketError {
    #[error("Market data unavailable for {call}: {reason}")]
    Unavailable { call: &'static str, reason: String },

    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    #[error("Incomplete data for {key}: missing {field}")]
    IncompleteData { key: String, field: &'static str },

    #[error("Market session is closed")]
    SessionClosed,
}

/// Result type alias for Loopwise operations
pub type Result<T> = std::result::Result<T, Error>;

impl LoopError {
    /// Shorthand for an `InvalidParameter` error
    pub fn invalid(param: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            param,
            message: message.into(),
        }
    }

    /// Wrap a failed collaborator call
    pub fn unavailable(call: &'static str, source: MarketError) -> Self {
        Self::CollaboratorUnavailable { call, source }
    }

    /// Get an HTTP-friendly error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidParameter { .. } => "invalid_parameter",
            Self::CollaboratorUnavailable { .. } => "collaborator_unavailable",
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidParameter { .. } => 400,
            Self::CollaboratorUnavailable { .. } => 503,
        }
    }
}

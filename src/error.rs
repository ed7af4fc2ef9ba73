//! Error types for datagen-client
//!
//! This module provides the error taxonomy for the library:
//! - Local validation failures (no network call is made)
//! - Transport and protocol failures reported by the generation service
//! - Stage-tagged job failures (submission, polling, preview)
//! - Stable machine-readable error codes for embedders

use crate::types::FileName;
use thiserror::Error;

/// Result type alias for datagen-client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for datagen-client
///
/// Transport-level variants (`Network`, `Http`, `UnexpectedResponse`) are produced by the
/// service client. The controller wraps them into [`JobError`] at each stage boundary so the
/// caller can tell which part of the job lifecycle failed.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "base_url")
        key: Option<String>,
    },

    /// Input rejected locally before any request was issued
    #[error("invalid {field}: {message}")]
    Validation {
        /// The offending input field (e.g., "domain")
        field: &'static str,
        /// Human-readable reason
        message: String,
    },

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The service answered with a non-success HTTP status
    #[error("service returned HTTP {status}: {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Server-provided detail, or the raw body when none could be extracted
        message: String,
    },

    /// Well-formed transport response that is missing required fields
    #[error("unexpected response from {endpoint}: {reason}")]
    UnexpectedResponse {
        /// Endpoint that produced the response (e.g., "/generate/")
        endpoint: &'static str,
        /// What was wrong with it
        reason: String,
    },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL could not be built or parsed
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Job lifecycle failure tagged with the stage that failed
    #[error("job error: {0}")]
    Job(#[from] JobError),

    /// A submission request is already in flight for this session
    #[error("a generation request is already being submitted")]
    SubmissionInProgress,

    /// The session has ended; no further work is accepted
    #[error("session closed: not accepting new jobs")]
    SessionClosed,

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Stage-tagged job lifecycle errors
#[derive(Debug, Error)]
pub enum JobError {
    /// `/generate/` failed (network or protocol)
    #[error("submission failed: {source}")]
    Submission {
        /// Underlying transport or protocol error
        #[source]
        source: Box<Error>,
    },

    /// `/status` failed while the job was running
    #[error("status poll for {file_name} failed: {source}")]
    Poll {
        /// The job being polled
        file_name: FileName,
        /// Underlying transport or protocol error
        #[source]
        source: Box<Error>,
    },

    /// `/preview` failed after completion (non-fatal for the job)
    #[error("preview for {file_name} failed: {source}")]
    Preview {
        /// The completed job
        file_name: FileName,
        /// Underlying transport or protocol error
        #[source]
        source: Box<Error>,
    },

    /// A state-machine transition was attempted from the wrong state
    #[error("cannot {operation} a job that is {current}")]
    InvalidState {
        /// The transition that was attempted (e.g., "apply status")
        operation: &'static str,
        /// The state that prevents it
        current: String,
    },
}

impl Error {
    /// Create a validation error for the given field
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Error::Validation {
            field,
            message: message.into(),
        }
    }

    /// Create a configuration error for the given key
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }

    /// Machine-readable error code
    ///
    /// Stable across releases; embedders can branch on it without matching variants.
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation { .. } => "validation_error",
            Error::Network(_) => "network_error",
            Error::Http { .. } => "http_error",
            Error::UnexpectedResponse { .. } => "unexpected_response",
            Error::Serialization(_) => "serialization_error",
            Error::InvalidUrl(_) => "invalid_url",
            Error::Io(_) => "io_error",
            Error::Job(e) => match e {
                JobError::Submission { .. } => "submission_error",
                JobError::Poll { .. } => "poll_error",
                JobError::Preview { .. } => "preview_error",
                JobError::InvalidState { .. } => "invalid_state",
            },
            Error::SubmissionInProgress => "submission_in_progress",
            Error::SessionClosed => "session_closed",
            Error::Other(_) => "internal_error",
        }
    }

    /// Returns true when the error was raised locally without touching the network
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }
}

//! Error handling for vidfetch

use crate::extractor::models::{ErrorKind, ExtractedMedia, ExtractionOutcome};
use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// Backend-internal error.
///
/// Never leaves an extractor: [`ExtractorError::kind`] classifies it and the
/// extractor returns it as a `Failure` outcome.
#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status} from {context}")]
    Status { status: StatusCode, context: String },

    #[error("{tool} not found. Please install {tool}")]
    ToolNotFound { tool: &'static str },

    #[error("{tool} failed: {message}")]
    ToolFailed {
        tool: &'static str,
        kind: ErrorKind,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected response: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("No playable formats returned")]
    NoFormats,
}

impl ExtractorError {
    pub fn from_status(status: StatusCode, context: impl Into<String>) -> Self {
        ExtractorError::Status {
            status,
            context: context.into(),
        }
    }

    /// Maps the error onto the closed taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractorError::Network(e) => match e.status() {
                Some(status) => classify_status(status),
                None if e.is_decode() => ErrorKind::NotFound,
                None if e.is_builder() => ErrorKind::Unsupported,
                None => ErrorKind::NetworkError,
            },
            ExtractorError::Status { status, .. } => classify_status(*status),
            ExtractorError::ToolFailed { kind, .. } => *kind,
            ExtractorError::ToolNotFound { .. } => ErrorKind::Unsupported,
            ExtractorError::Io(e) => match e.kind() {
                std::io::ErrorKind::TimedOut
                | std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted
                | std::io::ErrorKind::ConnectionRefused
                | std::io::ErrorKind::BrokenPipe => ErrorKind::NetworkError,
                _ => ErrorKind::Unsupported,
            },
            ExtractorError::Serialization(_) | ExtractorError::NoFormats => ErrorKind::NotFound,
            ExtractorError::NotFound(_) => ErrorKind::NotFound,
            ExtractorError::InvalidUrl(_) | ExtractorError::Unsupported(_) => ErrorKind::Unsupported,
            ExtractorError::RateLimited(_) => ErrorKind::RateLimited,
        }
    }
}

/// HTTP status classification shared by all HTTP backends
pub fn classify_status(status: StatusCode) -> ErrorKind {
    match status.as_u16() {
        401 | 403 | 404 | 410 => ErrorKind::NotFound,
        429 => ErrorKind::RateLimited,
        408 => ErrorKind::NetworkError,
        s if s >= 500 => ErrorKind::NetworkError,
        _ => ErrorKind::Unsupported,
    }
}

impl From<Result<ExtractedMedia, ExtractorError>> for ExtractionOutcome {
    fn from(result: Result<ExtractedMedia, ExtractorError>) -> Self {
        match result {
            Ok(media) => ExtractionOutcome::Success(media),
            Err(e) => ExtractionOutcome::failure(e.kind(), e.to_string()),
        }
    }
}

/// Errors loading [`crate::utils::config::ExtractorSettings`]
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

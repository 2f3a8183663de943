//! Error taxonomy for burnscope analyses.
//!
//! Every failure an analysis run can produce is one of these variants. None of
//! them should terminate the server; the HTTP layer turns each into a
//! user-visible message.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the analysis pipelines.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Malformed input, rejected before any remote call is issued.
    #[error("invalid input: {0}")]
    Validation(String),

    /// A query matched zero qualifying scenes.
    #[error("no cloud-free imagery found for the {period} period")]
    EmptyResult { period: String },

    /// Authentication, quota or backend failure reported by the remote service.
    #[error(
        "remote service error{}: {message}",
        .status.map(|s| format!(" ({s})")).unwrap_or_default()
    )]
    RemoteService {
        status: Option<u16>,
        message: String,
    },

    /// A superseded or aborted artifact could not be removed.
    #[error("failed to remove artifact {}: {source}", .path.display())]
    ResourceCleanup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl AnalysisError {
    /// Shorthand for a validation failure.
    pub fn validation(msg: impl Into<String>) -> Self {
        AnalysisError::Validation(msg.into())
    }

    /// Shorthand for a remote failure without an HTTP status.
    pub fn remote(msg: impl Into<String>) -> Self {
        AnalysisError::RemoteService {
            status: None,
            message: msg.into(),
        }
    }

    /// Stable machine-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::Validation(_) => "validation",
            AnalysisError::EmptyResult { .. } => "empty_result",
            AnalysisError::RemoteService { .. } => "remote_service",
            AnalysisError::ResourceCleanup { .. } => "resource_cleanup",
            AnalysisError::Io(_) => "io",
        }
    }
}

impl From<reqwest::Error> for AnalysisError {
    fn from(e: reqwest::Error) -> Self {
        AnalysisError::RemoteService {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for AnalysisError {
    fn from(e: serde_json::Error) -> Self {
        AnalysisError::remote(format!("malformed response: {e}"))
    }
}

/// Result alias for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

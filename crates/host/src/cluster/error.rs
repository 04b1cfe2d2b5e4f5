//! Cluster error taxonomy

use thiserror::Error;

/// Failure talking to the cluster
///
/// Cloneable so every caller waiting on one login attempt sees the same error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClusterError {
    /// Login rejected or the success marker was missing
    #[error("authentication to {endpoint} failed: {message}")]
    Authentication { endpoint: String, message: String },

    /// The CLI could not run, timed out, or exited non-zero
    #[error("{operation} failed: {message}")]
    Execution {
        operation: &'static str,
        message: String,
    },

    /// The CLI ran but its JSON output could not be understood
    #[error("failed to parse {kind} listing: {message}")]
    Parse { kind: &'static str, message: String },

    /// The manifest could not be written for the CLI to read
    #[error("failed to stage manifest: {0}")]
    Staging(String),
}

impl ClusterError {
    pub(crate) fn execution(operation: &'static str, err: &anyhow::Error) -> Self {
        Self::Execution {
            operation,
            message: format!("{err:#}"),
        }
    }
}

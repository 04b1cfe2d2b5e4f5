//! Error types for manifest generation

use thiserror::Error;

/// A request that cannot be turned into a consistent manifest set.
///
/// Always returned before any document is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid {field} {value:?}: must be a lowercase RFC 1123 subdomain")]
    InvalidName { field: &'static str, value: String },

    #[error("missing required field {0}")]
    MissingField(String),

    #[error("invalid {field} {value}: must be between 1 and 65535")]
    InvalidPort { field: &'static str, value: i32 },

    #[error("storage {0:?} must request at least 1Gi")]
    InvalidStorageSize(String),

    #[error("volume name {0:?} is claimed by more than one source")]
    DuplicateVolume(String),
}

/// Failure while building or rendering manifests
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to serialize manifest: {0}")]
    Serialize(#[from] serde_yaml::Error),
}

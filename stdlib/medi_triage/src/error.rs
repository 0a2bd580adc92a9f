//! Error type shared by every triage component

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while validating input, loading artifacts, or running a request
#[derive(Debug, Error)]
pub enum TriageError {
    #[error("missing required field `{0}`")]
    MissingField(String),
    #[error("invalid value for `{field}`: {reason}")]
    InvalidField { field: String, reason: String },
    #[error("unknown category `{value}` for `{field}` (expected one of: {})", .expected.join(", "))]
    UnknownCategory {
        field: String,
        value: String,
        expected: Vec<String>,
    },
    #[error("failed to load artifact {}: {reason}", .path.display())]
    ArtifactLoad { path: PathBuf, reason: String },
    #[error("invalid artifact: {0}")]
    InvalidArtifact(String),
    #[error("attribution output has unexpected shape: {0}")]
    AttributionShape(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl TriageError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        TriageError::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn artifact(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        TriageError::ArtifactLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// True for errors caused by the patient record rather than the system
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TriageError::MissingField(_)
                | TriageError::InvalidField { .. }
                | TriageError::UnknownCategory { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TriageError>;

//! Error taxonomy for the Sentinel pipeline.
//!
//! Each stage owns its error enum so that failures stay attributable:
//! extraction and comparison failures propagate to the caller, while metric
//! failures are captured as values inside an evaluation and never propagate.

use super::source::SourceId;

/// Errors returned by a [`ModelBackend`](crate::backend::ModelBackend).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed reply: {0}")]
    MalformedReply(String),

    #[error("backend not configured: {0}")]
    NotConfigured(String),
}

/// A required field in a backend reply was absent or unusable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FieldError {
    #[error("missing field {0}")]
    Missing(String),

    #[error("invalid field {field}: {reason}")]
    Invalid { field: String, reason: String },
}

/// Structured extraction against one backend failed.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("backend {backend} failed: {source}")]
    Backend {
        backend: String,
        #[source]
        source: BackendError,
    },

    #[error("missing required field: {field}")]
    MissingField { field: String },

    #[error("invalid value for field {field}: {reason}")]
    InvalidField { field: String, reason: String },
}

/// The agreement judgment between two analyses failed.
#[derive(Debug, thiserror::Error)]
pub enum ComparisonError {
    #[error("judge {backend} failed: {source}")]
    Judge {
        backend: String,
        #[source]
        source: BackendError,
    },

    #[error("judge reply missing field: {field}")]
    MissingField { field: String },

    #[error("invalid value for judge field {field}: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A single quality metric could not produce a score.
#[derive(Debug, thiserror::Error)]
pub enum MetricError {
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("invalid score {score}: {reason}")]
    InvalidScore { score: f64, reason: String },

    #[error("test case missing {field}")]
    MissingInput { field: String },

    #[error("{0}")]
    Failed(String),
}

/// Whole-call failure of a dual run (only under the fail-fast policy).
#[derive(Debug, thiserror::Error)]
pub enum DualRunError {
    #[error("{source_id} extraction failed: {source}")]
    Extraction {
        source_id: SourceId,
        #[source]
        source: ExtractionError,
    },

    #[error("comparison failed: {0}")]
    Comparison(#[from] ComparisonError),
}

impl From<FieldError> for ExtractionError {
    fn from(err: FieldError) -> Self {
        match err {
            FieldError::Missing(field) => ExtractionError::MissingField { field },
            FieldError::Invalid { field, reason } => ExtractionError::InvalidField { field, reason },
        }
    }
}

impl From<FieldError> for ComparisonError {
    fn from(err: FieldError) -> Self {
        match err {
            FieldError::Missing(field) => ComparisonError::MissingField { field },
            FieldError::Invalid { field, reason } => ComparisonError::InvalidField { field, reason },
        }
    }
}

impl From<FieldError> for MetricError {
    fn from(err: FieldError) -> Self {
        MetricError::Failed(err.to_string())
    }
}

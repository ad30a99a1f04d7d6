//! Domain models for Sentinel.
//!
//! Canonical definitions for the pipeline's value objects:
//! - `StructuredResult`: one backend's classification of a log snippet
//! - `SourceId`: stable identity of the local and cloud backends
//! - `TestCase`: an (input, output) pair handed to quality metrics

pub mod analysis;
pub mod case;
pub mod error;
pub mod source;

pub use analysis::{Severity, StructuredResult};
pub use case::{TestCase, INSTALLATION_LOG_CONTEXT};
pub use error::{
    BackendError, ComparisonError, DualRunError, ExtractionError, FieldError, MetricError,
};
pub use source::SourceId;

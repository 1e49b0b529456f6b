//! Error taxonomy for the CHD risk pipeline
//!
//! Library code returns these typed errors; binaries and orchestration code
//! wrap them in `anyhow` with context.

use thiserror::Error;

/// A single rejected field in a prediction request
#[derive(Debug, Clone, PartialEq)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Schema faults raised before a request reaches the pipeline
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Payload could not be decoded into the closed request schema
    /// (unknown field, missing field, wrong type, not JSON)
    #[error("malformed request: {0}")]
    Malformed(String),

    /// One or more fields were outside their plausible range
    #[error("{} field(s) out of range", .0.len())]
    OutOfRange(Vec<FieldViolation>),
}

impl ValidationError {
    /// Human-readable detail lines for the error reply
    pub fn details(&self) -> Vec<String> {
        match self {
            ValidationError::Malformed(msg) => vec![msg.clone()],
            ValidationError::OutOfRange(violations) => {
                violations.iter().map(|v| v.to_string()).collect()
            }
        }
    }
}

/// Faults raised by pipeline stages
#[derive(Error, Debug, PartialEq)]
pub enum PipelineError {
    #[error("missing required column: {0}")]
    MissingColumn(String),

    #[error("row width mismatch: expected {expected}, got {got}")]
    WidthMismatch { expected: usize, got: usize },

    #[error("label count mismatch: {rows} rows, {labels} labels")]
    LabelMismatch { rows: usize, labels: usize },

    #[error("stage has not been fitted")]
    NotFitted,

    #[error("cannot fit on an empty frame")]
    EmptyInput,

    #[error("optimizer hit a singular system at iteration {0}")]
    Singular(usize),
}

/// Deployment-time consistency faults between metadata and pipeline
#[derive(Error, Debug, PartialEq)]
pub enum ContractError {
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("{field} mismatch: metadata declares {metadata:?}, pipeline was trained with {pipeline:?}")]
    Mismatch {
        field: &'static str,
        metadata: Vec<String>,
        pipeline: Vec<String>,
    },

    #[error("version mismatch: metadata {metadata}, pipeline {pipeline}")]
    VersionMismatch { metadata: String, pipeline: String },

    #[error("serialized pipeline has not been fitted")]
    Unfitted,
}

/// Faults in the labeled training data as a whole
#[derive(Error, Debug)]
pub enum DataError {
    #[error("failed to read dataset: {0}")]
    Csv(#[from] csv::Error),

    #[error("dataset is missing column {0}")]
    MissingColumn(String),

    #[error("target column {column} has non-binary value {value}")]
    NonBinaryTarget { column: String, value: f64 },

    #[error("{0}")]
    Insufficient(String),
}

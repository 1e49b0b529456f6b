//! Prediction response, readiness and error reply structures

use serde::{Deserialize, Serialize};

/// Outcome of a single prediction request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionOutcome {
    /// Binary label: 1 when probability >= threshold
    pub prediction: u8,
    /// Estimated probability of 10-year CHD (0.0 - 1.0)
    pub probability: f64,
    /// Decision threshold from the metadata contract
    pub threshold: f64,
    /// Version of the loaded artifact bundle
    pub model_version: String,
    /// ROC-AUC measured on the held-out partition at training time
    pub roc_auc: f64,
}

impl PredictionOutcome {
    /// Apply a decision threshold to a probability
    pub fn label(probability: f64, threshold: f64) -> u8 {
        u8::from(probability >= threshold)
    }
}

/// Readiness probe reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub model_loaded: bool,
    pub model_version: Option<String>,
}

impl HealthStatus {
    pub fn ready(version: &str) -> Self {
        Self {
            status: "ok".to_string(),
            model_loaded: true,
            model_version: Some(version.to_string()),
        }
    }
}

/// Reply sent when a request is rejected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: Vec<String>,
}

impl ErrorResponse {
    pub fn new(error: &str, details: Vec<String>) -> Self {
        Self {
            error: error.to_string(),
            details,
        }
    }
}

//! Request handling independent of the transport
//!
//! Turns request payload bytes into a [`Reply`] and records service metrics.
//! The NATS loop in `main` only moves bytes in and out.

use crate::metrics::ServiceMetrics;
use crate::models::inference::InferenceEngine;
use crate::types::prediction::{ErrorResponse, HealthStatus, PredictionOutcome};
use crate::types::record::RawRecord;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

/// Error code for schema faults in the request body
pub const VALIDATION_ERROR: &str = "validation_error";

/// Error code for faults inside the pipeline
pub const PREDICTION_ERROR: &str = "prediction_error";

/// Outcome of handling one request
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Prediction(PredictionOutcome),
    Health(HealthStatus),
    Rejected(ErrorResponse),
    Failed(ErrorResponse),
}

impl Reply {
    /// JSON body sent back to the requester
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        match self {
            Reply::Prediction(outcome) => encode(outcome),
            Reply::Health(status) => encode(status),
            Reply::Rejected(body) | Reply::Failed(body) => encode(body),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Rejected(_) | Reply::Failed(_))
    }
}

fn encode<T: Serialize>(value: &T) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(value)
}

/// Shared per-process request handler
#[derive(Clone)]
pub struct RequestHandler {
    engine: InferenceEngine,
    metrics: Arc<ServiceMetrics>,
}

impl RequestHandler {
    pub fn new(engine: InferenceEngine, metrics: Arc<ServiceMetrics>) -> Self {
        Self { engine, metrics }
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    pub fn metrics(&self) -> &Arc<ServiceMetrics> {
        &self.metrics
    }

    /// Answer a prediction request body
    pub fn handle_predict(&self, request_id: &str, payload: &[u8]) -> Reply {
        let start = Instant::now();

        let record = match RawRecord::from_json(payload) {
            Ok(record) => record,
            Err(e) => {
                self.metrics.record_rejection(start.elapsed());
                warn!(request_id = %request_id, error = %e, "Rejected prediction request");
                return Reply::Rejected(ErrorResponse::new(VALIDATION_ERROR, e.details()));
            }
        };

        match self.engine.predict(&record) {
            Ok(outcome) => {
                let latency = start.elapsed();
                self.metrics
                    .record_prediction(latency, outcome.probability, outcome.prediction);
                debug!(
                    request_id = %request_id,
                    probability = outcome.probability,
                    prediction = outcome.prediction,
                    latency_us = latency.as_micros() as u64,
                    "Prediction served"
                );
                Reply::Prediction(outcome)
            }
            Err(e) => {
                self.metrics.record_failure();
                error!(request_id = %request_id, error = %e, "Prediction failed");
                Reply::Failed(ErrorResponse::new(PREDICTION_ERROR, vec![format!("{:#}", e)]))
            }
        }
    }

    /// Answer a readiness probe
    pub fn handle_health(&self) -> Reply {
        self.metrics.record_health_check();
        Reply::Health(self.engine.health())
    }
}

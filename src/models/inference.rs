//! Single-record inference against the loaded artifact bundle

use crate::error::{ContractError, PipelineError};
use crate::models::loader::ArtifactBundle;
use crate::types::prediction::{HealthStatus, PredictionOutcome};
use crate::types::record::RawRecord;
use std::sync::Arc;
use tracing::debug;

/// Read-only prediction engine.
///
/// Holds the bundle behind an `Arc`; nothing here mutates it, so the engine
/// is shared freely across concurrent requests.
#[derive(Debug, Clone)]
pub struct InferenceEngine {
    bundle: Arc<ArtifactBundle>,
}

impl InferenceEngine {
    pub fn new(bundle: ArtifactBundle) -> Self {
        Self {
            bundle: Arc::new(bundle),
        }
    }

    pub fn bundle(&self) -> &ArtifactBundle {
        &self.bundle
    }

    pub fn version(&self) -> &str {
        self.bundle.version()
    }

    pub fn threshold(&self) -> f64 {
        self.bundle.metadata().threshold
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus::ready(self.version())
    }

    /// Lay out a record in the contract's `raw_features` order
    pub fn build_row(&self, record: &RawRecord) -> Result<Vec<f64>, ContractError> {
        self.bundle
            .metadata()
            .raw_features
            .iter()
            .map(|name| {
                record.get(name).ok_or_else(|| {
                    ContractError::InvalidMetadata(format!("no request field for {}", name))
                })
            })
            .collect()
    }

    /// Run a validated record through the pipeline and apply the threshold
    pub fn predict(&self, record: &RawRecord) -> anyhow::Result<PredictionOutcome> {
        let row = self.build_row(record)?;
        let probability = self.probability(&row)?;

        let metadata = self.bundle.metadata();
        let prediction = PredictionOutcome::label(probability, metadata.threshold);

        debug!(probability, prediction, threshold = metadata.threshold, "Prediction computed");

        Ok(PredictionOutcome {
            prediction,
            probability,
            threshold: metadata.threshold,
            model_version: metadata.version.clone(),
            roc_auc: metadata.metrics.roc_auc,
        })
    }

    /// Positive-class probability for a row already in contract order
    pub fn probability(&self, row: &[f64]) -> Result<f64, PipelineError> {
        self.bundle.pipeline().predict_proba_row(row)
    }
}

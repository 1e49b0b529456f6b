//! Metadata contract binding training output to serving input

use crate::error::ContractError;
use crate::evaluation::EvaluationMetrics;
use crate::pipeline::ModelPipeline;
use crate::types::record::RAW_FEATURES;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Notes written into every contract
pub const CONTRACT_NOTES: &str =
    "API accepts raw_features only. Pipeline performs feature engineering, scaling, and classification.";

/// Typed form of `metadata.json`.
///
/// `raw_features` is the authoritative input order: serving builds each
/// request row in exactly this order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataContract {
    pub version: String,
    pub target: String,
    pub raw_features: Vec<String>,
    pub engineered_features: Vec<String>,
    pub model_features_scaled: Vec<String>,
    pub model_features_passthrough: Vec<String>,
    pub threshold: f64,
    pub metrics: EvaluationMetrics,
    pub notes: String,
}

fn invalid(msg: String) -> ContractError {
    ContractError::InvalidMetadata(msg)
}

impl MetadataContract {
    /// Describe a fitted pipeline
    pub fn describe(
        pipeline: &ModelPipeline,
        target: &str,
        threshold: f64,
        metrics: EvaluationMetrics,
    ) -> Self {
        Self {
            version: pipeline.version().to_string(),
            target: target.to_string(),
            raw_features: pipeline.input_columns().to_vec(),
            engineered_features: pipeline.engineered_features(),
            model_features_scaled: pipeline.scaler().scaled().to_vec(),
            model_features_passthrough: pipeline.scaler().passthrough().to_vec(),
            threshold,
            metrics,
            notes: CONTRACT_NOTES.to_string(),
        }
    }

    /// Check the document on its own
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.version.trim().is_empty() {
            return Err(invalid("version is empty".to_string()));
        }
        if self.target.trim().is_empty() {
            return Err(invalid("target is empty".to_string()));
        }
        if !self.threshold.is_finite() || !(0.0..=1.0).contains(&self.threshold) {
            return Err(invalid(format!("threshold {} outside [0, 1]", self.threshold)));
        }
        if !(0.0..=1.0).contains(&self.metrics.roc_auc) {
            return Err(invalid(format!("ROC-AUC {} outside [0, 1]", self.metrics.roc_auc)));
        }

        let mut seen = HashSet::new();
        for name in &self.raw_features {
            if !RAW_FEATURES.contains(&name.as_str()) {
                return Err(invalid(format!("unknown raw feature {}", name)));
            }
            if !seen.insert(name.as_str()) {
                return Err(invalid(format!("duplicate raw feature {}", name)));
            }
        }
        if seen.len() != RAW_FEATURES.len() {
            let missing: Vec<&str> = RAW_FEATURES
                .iter()
                .copied()
                .filter(|n| !seen.contains(n))
                .collect();
            return Err(invalid(format!("raw_features missing {:?}", missing)));
        }

        if let Some(shared) = self
            .model_features_scaled
            .iter()
            .find(|n| self.model_features_passthrough.contains(n))
        {
            return Err(invalid(format!("{} is both scaled and passthrough", shared)));
        }

        Ok(())
    }

    /// Check the document against the pipeline it ships with
    pub fn check_against(&self, pipeline: &ModelPipeline) -> Result<(), ContractError> {
        if !pipeline.classifier().is_fitted() {
            return Err(ContractError::Unfitted);
        }
        if self.version != pipeline.version() {
            return Err(ContractError::VersionMismatch {
                metadata: self.version.clone(),
                pipeline: pipeline.version().to_string(),
            });
        }

        let pairs: [(&'static str, &[String], Vec<String>); 4] = [
            ("raw_features", self.raw_features.as_slice(), pipeline.input_columns().to_vec()),
            ("engineered_features", self.engineered_features.as_slice(), pipeline.engineered_features()),
            ("model_features_scaled", self.model_features_scaled.as_slice(), pipeline.scaler().scaled().to_vec()),
            (
                "model_features_passthrough",
                self.model_features_passthrough.as_slice(),
                pipeline.scaler().passthrough().to_vec(),
            ),
        ];
        for (field, declared, trained) in pairs {
            if declared != trained.as_slice() {
                return Err(ContractError::Mismatch {
                    field,
                    metadata: declared.to_vec(),
                    pipeline: trained,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{ClassifierParams, ColumnScaler, Frame};
    use crate::types::record::{RawRecord, TARGET};

    fn metrics() -> EvaluationMetrics {
        EvaluationMetrics {
            accuracy: 0.7,
            recall: 0.6,
            precision: 0.3,
            f1: 0.4,
            roc_auc: 0.72,
        }
    }

    fn raw_columns() -> Vec<String> {
        RAW_FEATURES.iter().map(|s| s.to_string()).collect()
    }

    fn fitted_pipeline() -> ModelPipeline {
        let base = RawRecord::example();
        let rows: Vec<Vec<f64>> = (0..20)
            .map(|i| {
                RAW_FEATURES
                    .iter()
                    .map(|n| base.get(n).unwrap() + if *n == "age" { i as f64 } else { 0.0 })
                    .collect()
            })
            .collect();
        let labels: Vec<u8> = (0..20).map(|i| u8::from(i >= 12)).collect();
        let x = Frame::new(raw_columns(), rows).unwrap();

        let mut pipeline =
            ModelPipeline::new(raw_columns(), ColumnScaler::default(), ClassifierParams::default())
                .with_version("2026-10-19");
        pipeline.fit(&x, &labels).unwrap();
        pipeline
    }

    #[test]
    fn test_describe_is_consistent() {
        let pipeline = fitted_pipeline();
        let meta = MetadataContract::describe(&pipeline, TARGET, 0.5, metrics());

        assert!(meta.validate().is_ok());
        assert!(meta.check_against(&pipeline).is_ok());
        assert_eq!(meta.engineered_features, vec!["smoker_intensity", "pulse_pressure"]);
    }

    #[test]
    fn test_json_field_names() {
        let meta = MetadataContract::describe(&fitted_pipeline(), TARGET, 0.5, metrics());
        let json = serde_json::to_value(&meta).unwrap();

        for key in [
            "version",
            "target",
            "raw_features",
            "engineered_features",
            "model_features_scaled",
            "model_features_passthrough",
            "threshold",
            "metrics",
            "notes",
        ] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(json["metrics"]["ROC-AUC"], 0.72);
    }

    #[test]
    fn test_missing_field_fails_to_parse() {
        let meta = MetadataContract::describe(&fitted_pipeline(), TARGET, 0.5, metrics());
        let mut json = serde_json::to_value(&meta).unwrap();
        json.as_object_mut().unwrap().remove("threshold");

        assert!(serde_json::from_value::<MetadataContract>(json).is_err());
    }

    #[test]
    fn test_reordered_raw_features_rejected_at_load() {
        let pipeline = fitted_pipeline();
        let mut meta = MetadataContract::describe(&pipeline, TARGET, 0.5, metrics());
        meta.raw_features.swap(0, 1);

        // still a valid document on its own
        assert!(meta.validate().is_ok());
        match meta.check_against(&pipeline) {
            Err(ContractError::Mismatch { field, .. }) => assert_eq!(field, "raw_features"),
            other => panic!("expected raw_features mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_version_mismatch() {
        let pipeline = fitted_pipeline();
        let mut meta = MetadataContract::describe(&pipeline, TARGET, 0.5, metrics());
        meta.version = "other".to_string();

        assert!(matches!(
            meta.check_against(&pipeline),
            Err(ContractError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_documents() {
        let base = MetadataContract::describe(&fitted_pipeline(), TARGET, 0.5, metrics());

        let mut meta = base.clone();
        meta.threshold = 1.2;
        assert!(meta.validate().is_err());

        let mut meta = base.clone();
        meta.raw_features.pop();
        assert!(meta.validate().is_err());

        let mut meta = base.clone();
        meta.raw_features[0] = "weight".to_string();
        assert!(meta.validate().is_err());

        let mut meta = base.clone();
        meta.raw_features[1] = meta.raw_features[0].clone();
        assert!(meta.validate().is_err());

        let mut meta = base;
        meta.model_features_passthrough.push("age".to_string());
        assert!(meta.validate().is_err());
    }

    #[test]
    fn test_unfitted_pipeline_rejected() {
        let pipeline =
            ModelPipeline::new(raw_columns(), ColumnScaler::default(), ClassifierParams::default());
        let meta = MetadataContract::describe(&pipeline, TARGET, 0.5, metrics());
        assert_eq!(meta.check_against(&pipeline), Err(ContractError::Unfitted));
    }
}

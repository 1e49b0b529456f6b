//! Feature engineering, preprocessing and classification as one fitted object
//!
//! The [`ModelPipeline`] is what training serializes and serving loads, so
//! the transforms applied at inference are the ones fitted at training.

pub mod classifier;
pub mod features;
pub mod frame;
pub mod scaler;
pub mod split;

pub use classifier::{ClassifierParams, FitSummary, LogisticRegression};
pub use features::{FeatureEngineer, ENGINEERED_FEATURES};
pub use frame::Frame;
pub use scaler::{ColumnScaler, PASSTHROUGH_FEATURES, SCALED_FEATURES};
pub use split::{stratified_split, SplitIndices};

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};

/// Two-phase transform stage.
///
/// `fit` may learn parameters from training data; `transform` is pure and
/// returns a new frame.
pub trait Stage {
    fn fit(&mut self, frame: &Frame) -> Result<(), PipelineError>;

    fn transform(&self, frame: &Frame) -> Result<Frame, PipelineError>;

    fn fit_transform(&mut self, frame: &Frame) -> Result<Frame, PipelineError> {
        self.fit(frame)?;
        self.transform(frame)
    }
}

/// Fitted composition: feature engineer -> column scaler -> classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPipeline {
    version: String,
    input_columns: Vec<String>,
    engineer: FeatureEngineer,
    preprocess: ColumnScaler,
    classifier: LogisticRegression,
}

impl ModelPipeline {
    /// Unfitted pipeline consuming `input_columns` in that exact order
    pub fn new(input_columns: Vec<String>, preprocess: ColumnScaler, params: ClassifierParams) -> Self {
        Self {
            version: String::new(),
            input_columns,
            engineer: FeatureEngineer::new(),
            preprocess,
            classifier: LogisticRegression::new(params),
        }
    }

    /// Stamp the artifact version carried inside the serialized blob
    pub fn with_version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Raw columns the pipeline was built for, in positional order
    pub fn input_columns(&self) -> &[String] {
        &self.input_columns
    }

    pub fn engineered_features(&self) -> Vec<String> {
        self.engineer.feature_names()
    }

    pub fn scaler(&self) -> &ColumnScaler {
        &self.preprocess
    }

    pub fn classifier(&self) -> &LogisticRegression {
        &self.classifier
    }

    /// Fit every stage on the training partition.
    ///
    /// `x` must hold the input columns; anything else is ignored.
    pub fn fit(&mut self, x: &Frame, y: &[u8]) -> Result<FitSummary, PipelineError> {
        let raw = x.select(self.input_columns.as_slice())?;
        let engineered = self.engineer.fit_transform(&raw)?;
        let prepared = self.preprocess.fit_transform(&engineered)?;
        self.classifier.fit(&prepared, y)
    }

    /// Positive-class probability for every row of `x`, selecting input
    /// columns by name
    pub fn predict_proba(&self, x: &Frame) -> Result<Vec<f64>, PipelineError> {
        let raw = x.select(self.input_columns.as_slice())?;
        self.run(&raw)
    }

    /// Positive-class probability for one row given positionally in
    /// [`input_columns`](Self::input_columns) order
    pub fn predict_proba_row(&self, row: &[f64]) -> Result<f64, PipelineError> {
        if row.len() != self.input_columns.len() {
            return Err(PipelineError::WidthMismatch {
                expected: self.input_columns.len(),
                got: row.len(),
            });
        }
        let frame = Frame::single_row(self.input_columns.clone(), row.to_vec())?;
        let proba = self.run(&frame)?;
        proba.first().copied().ok_or(PipelineError::EmptyInput)
    }

    fn run(&self, raw: &Frame) -> Result<Vec<f64>, PipelineError> {
        let engineered = self.engineer.transform(raw)?;
        let prepared = self.preprocess.transform(&engineered)?;
        self.classifier.predict_proba(&prepared)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::record::RAW_FEATURES;

    fn raw_columns() -> Vec<String> {
        RAW_FEATURES.iter().map(|s| s.to_string()).collect()
    }

    fn row(i: usize) -> Vec<f64> {
        let f = i as f64;
        vec![
            (i % 2) as f64,             // sex
            40.0 + (i % 25) as f64,     // age
            1.0 + (i % 4) as f64,       // education_level
            (i % 3 == 0) as u8 as f64,  // current_smoker
            ((i * 7) % 30) as f64,      // cigs_per_day
            0.0,                        // bp_meds
            0.0,                        // prevalent_stroke
            (i % 4 == 0) as u8 as f64,  // prevalent_hypertension
            0.0,                        // diabetes
            180.0 + (i * 13 % 90) as f64,
            110.0 + (i * 11 % 60) as f64,
            70.0 + (i * 5 % 25) as f64,
            21.0 + f * 0.1 % 9.0,
            60.0 + (i * 3 % 30) as f64,
            70.0 + (i * 17 % 40) as f64,
        ]
    }

    fn fitted() -> (ModelPipeline, Frame) {
        let rows: Vec<Vec<f64>> = (0..60).map(row).collect();
        let labels: Vec<u8> = rows.iter().map(|r| u8::from(r[1] > 55.0 || r[10] > 160.0)).collect();
        let x = Frame::new(raw_columns(), rows).unwrap();

        let mut pipeline =
            ModelPipeline::new(raw_columns(), ColumnScaler::default(), ClassifierParams::default());
        pipeline.fit(&x, &labels).unwrap();
        (pipeline, x)
    }

    #[test]
    fn test_fit_then_predict_in_unit_interval() {
        let (pipeline, x) = fitted();
        let proba = pipeline.predict_proba(&x).unwrap();

        assert_eq!(proba.len(), 60);
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_row_and_frame_paths_agree() {
        let (pipeline, x) = fitted();
        let by_frame = pipeline.predict_proba(&x).unwrap();
        let by_row = pipeline.predict_proba_row(&x.values().row(3).to_vec()).unwrap();

        assert_eq!(by_frame[3].to_bits(), by_row.to_bits());
    }

    #[test]
    fn test_row_width_checked() {
        let (pipeline, _) = fitted();
        assert_eq!(
            pipeline.predict_proba_row(&[1.0, 2.0]).unwrap_err(),
            PipelineError::WidthMismatch { expected: 15, got: 2 }
        );
    }

    #[test]
    fn test_bytes_roundtrip_preserves_predictions() {
        let (pipeline, x) = fitted();
        let pipeline = pipeline.with_version("test-1");

        let restored = ModelPipeline::from_bytes(&pipeline.to_bytes().unwrap()).unwrap();
        assert_eq!(restored.version(), "test-1");
        assert_eq!(
            restored.predict_proba(&x).unwrap(),
            pipeline.predict_proba(&x).unwrap()
        );
    }

    #[test]
    fn test_transform_stages_compose_uniformly() {
        let (_, x) = fitted();
        let mut engineer = FeatureEngineer::new();
        let mut scaler = ColumnScaler::default();

        let engineered = engineer.fit_transform(&x).unwrap();
        let prepared = scaler.fit_transform(&engineered).unwrap();
        assert_eq!(prepared.columns(), scaler.output_columns().as_slice());
    }
}

//! Feature engineering stage.
//!
//! Derives computed features from canonical raw columns. The stage is
//! embedded in [`ModelPipeline`](super::ModelPipeline), so training and
//! serving run exactly the same code.

use super::{Frame, Stage};
use crate::error::PipelineError;
use serde::{Deserialize, Serialize};

/// Names of the features this stage appends, in append order
pub const ENGINEERED_FEATURES: [&str; 2] = ["smoker_intensity", "pulse_pressure"];

/// Stateless transformer adding:
///   - `smoker_intensity = current_smoker * cigs_per_day`
///   - `pulse_pressure = systolic_bp - diastolic_bp`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureEngineer;

impl FeatureEngineer {
    pub fn new() -> Self {
        Self
    }

    /// Names of the appended columns
    pub fn feature_names(&self) -> Vec<String> {
        ENGINEERED_FEATURES.iter().map(|s| s.to_string()).collect()
    }
}

impl Stage for FeatureEngineer {
    /// Nothing to learn
    fn fit(&mut self, _frame: &Frame) -> Result<(), PipelineError> {
        Ok(())
    }

    fn transform(&self, frame: &Frame) -> Result<Frame, PipelineError> {
        let smoker = frame.column_view("current_smoker")?;
        let cigs = frame.column_view("cigs_per_day")?;
        let systolic = frame.column_view("systolic_bp")?;
        let diastolic = frame.column_view("diastolic_bp")?;

        let smoker_intensity = &smoker * &cigs;
        let pulse_pressure = &systolic - &diastolic;

        frame
            .with_column("smoker_intensity", smoker_intensity)?
            .with_column("pulse_pressure", pulse_pressure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(rows: Vec<Vec<f64>>) -> Frame {
        let columns = ["current_smoker", "cigs_per_day", "systolic_bp", "diastolic_bp"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        Frame::new(columns, rows).unwrap()
    }

    #[test]
    fn test_engineered_values_exact() {
        let input = frame(vec![
            vec![1.0, 10.0, 135.0, 85.0],
            vec![0.0, 20.0, 121.5, 80.25],
            vec![1.0, 0.0, 100.0, 100.0],
        ]);

        let output = FeatureEngineer::new().transform(&input).unwrap();

        assert_eq!(output.column("smoker_intensity").unwrap(), vec![10.0, 0.0, 0.0]);
        assert_eq!(output.column("pulse_pressure").unwrap(), vec![50.0, 41.25, 0.0]);
    }

    #[test]
    fn test_transform_appends_exactly_two_columns() {
        let input = frame(vec![vec![1.0, 5.0, 120.0, 80.0]]);
        let output = FeatureEngineer::new().transform(&input).unwrap();

        assert_eq!(output.n_cols(), input.n_cols() + 2);
        assert_eq!(&output.columns()[4..], &["smoker_intensity", "pulse_pressure"]);
        // input frame is not mutated
        assert_eq!(input.n_cols(), 4);
    }

    #[test]
    fn test_missing_required_column_is_contract_error() {
        let input = Frame::new(
            vec!["current_smoker".to_string(), "cigs_per_day".to_string()],
            vec![vec![1.0, 3.0]],
        )
        .unwrap();

        assert_eq!(
            FeatureEngineer::new().transform(&input).unwrap_err(),
            PipelineError::MissingColumn("systolic_bp".to_string())
        );
    }

    #[test]
    fn test_fit_is_noop() {
        let input = frame(vec![vec![1.0, 5.0, 120.0, 80.0]]);
        let mut engineer = FeatureEngineer::new();
        engineer.fit(&input).unwrap();
        assert_eq!(engineer, FeatureEngineer::new());
    }
}

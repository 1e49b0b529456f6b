//! Column-wise preprocessing: standardize the scaled group, pass the rest through

use super::{Frame, Stage};
use crate::error::PipelineError;
use ndarray::{s, Array1, Axis};
use serde::{Deserialize, Serialize};

/// Continuous measurements, including both engineered features
pub const SCALED_FEATURES: [&str; 9] = [
    "age",
    "bmi",
    "systolic_bp",
    "diastolic_bp",
    "total_cholesterol",
    "glucose",
    "heart_rate",
    "pulse_pressure",
    "smoker_intensity",
];

/// Binary and ordinal fields used as-is
pub const PASSTHROUGH_FEATURES: [&str; 7] = [
    "sex",
    "education_level",
    "current_smoker",
    "bp_meds",
    "prevalent_stroke",
    "prevalent_hypertension",
    "diabetes",
];

/// Learned per-column statistics of the scaled group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerStats {
    pub means: Array1<f64>,
    pub stds: Array1<f64>,
}

/// Standard scaler over one named group plus passthrough of another.
///
/// Output column order is the scaled group followed by the passthrough
/// group; any other column is dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnScaler {
    scaled: Vec<String>,
    passthrough: Vec<String>,
    stats: Option<ScalerStats>,
}

impl ColumnScaler {
    pub fn new(scaled: Vec<String>, passthrough: Vec<String>) -> Self {
        Self {
            scaled,
            passthrough,
            stats: None,
        }
    }

    pub fn scaled(&self) -> &[String] {
        &self.scaled
    }

    pub fn passthrough(&self) -> &[String] {
        &self.passthrough
    }

    /// Learned statistics, `None` before `fit`
    pub fn stats(&self) -> Option<&ScalerStats> {
        self.stats.as_ref()
    }

    /// Column names of the transformed output, in output order
    pub fn output_columns(&self) -> Vec<String> {
        self.scaled
            .iter()
            .chain(self.passthrough.iter())
            .cloned()
            .collect()
    }
}

impl Default for ColumnScaler {
    fn default() -> Self {
        Self::new(
            SCALED_FEATURES.iter().map(|s| s.to_string()).collect(),
            PASSTHROUGH_FEATURES.iter().map(|s| s.to_string()).collect(),
        )
    }
}

impl Stage for ColumnScaler {
    /// Learn mean and population standard deviation of each scaled column.
    /// Callers pass the training partition only.
    fn fit(&mut self, frame: &Frame) -> Result<(), PipelineError> {
        if frame.is_empty() {
            return Err(PipelineError::EmptyInput);
        }
        // passthrough columns must exist even though nothing is learned from them
        for name in &self.passthrough {
            frame.column_index(name)?;
        }

        let scaled = frame.select(self.scaled.as_slice())?;
        let means = scaled
            .values()
            .mean_axis(Axis(0))
            .ok_or(PipelineError::EmptyInput)?;
        // constant column: leave centered values unscaled
        let stds = scaled
            .values()
            .std_axis(Axis(0), 0.0)
            .mapv_into(|std| if std > f64::EPSILON { std } else { 1.0 });

        self.stats = Some(ScalerStats { means, stds });
        Ok(())
    }

    fn transform(&self, frame: &Frame) -> Result<Frame, PipelineError> {
        let stats = self.stats.as_ref().ok_or(PipelineError::NotFitted)?;

        let columns = self.output_columns();
        let mut values = frame.select(columns.as_slice())?.values().to_owned();
        {
            let mut scaled = values.slice_mut(s![.., ..self.scaled.len()]);
            scaled -= &stats.means;
            scaled /= &stats.stds;
        }

        Frame::from_array(columns, values)
    }
}

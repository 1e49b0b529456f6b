//! Raw subject record: the 15-field input contract of the model

use crate::error::{FieldViolation, ValidationError};
use serde::{Deserialize, Serialize};

/// Canonical raw feature names in training order
pub const RAW_FEATURES: [&str; 15] = [
    "sex",
    "age",
    "education_level",
    "current_smoker",
    "cigs_per_day",
    "bp_meds",
    "prevalent_stroke",
    "prevalent_hypertension",
    "diabetes",
    "total_cholesterol",
    "systolic_bp",
    "diastolic_bp",
    "bmi",
    "heart_rate",
    "glucose",
];

/// Target column of the labeled dataset
pub const TARGET: &str = "ten_year_chd";

/// One subject's measurements.
///
/// The schema is closed: unknown fields and missing fields are rejected at
/// decode time, ranges are checked by [`RawRecord::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRecord {
    /// 0 = female, 1 = male
    pub sex: i64,
    /// Age in years
    pub age: i64,
    /// Ordinal level of formal education
    pub education_level: i64,
    pub current_smoker: i64,
    /// Average cigarettes per day (0 for non-smokers)
    pub cigs_per_day: i64,
    /// On blood pressure medication
    pub bp_meds: i64,
    pub prevalent_stroke: i64,
    pub prevalent_hypertension: i64,
    pub diabetes: i64,
    /// Total cholesterol in mg/dL
    pub total_cholesterol: f64,
    /// Systolic blood pressure in mmHg
    pub systolic_bp: f64,
    /// Diastolic blood pressure in mmHg
    pub diastolic_bp: f64,
    pub bmi: f64,
    /// Beats per minute
    pub heart_rate: i64,
    /// Blood glucose in mg/dL
    pub glucose: f64,
}

impl RawRecord {
    /// Decode a JSON request body and range-check it
    pub fn from_json(payload: &[u8]) -> Result<Self, ValidationError> {
        let record: RawRecord = serde_json::from_slice(payload)
            .map_err(|e| ValidationError::Malformed(e.to_string()))?;
        record.validate()?;
        Ok(record)
    }

    /// Check every field against its plausible range, collecting all violations
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut violations = Vec::new();

        let ints = [
            ("sex", self.sex, 0, 1),
            ("age", self.age, 0, 120),
            ("education_level", self.education_level, 0, 4),
            ("current_smoker", self.current_smoker, 0, 1),
            ("cigs_per_day", self.cigs_per_day, 0, 100),
            ("bp_meds", self.bp_meds, 0, 1),
            ("prevalent_stroke", self.prevalent_stroke, 0, 1),
            ("prevalent_hypertension", self.prevalent_hypertension, 0, 1),
            ("diabetes", self.diabetes, 0, 1),
            ("heart_rate", self.heart_rate, 30, 220),
        ];
        for (field, value, min, max) in ints {
            if value < min || value > max {
                violations.push(FieldViolation {
                    field: field.to_string(),
                    message: format!("must be between {} and {}, got {}", min, max, value),
                });
            }
        }

        let floats = [
            ("total_cholesterol", self.total_cholesterol, 100.0, 800.0),
            ("systolic_bp", self.systolic_bp, 80.0, 250.0),
            ("diastolic_bp", self.diastolic_bp, 40.0, 160.0),
            ("bmi", self.bmi, 10.0, 100.0),
            ("glucose", self.glucose, 40.0, 600.0),
        ];
        for (field, value, min, max) in floats {
            // NaN fails both comparisons, so test containment directly
            if !(min..=max).contains(&value) {
                violations.push(FieldViolation {
                    field: field.to_string(),
                    message: format!("must be between {} and {}, got {}", min, max, value),
                });
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::OutOfRange(violations))
        }
    }

    /// Look up a raw feature by its canonical name
    pub fn get(&self, name: &str) -> Option<f64> {
        let value = match name {
            "sex" => self.sex as f64,
            "age" => self.age as f64,
            "education_level" => self.education_level as f64,
            "current_smoker" => self.current_smoker as f64,
            "cigs_per_day" => self.cigs_per_day as f64,
            "bp_meds" => self.bp_meds as f64,
            "prevalent_stroke" => self.prevalent_stroke as f64,
            "prevalent_hypertension" => self.prevalent_hypertension as f64,
            "diabetes" => self.diabetes as f64,
            "total_cholesterol" => self.total_cholesterol,
            "systolic_bp" => self.systolic_bp,
            "diastolic_bp" => self.diastolic_bp,
            "bmi" => self.bmi,
            "heart_rate" => self.heart_rate as f64,
            "glucose" => self.glucose,
            _ => return None,
        };
        Some(value)
    }

    /// Reference subject used in smoke tests and the predict client
    pub fn example() -> Self {
        Self {
            sex: 1,
            age: 55,
            education_level: 2,
            current_smoker: 1,
            cigs_per_day: 10,
            bp_meds: 0,
            prevalent_stroke: 0,
            prevalent_hypertension: 1,
            diabetes: 0,
            total_cholesterol: 220.0,
            systolic_bp: 135.0,
            diastolic_bp: 85.0,
            bmi: 26.5,
            heart_rate: 72,
            glucose: 90.0,
        }
    }
}

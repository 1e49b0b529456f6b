//! Dataset normalization for training.
//!
//! Loads the raw CSV, renames legacy headers to the canonical snake_case
//! schema, encodes string categories as 0/1, coerces integer columns and
//! drops every incomplete or malformed row. Dropped row counts are reported
//! and logged.
//!
//! Headers outside the schema are reported and left out of the frame. Their
//! cells are never parsed, but an empty one still counts as missing.

use crate::error::DataError;
use crate::pipeline::Frame;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// Legacy header -> canonical column name
pub const RENAME_MAP: [(&str, &str); 16] = [
    ("sex", "sex"),
    ("age", "age"),
    ("education", "education_level"),
    ("currentSmoker", "current_smoker"),
    ("cigsPerDay", "cigs_per_day"),
    ("BPMeds", "bp_meds"),
    ("prevalentStroke", "prevalent_stroke"),
    ("prevalentHyp", "prevalent_hypertension"),
    ("diabetes", "diabetes"),
    ("totChol", "total_cholesterol"),
    ("sysBP", "systolic_bp"),
    ("diaBP", "diastolic_bp"),
    ("BMI", "bmi"),
    ("heartRate", "heart_rate"),
    ("glucose", "glucose"),
    ("TenYearCHD", "ten_year_chd"),
];

/// Columns that must hold whole numbers after encoding
const INTEGER_COLUMNS: [&str; 3] = ["sex", "current_smoker", "bp_meds"];

/// Row counts observed while normalizing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizeReport {
    pub rows_read: usize,
    pub rows_kept: usize,
    /// Rows with at least one empty / NA cell
    pub rows_missing: usize,
    /// Rows with a cell that could not be encoded as a number
    pub rows_malformed: usize,
    /// Source headers absent from the rename map, left out of the frame
    pub unmapped_columns: Vec<String>,
}

impl NormalizeReport {
    pub fn rows_dropped(&self) -> usize {
        self.rows_missing + self.rows_malformed
    }
}

/// Outcome of parsing a single cell
enum Cell {
    Value(f64),
    Missing,
    Malformed,
}

/// Legacy headers are renamed; headers already in canonical form map to
/// themselves
fn canonical_name(header: &str) -> Option<&'static str> {
    RENAME_MAP
        .iter()
        .find(|(legacy, canonical)| *legacy == header || *canonical == header)
        .map(|(_, canonical)| *canonical)
}

fn is_missing(raw: &str) -> bool {
    raw.is_empty() || raw.eq_ignore_ascii_case("na") || raw.eq_ignore_ascii_case("nan")
}

fn parse_cell(column: &str, raw: &str) -> Cell {
    let raw = raw.trim();
    if is_missing(raw) {
        return Cell::Missing;
    }

    let encoded = match (column, raw) {
        ("sex", "M") => Some(1.0),
        ("sex", "F") => Some(0.0),
        ("current_smoker", "Yes") => Some(1.0),
        ("current_smoker", "No") => Some(0.0),
        _ => None,
    };
    let value = match encoded {
        Some(v) => v,
        None => match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => v,
            _ => return Cell::Malformed,
        },
    };

    if INTEGER_COLUMNS.contains(&column) && value.fract() != 0.0 {
        return Cell::Malformed;
    }
    Cell::Value(value)
}

/// Dataset normalizer
pub struct Normalizer;

impl Normalizer {
    /// Normalize a CSV file
    pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<(Frame, NormalizeReport)> {
        let file = File::open(&path)
            .with_context(|| format!("Failed to open dataset: {:?}", path.as_ref()))?;
        Self::from_reader(file)
            .with_context(|| format!("Failed to normalize dataset: {:?}", path.as_ref()))
    }

    /// Normalize CSV content from any reader
    pub fn from_reader<R: Read>(reader: R) -> Result<(Frame, NormalizeReport)> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut report = NormalizeReport::default();
        // `None` marks a source column outside the schema
        let sources: Vec<Option<&'static str>> = csv_reader
            .headers()
            .map_err(DataError::from)?
            .iter()
            .map(|h| {
                let name = canonical_name(h);
                if name.is_none() {
                    report.unmapped_columns.push(h.to_string());
                }
                name
            })
            .collect();
        let columns: Vec<String> = sources.iter().flatten().map(|s| s.to_string()).collect();

        let mut rows = Vec::new();
        for result in csv_reader.records() {
            let record = result.map_err(DataError::from)?;
            report.rows_read += 1;

            let mut row = Vec::with_capacity(columns.len());
            let mut missing = false;
            let mut malformed = false;
            for (source, raw) in sources.iter().zip(record.iter()) {
                match source {
                    Some(column) => match parse_cell(column, raw) {
                        Cell::Value(v) => row.push(v),
                        Cell::Missing => missing = true,
                        Cell::Malformed => malformed = true,
                    },
                    None => missing |= is_missing(raw.trim()),
                }
            }
            if record.len() < sources.len() {
                missing = true;
            }

            if missing {
                report.rows_missing += 1;
            } else if malformed {
                report.rows_malformed += 1;
            } else {
                rows.push(row);
            }
        }
        report.rows_kept = rows.len();

        if !report.unmapped_columns.is_empty() {
            warn!(columns = ?report.unmapped_columns, "Columns not in rename map left out of the dataset");
        }
        info!(
            rows_read = report.rows_read,
            rows_kept = report.rows_kept,
            rows_dropped = report.rows_dropped(),
            rows_missing = report.rows_missing,
            rows_malformed = report.rows_malformed,
            "Dataset normalized"
        );

        let frame = Frame::new(columns, rows)?;
        Ok((frame, report))
    }
}

/// Extract binary labels from the target column
pub fn target_labels(frame: &Frame, target: &str) -> Result<Vec<u8>, DataError> {
    let values = frame
        .column(target)
        .map_err(|_| DataError::MissingColumn(target.to_string()))?;

    values
        .into_iter()
        .map(|v| {
            if v == 0.0 {
                Ok(0)
            } else if v == 1.0 {
                Ok(1)
            } else {
                Err(DataError::NonBinaryTarget {
                    column: target.to_string(),
                    value: v,
                })
            }
        })
        .collect()
}

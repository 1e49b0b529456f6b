//! Type definitions for the CHD risk pipeline

pub mod prediction;
pub mod record;

pub use prediction::{ErrorResponse, HealthStatus, PredictionOutcome};
pub use record::{RawRecord, RAW_FEATURES, TARGET};

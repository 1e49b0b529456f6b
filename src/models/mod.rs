//! Artifact contract, bundle persistence and inference

pub mod inference;
pub mod loader;
pub mod metadata;

pub use inference::InferenceEngine;
pub use loader::ArtifactBundle;
pub use metadata::MetadataContract;

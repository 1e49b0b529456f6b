//! CHD Risk Pipeline Library
//!
//! Trains a class-weighted logistic regression that estimates 10-year
//! coronary heart disease risk, exports it together with a metadata
//! contract, and serves single-subject predictions over NATS.

pub mod config;
pub mod consumer;
pub mod dataset;
pub mod error;
pub mod evaluation;
pub mod handler;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod producer;
pub mod training;
pub mod types;

pub use config::AppConfig;
pub use consumer::RequestConsumer;
pub use handler::{Reply, RequestHandler};
pub use models::{ArtifactBundle, InferenceEngine, MetadataContract};
pub use pipeline::ModelPipeline;
pub use producer::ReplyProducer;
pub use training::{Trainer, TrainingReport};
pub use types::{prediction::PredictionOutcome, record::RawRecord};

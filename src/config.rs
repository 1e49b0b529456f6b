//! Configuration management for training and serving

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Environment variable naming an alternative configuration file
pub const CONFIG_PATH_ENV: &str = "CHD_CONFIG";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub artifacts: ArtifactsConfig,
    pub training: TrainingConfig,
    pub nats: NatsConfig,
    pub service: ServiceConfig,
    pub logging: LoggingConfig,
}

/// Where the artifact bundle lives
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactsConfig {
    /// Directory holding both artifact files
    pub dir: String,
    /// Serialized fitted pipeline
    #[serde(default = "default_pipeline_file")]
    pub pipeline_file: String,
    /// Metadata contract (JSON)
    #[serde(default = "default_metadata_file")]
    pub metadata_file: String,
}

fn default_pipeline_file() -> String {
    "model_pipeline.bin".to_string()
}

fn default_metadata_file() -> String {
    "metadata.json".to_string()
}

impl ArtifactsConfig {
    pub fn pipeline_path(&self) -> PathBuf {
        Path::new(&self.dir).join(&self.pipeline_file)
    }

    pub fn metadata_path(&self) -> PathBuf {
        Path::new(&self.dir).join(&self.metadata_file)
    }
}

/// Offline training configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TrainingConfig {
    /// Raw labeled CSV dataset
    pub data_path: String,
    /// Share of rows held out for evaluation
    #[serde(default = "default_test_size")]
    pub test_size: f64,
    /// Seed of the stratified split
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Decision threshold used for evaluation and persisted for serving
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Optimizer iteration cap
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Inverse regularization strength
    #[serde(default = "default_c")]
    pub c: f64,
    /// Weight of positive (CHD) samples; negatives weigh 1
    #[serde(default = "default_positive_class_weight")]
    pub positive_class_weight: f64,
    /// Artifact version; today's UTC date when unset
    #[serde(default)]
    pub version: Option<String>,
}

fn default_test_size() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

fn default_threshold() -> f64 {
    0.5
}

fn default_max_iter() -> usize {
    2000
}

fn default_tolerance() -> f64 {
    1e-4
}

fn default_c() -> f64 {
    1.0
}

fn default_positive_class_weight() -> f64 {
    10.0
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject answering prediction requests
    pub predict_subject: String,
    /// Subject answering readiness probes
    pub health_subject: String,
}

/// Serving configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Maximum requests processed concurrently
    pub workers: usize,
    /// Seconds between metrics summaries
    #[serde(default = "default_metrics_interval")]
    pub metrics_interval_secs: u64,
}

fn default_metrics_interval() -> u64 {
    30
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from `CHD_CONFIG` or the default path
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path, with `CHD__SECTION__KEY`
    /// environment overrides
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("CHD").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make training or serving meaningless
    pub fn validate(&self) -> Result<()> {
        let t = &self.training;
        if !(t.test_size > 0.0 && t.test_size < 1.0) {
            anyhow::bail!("training.test_size must be in (0, 1), got {}", t.test_size);
        }
        if !(0.0..=1.0).contains(&t.threshold) {
            anyhow::bail!("training.threshold must be in [0, 1], got {}", t.threshold);
        }
        if t.max_iter == 0 {
            anyhow::bail!("training.max_iter must be positive");
        }
        if !(t.c > 0.0 && t.tolerance > 0.0 && t.positive_class_weight > 0.0) {
            anyhow::bail!("training.c, training.tolerance and training.positive_class_weight must be positive");
        }
        if self.service.workers == 0 {
            anyhow::bail!("service.workers must be at least 1");
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            artifacts: ArtifactsConfig {
                dir: "model".to_string(),
                pipeline_file: default_pipeline_file(),
                metadata_file: default_metadata_file(),
            },
            training: TrainingConfig {
                data_path: "data/coronary_disease.csv".to_string(),
                test_size: default_test_size(),
                seed: default_seed(),
                threshold: default_threshold(),
                max_iter: default_max_iter(),
                tolerance: default_tolerance(),
                c: default_c(),
                positive_class_weight: default_positive_class_weight(),
                version: None,
            },
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                predict_subject: "chd.predict".to_string(),
                health_subject: "chd.healthz".to_string(),
            },
            service: ServiceConfig {
                workers: 8,
                metrics_interval_secs: default_metrics_interval(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

/// Install the global tracing subscriber from the logging section.
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&logging.level))
        .context("Invalid log level")?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if logging.format == "json" {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
}

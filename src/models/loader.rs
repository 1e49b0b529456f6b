//! Artifact bundle persistence: fitted pipeline blob + metadata contract

use crate::config::ArtifactsConfig;
use crate::error::ContractError;
use crate::models::metadata::MetadataContract;
use crate::pipeline::ModelPipeline;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Fitted pipeline and the contract describing it.
///
/// Construction always cross-checks the two, so a bundle value is known
/// to be consistent.
#[derive(Debug, Clone)]
pub struct ArtifactBundle {
    pipeline: ModelPipeline,
    metadata: MetadataContract,
}

impl ArtifactBundle {
    pub fn new(pipeline: ModelPipeline, metadata: MetadataContract) -> Result<Self, ContractError> {
        metadata.validate()?;
        metadata.check_against(&pipeline)?;
        Ok(Self { pipeline, metadata })
    }

    pub fn pipeline(&self) -> &ModelPipeline {
        &self.pipeline
    }

    pub fn metadata(&self) -> &MetadataContract {
        &self.metadata
    }

    pub fn version(&self) -> &str {
        &self.metadata.version
    }

    /// Load both artifacts and verify they belong together
    pub fn load(config: &ArtifactsConfig) -> Result<Self> {
        Self::load_from(config.pipeline_path(), config.metadata_path())
    }

    pub fn load_from<P: AsRef<Path>, Q: AsRef<Path>>(pipeline_path: P, metadata_path: Q) -> Result<Self> {
        let pipeline_path = pipeline_path.as_ref();
        let metadata_path = metadata_path.as_ref();

        info!(pipeline = %pipeline_path.display(), metadata = %metadata_path.display(), "Loading artifact bundle");

        let bytes = fs::read(pipeline_path)
            .with_context(|| format!("Failed to read pipeline artifact {:?}", pipeline_path))?;
        let pipeline = ModelPipeline::from_bytes(&bytes)
            .with_context(|| format!("Corrupt pipeline artifact {:?}", pipeline_path))?;

        let text = fs::read_to_string(metadata_path)
            .with_context(|| format!("Failed to read metadata {:?}", metadata_path))?;
        let metadata: MetadataContract = serde_json::from_str(&text)
            .with_context(|| format!("Malformed metadata {:?}", metadata_path))?;

        let bundle = Self::new(pipeline, metadata).context("Artifact contract check failed")?;

        info!(
            version = %bundle.version(),
            threshold = bundle.metadata.threshold,
            roc_auc = bundle.metadata.metrics.roc_auc,
            raw_features = bundle.metadata.raw_features.len(),
            "Artifact bundle loaded"
        );

        Ok(bundle)
    }

    /// Write both artifacts.
    ///
    /// Both files are first written to temporary siblings; only when both
    /// writes succeed are they renamed into place. The previous pipeline is
    /// held as a backup until the metadata lands, so a failed second rename
    /// leaves the old pair (or no pipeline at all) on disk, never a mix.
    pub fn save(&self, config: &ArtifactsConfig) -> Result<()> {
        self.save_to(config.pipeline_path(), config.metadata_path())
    }

    pub fn save_to<P: AsRef<Path>, Q: AsRef<Path>>(&self, pipeline_path: P, metadata_path: Q) -> Result<()> {
        let pipeline_path = pipeline_path.as_ref();
        let metadata_path = metadata_path.as_ref();

        for dir in [pipeline_path.parent(), metadata_path.parent()].into_iter().flatten() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create artifact directory {:?}", dir))?;
            }
        }

        let pipeline_bytes = self
            .pipeline
            .to_bytes()
            .context("Failed to serialize pipeline")?;
        let metadata_json =
            serde_json::to_string_pretty(&self.metadata).context("Failed to serialize metadata")?;

        let pipeline_tmp = sibling(pipeline_path, "tmp");
        let metadata_tmp = sibling(metadata_path, "tmp");
        let pipeline_backup = sibling(pipeline_path, "bak");

        let staged = fs::write(&pipeline_tmp, &pipeline_bytes)
            .and_then(|_| fs::write(&metadata_tmp, metadata_json.as_bytes()));
        if let Err(e) = staged {
            discard(&pipeline_tmp);
            discard(&metadata_tmp);
            return Err(e).context("Failed to stage artifacts");
        }

        let had_previous = pipeline_path.exists();
        if had_previous {
            if let Err(e) = fs::rename(pipeline_path, &pipeline_backup) {
                discard(&pipeline_tmp);
                discard(&metadata_tmp);
                return Err(e).with_context(|| format!("Failed to back up pipeline {:?}", pipeline_path));
            }
        }

        if let Err(e) = fs::rename(&pipeline_tmp, pipeline_path) {
            restore(pipeline_path, &pipeline_backup, had_previous);
            discard(&pipeline_tmp);
            discard(&metadata_tmp);
            return Err(e).with_context(|| format!("Failed to move pipeline into {:?}", pipeline_path));
        }

        if let Err(e) = fs::rename(&metadata_tmp, metadata_path) {
            restore(pipeline_path, &pipeline_backup, had_previous);
            discard(&metadata_tmp);
            return Err(e).with_context(|| format!("Failed to move metadata into {:?}", metadata_path));
        }
        discard(&pipeline_backup);

        info!(
            version = %self.version(),
            pipeline = %pipeline_path.display(),
            metadata = %metadata_path.display(),
            "Artifact bundle written"
        );
        Ok(())
    }
}

/// `path` with `.<suffix>` appended to its file name
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

/// Undo a half-finished swap: put the backed-up pipeline back, or remove
/// the new one when nothing was there before
fn restore(pipeline_path: &Path, backup: &Path, had_previous: bool) {
    let result = if had_previous {
        fs::rename(backup, pipeline_path)
    } else if pipeline_path.exists() {
        fs::remove_file(pipeline_path)
    } else {
        Ok(())
    };
    if let Err(e) = result {
        warn!(path = %pipeline_path.display(), error = %e, "Failed to roll back pipeline artifact");
    }
}

fn discard(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            warn!(path = %path.display(), error = %e, "Failed to remove staged artifact");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::EvaluationMetrics;
    use crate::pipeline::{ClassifierParams, ColumnScaler, Frame};
    use crate::types::record::{RawRecord, RAW_FEATURES, TARGET};

    fn bundle(version: &str) -> ArtifactBundle {
        let columns: Vec<String> = RAW_FEATURES.iter().map(|s| s.to_string()).collect();
        let base = RawRecord::example();
        let rows: Vec<Vec<f64>> = (0..16)
            .map(|i| {
                RAW_FEATURES
                    .iter()
                    .map(|n| base.get(n).unwrap() + if *n == "glucose" { (i * 5) as f64 } else { 0.0 })
                    .collect()
            })
            .collect();
        let labels: Vec<u8> = (0..16).map(|i| u8::from(i % 4 == 3)).collect();

        let mut pipeline =
            ModelPipeline::new(columns.clone(), ColumnScaler::default(), ClassifierParams::default())
                .with_version(version);
        pipeline
            .fit(&Frame::new(columns, rows).unwrap(), &labels)
            .unwrap();

        let metrics = EvaluationMetrics {
            accuracy: 0.5,
            recall: 0.5,
            precision: 0.5,
            f1: 0.5,
            roc_auc: 0.6,
        };
        let metadata = MetadataContract::describe(&pipeline, TARGET, 0.5, metrics);
        ArtifactBundle::new(pipeline, metadata).unwrap()
    }

    fn config(dir: &Path) -> ArtifactsConfig {
        ArtifactsConfig {
            dir: dir.to_string_lossy().into_owned(),
            pipeline_file: "model_pipeline.bin".to_string(),
            metadata_file: "metadata.json".to_string(),
        }
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir.path().join("model"));
        let original = bundle("v1");

        original.save(&config).unwrap();
        let loaded = ArtifactBundle::load(&config).unwrap();

        assert_eq!(loaded.version(), "v1");
        assert_eq!(loaded.metadata(), original.metadata());
        assert_eq!(loaded.pipeline(), original.pipeline());
        assert!(!sibling(&config.pipeline_path(), "tmp").exists());
        assert!(!sibling(&config.pipeline_path(), "bak").exists());
    }

    /// Occupy the metadata path with a directory so renaming onto it fails
    fn block_metadata(config: &ArtifactsConfig) {
        let path = config.metadata_path();
        if path.exists() {
            fs::remove_file(&path).unwrap();
        }
        fs::create_dir_all(path.join("occupied")).unwrap();
    }

    #[test]
    fn test_failed_metadata_move_restores_previous_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        bundle("v1").save(&config).unwrap();
        block_metadata(&config);

        let err = bundle("v2").save(&config).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to move metadata"));

        let kept = ModelPipeline::from_bytes(&fs::read(config.pipeline_path()).unwrap()).unwrap();
        assert_eq!(kept.version(), "v1");
        assert!(!sibling(&config.pipeline_path(), "bak").exists());
        assert!(!sibling(&config.pipeline_path(), "tmp").exists());
        assert!(!sibling(&config.metadata_path(), "tmp").exists());
    }

    #[test]
    fn test_failed_first_save_leaves_no_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        block_metadata(&config);

        assert!(bundle("v1").save(&config).is_err());
        assert!(!config.pipeline_path().exists());
        assert!(ArtifactBundle::load(&config).is_err());
    }

    #[test]
    fn test_missing_artifact_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = ArtifactBundle::load(&config(dir.path())).unwrap_err();
        assert!(err.to_string().contains("Failed to read pipeline artifact"));
    }

    #[test]
    fn test_corrupt_pipeline_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        bundle("v1").save(&config).unwrap();
        fs::write(config.pipeline_path(), b"not a pipeline").unwrap();

        assert!(ArtifactBundle::load(&config).is_err());
    }

    #[test]
    fn test_mismatched_pair_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        bundle("v1").save(&config).unwrap();

        // metadata from a different training run
        let other = bundle("v2");
        fs::write(
            config.metadata_path(),
            serde_json::to_string(other.metadata()).unwrap(),
        )
        .unwrap();

        let err = ArtifactBundle::load(&config).unwrap_err();
        assert!(format!("{:#}", err).contains("version mismatch"));
    }

    #[test]
    fn test_reordered_metadata_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let original = bundle("v1");
        original.save(&config).unwrap();

        let mut metadata = original.metadata().clone();
        metadata.raw_features.reverse();
        fs::write(config.metadata_path(), serde_json::to_string(&metadata).unwrap()).unwrap();

        let err = ArtifactBundle::load(&config).unwrap_err();
        assert!(format!("{:#}", err).contains("raw_features mismatch"));
    }
}

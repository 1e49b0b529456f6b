//! Offline training run: normalize, split, fit, evaluate, export

use crate::config::{AppConfig, ArtifactsConfig, TrainingConfig};
use crate::dataset::{target_labels, NormalizeReport, Normalizer};
use crate::evaluation::{ConfusionMatrix, EvaluationMetrics};
use crate::models::loader::ArtifactBundle;
use crate::models::metadata::MetadataContract;
use crate::pipeline::{stratified_split, ClassifierParams, ColumnScaler, FitSummary, Frame, ModelPipeline};
use crate::types::record::{RAW_FEATURES, TARGET};
use anyhow::{Context, Result};
use tracing::{info, warn};

/// Everything a human needs to judge a fresh artifact before deploying it
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub version: String,
    pub normalize: NormalizeReport,
    pub train_rows: usize,
    pub test_rows: usize,
    pub fit: FitSummary,
    pub metrics: EvaluationMetrics,
    pub confusion: ConfusionMatrix,
    /// Learned weight per modeled feature, in model column order
    pub coefficients: Vec<(String, f64)>,
    pub intercept: f64,
}

pub struct Trainer {
    training: TrainingConfig,
    artifacts: ArtifactsConfig,
}

impl Trainer {
    pub fn new(config: &AppConfig) -> Self {
        Self::from_parts(config.training.clone(), config.artifacts.clone())
    }

    pub fn from_parts(training: TrainingConfig, artifacts: ArtifactsConfig) -> Self {
        Self {
            training,
            artifacts,
        }
    }

    /// Run the whole pipeline and write both artifacts.
    ///
    /// Nothing is written unless every earlier step succeeded.
    pub fn run(&self) -> Result<TrainingReport> {
        info!(data = %self.training.data_path, "Starting training run");

        let (frame, normalize) = Normalizer::load_csv(&self.training.data_path)?;
        let (bundle, report) = self.fit(&frame, normalize)?;

        bundle
            .save(&self.artifacts)
            .context("Failed to export artifact bundle")?;

        info!(
            version = %report.version,
            dir = %self.artifacts.dir,
            "Training run complete"
        );
        Ok(report)
    }

    /// Fit and evaluate on an already normalized frame, without touching disk
    pub fn fit(&self, frame: &Frame, normalize: NormalizeReport) -> Result<(ArtifactBundle, TrainingReport)> {
        let cfg = &self.training;

        let x = frame
            .select(&RAW_FEATURES[..])
            .context("Dataset is missing raw feature columns")?;
        let y = target_labels(frame, TARGET)?;

        let split = stratified_split(&y, cfg.test_size, cfg.seed)?;
        let x_train = x.take_rows(&split.train);
        let x_test = x.take_rows(&split.test);
        let y_train: Vec<u8> = split.train.iter().map(|&i| y[i]).collect();
        let y_test: Vec<u8> = split.test.iter().map(|&i| y[i]).collect();

        info!(
            train_rows = split.train.len(),
            test_rows = split.test.len(),
            train_positives = y_train.iter().filter(|&&v| v == 1).count(),
            test_positives = y_test.iter().filter(|&&v| v == 1).count(),
            seed = cfg.seed,
            "Stratified split"
        );

        let version = self.version();
        let params = ClassifierParams {
            c: cfg.c,
            positive_class_weight: cfg.positive_class_weight,
            max_iter: cfg.max_iter,
            tolerance: cfg.tolerance,
        };
        let columns: Vec<String> = RAW_FEATURES.iter().map(|s| s.to_string()).collect();
        let mut pipeline =
            ModelPipeline::new(columns, ColumnScaler::default(), params).with_version(&version);

        let fit = pipeline
            .fit(&x_train, &y_train)
            .context("Failed to fit pipeline")?;
        if fit.converged {
            info!(iterations = fit.iterations, loss = fit.final_loss, "Classifier converged");
        } else {
            warn!(
                iterations = fit.iterations,
                max_iter = cfg.max_iter,
                loss = fit.final_loss,
                "Classifier did not converge within the iteration cap; review metrics before deploying"
            );
        }

        let probabilities = pipeline
            .predict_proba(&x_test)
            .context("Failed to score test partition")?;
        let (metrics, confusion) = EvaluationMetrics::evaluate(&y_test, &probabilities, cfg.threshold);

        info!(
            accuracy = metrics.accuracy,
            recall = metrics.recall,
            precision = metrics.precision,
            f1 = metrics.f1,
            roc_auc = metrics.roc_auc,
            threshold = cfg.threshold,
            "Test partition metrics"
        );
        info!(
            tp = confusion.tp,
            tn = confusion.tn,
            fp = confusion.fp,
            fn_ = confusion.fn_,
            "Confusion matrix"
        );

        let coefficients: Vec<(String, f64)> = pipeline
            .scaler()
            .output_columns()
            .into_iter()
            .zip(pipeline.classifier().coefficients().into_iter().flatten().copied())
            .collect();
        for (feature, weight) in &coefficients {
            info!(feature = %feature, weight = *weight, "Coefficient");
        }
        let intercept = pipeline.classifier().intercept().unwrap_or_default();

        let metadata = MetadataContract::describe(&pipeline, TARGET, cfg.threshold, metrics.clone());
        let bundle = ArtifactBundle::new(pipeline, metadata).context("Fitted pipeline failed its own contract")?;

        let report = TrainingReport {
            version,
            normalize,
            train_rows: split.train.len(),
            test_rows: split.test.len(),
            fit,
            metrics,
            confusion,
            coefficients,
            intercept,
        };
        Ok((bundle, report))
    }

    fn version(&self) -> String {
        match &self.training.version {
            Some(v) if !v.trim().is_empty() => v.clone(),
            _ => chrono::Utc::now().format("%Y-%m-%d").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Stage, SCALED_FEATURES};
    use crate::types::record::RawRecord;

    fn frame(n: usize) -> Frame {
        let mut columns: Vec<String> = RAW_FEATURES.iter().map(|s| s.to_string()).collect();
        columns.push(TARGET.to_string());

        let base = RawRecord::example();
        let rows = (0..n)
            .map(|i| {
                let positive = i % 4 == 0;
                let mut row: Vec<f64> = RAW_FEATURES
                    .iter()
                    .map(|name| match *name {
                        "age" => 40.0 + (i % 25) as f64 + if positive { 8.0 } else { 0.0 },
                        "systolic_bp" => 115.0 + (i % 30) as f64 + if positive { 15.0 } else { 0.0 },
                        "glucose" => 75.0 + (i % 17) as f64,
                        "cigs_per_day" => (i % 3 * 5) as f64,
                        _ => base.get(name).unwrap(),
                    })
                    .collect();
                row.push(if positive { 1.0 } else { 0.0 });
                row
            })
            .collect();
        Frame::new(columns, rows).unwrap()
    }

    fn trainer(version: Option<&str>) -> Trainer {
        let mut config = AppConfig::default();
        config.training.version = version.map(|v| v.to_string());
        Trainer::new(&config)
    }

    #[test]
    fn test_fit_produces_consistent_bundle() {
        let (bundle, report) = trainer(Some("t1"))
            .fit(&frame(80), NormalizeReport::default())
            .unwrap();

        assert_eq!(bundle.version(), "t1");
        assert_eq!(report.train_rows + report.test_rows, 80);
        assert_eq!(report.test_rows, 16);
        assert_eq!(report.coefficients.len(), 16);
        assert_eq!(report.coefficients[0].0, SCALED_FEATURES[0]);
        assert_eq!(bundle.metadata().threshold, 0.5);
        assert_eq!(bundle.metadata().metrics, report.metrics);
        assert!(report.metrics.roc_auc > 0.5);
    }

    #[test]
    fn test_fit_is_reproducible() {
        let data = frame(60);
        let (a, _) = trainer(Some("same")).fit(&data, NormalizeReport::default()).unwrap();
        let (b, _) = trainer(Some("same")).fit(&data, NormalizeReport::default()).unwrap();

        assert_eq!(a.pipeline(), b.pipeline());
        assert_eq!(a.metadata(), b.metadata());
    }

    #[test]
    fn test_scaler_fitted_on_train_partition_only() {
        let data = frame(60);
        let (bundle, _) = trainer(Some("t")).fit(&data, NormalizeReport::default()).unwrap();

        let labels = target_labels(&data, TARGET).unwrap();
        let split = stratified_split(&labels, 0.2, 42).unwrap();
        let train = data.select(&RAW_FEATURES[..]).unwrap().take_rows(&split.train);

        let mut scaler = ColumnScaler::default();
        scaler
            .fit(&crate::pipeline::FeatureEngineer::new().transform(&train).unwrap())
            .unwrap();

        assert_eq!(bundle.pipeline().scaler().stats(), scaler.stats());
    }

    #[test]
    fn test_default_version_is_utc_date() {
        let version = trainer(None).version();
        assert_eq!(version.len(), 10);
        assert_eq!(&version[4..5], "-");
    }

    #[test]
    fn test_missing_target_is_error() {
        let data = frame(20).select(&RAW_FEATURES[..]).unwrap();
        assert!(trainer(Some("t")).fit(&data, NormalizeReport::default()).is_err());
    }

    #[test]
    fn test_run_writes_both_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("data.csv");

        let data = frame(40);
        let mut writer = csv::Writer::from_path(&csv_path).unwrap();
        writer.write_record(data.columns()).unwrap();
        for row in data.values().outer_iter() {
            writer
                .write_record(row.iter().map(|v| v.to_string()))
                .unwrap();
        }
        writer.flush().unwrap();

        let mut config = AppConfig::default();
        config.training.data_path = csv_path.to_string_lossy().into_owned();
        config.training.version = Some("run-test".to_string());
        config.artifacts.dir = dir.path().join("model").to_string_lossy().into_owned();

        let report = Trainer::new(&config).run().unwrap();
        assert_eq!(report.normalize.rows_kept, 40);

        let loaded = ArtifactBundle::load(&config.artifacts).unwrap();
        assert_eq!(loaded.version(), "run-test");
    }
}

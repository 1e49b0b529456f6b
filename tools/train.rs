//! Offline Training Run
//!
//! Normalizes the labeled dataset, fits the pipeline on the training
//! partition, evaluates it on the held-out partition and writes the
//! artifact bundle.
//!
//! Usage: train [data_path] [artifact_dir]

use anyhow::Result;
use chd_risk_pipeline::config::{init_tracing, AppConfig};
use chd_risk_pipeline::training::Trainer;
use tracing::{info, warn};

fn main() -> Result<()> {
    let mut config = AppConfig::load()?;
    init_tracing(&config.logging)?;

    let args: Vec<String> = std::env::args().collect();
    if let Some(data_path) = args.get(1) {
        config.training.data_path = data_path.clone();
    }
    if let Some(dir) = args.get(2) {
        config.artifacts.dir = dir.clone();
    }

    info!(
        data_path = %config.training.data_path,
        artifact_dir = %config.artifacts.dir,
        test_size = config.training.test_size,
        seed = config.training.seed,
        threshold = config.training.threshold,
        "Configuration loaded"
    );

    let report = Trainer::new(&config).run()?;

    if !report.fit.converged {
        warn!("Model did not converge; artifacts were written but should be reviewed");
    }

    println!("Model version:   {}", report.version);
    println!(
        "Rows:            {} read, {} kept, {} dropped",
        report.normalize.rows_read,
        report.normalize.rows_kept,
        report.normalize.rows_dropped()
    );
    println!("Partitions:      {} train, {} test", report.train_rows, report.test_rows);
    println!(
        "Converged:       {} ({} iterations)",
        report.fit.converged, report.fit.iterations
    );
    println!("Accuracy:        {:.4}", report.metrics.accuracy);
    println!("Recall:          {:.4}", report.metrics.recall);
    println!("Precision:       {:.4}", report.metrics.precision);
    println!("F1-score:        {:.4}", report.metrics.f1);
    println!("ROC-AUC:         {:.4}", report.metrics.roc_auc);
    println!("Intercept:       {:+.4}", report.intercept);
    for (feature, weight) in &report.coefficients {
        println!("  {:<24} {:+.4}", feature, weight);
    }

    Ok(())
}

//! Prediction Client
//!
//! Generates plausible subject records and sends them to the CHD risk
//! service as NATS requests, logging every reply.
//!
//! Usage: predict_client [nats_url] [subject] [count] [delay_ms]

use chd_risk_pipeline::types::record::RawRecord;
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

/// Random subject generator
struct RecordGenerator {
    rng: rand::rngs::ThreadRng,
}

impl RecordGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    /// Generate a record within the accepted request ranges
    fn generate(&mut self) -> RawRecord {
        let current_smoker = i64::from(self.rng.gen_bool(0.5));
        let systolic_bp: f64 = round1(self.rng.gen_range(95.0..200.0));
        let diastolic_bp = round1((systolic_bp - self.rng.gen_range(25.0..70.0)).max(50.0));

        RawRecord {
            sex: self.rng.gen_range(0..=1),
            age: self.rng.gen_range(32..=70),
            education_level: self.rng.gen_range(1..=4),
            current_smoker,
            cigs_per_day: if current_smoker == 1 {
                self.rng.gen_range(1..=40)
            } else {
                0
            },
            bp_meds: i64::from(self.rng.gen_bool(0.03)),
            prevalent_stroke: i64::from(self.rng.gen_bool(0.01)),
            prevalent_hypertension: i64::from(self.rng.gen_bool(0.3)),
            diabetes: i64::from(self.rng.gen_bool(0.03)),
            total_cholesterol: round1(self.rng.gen_range(150.0..320.0)),
            systolic_bp,
            diastolic_bp,
            bmi: round1(self.rng.gen_range(18.0..40.0)),
            heart_rate: self.rng.gen_range(50..=110),
            glucose: round1(self.rng.gen_range(60.0..140.0)),
        }
    }
}

/// Round to one decimal place
fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("predict_client=info".parse()?),
        )
        .init();

    info!("Starting Prediction Client");

    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("chd.predict");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(20);
    let delay_ms: u64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, delay_ms).await;
        }
    };

    let mut generator = RecordGenerator::new();
    let mut positives = 0;
    let mut errors = 0;

    for i in 0..count {
        // first request is always the reference subject
        let record = if i == 0 {
            RawRecord::example()
        } else {
            generator.generate()
        };
        let payload = serde_json::to_vec(&record)?;

        match client.request(subject.to_string(), payload.into()).await {
            Ok(reply) => {
                let body: serde_json::Value = serde_json::from_slice(&reply.payload)?;
                if body.get("error").is_some() {
                    errors += 1;
                    warn!(request = i + 1, reply = %body, "Request rejected");
                } else {
                    if body["prediction"] == 1 {
                        positives += 1;
                    }
                    info!(
                        request = i + 1,
                        age = record.age,
                        systolic_bp = record.systolic_bp,
                        probability = %body["probability"],
                        prediction = %body["prediction"],
                        model_version = %body["model_version"],
                        "Prediction received"
                    );
                }
            }
            Err(e) => {
                errors += 1;
                warn!(request = i + 1, error = %e, "Request failed");
            }
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!(
        "Completed! Sent {} requests ({} positive, {} errors)",
        count, positives, errors
    );

    Ok(())
}

async fn run_dry_mode(count: u64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = RecordGenerator::new();

    for i in 0..count {
        let record = if i == 0 {
            RawRecord::example()
        } else {
            generator.generate()
        };
        if let Err(e) = record.validate() {
            warn!(error = %e, details = ?e.details(), "Generated record is out of range");
        }

        let json = serde_json::to_string_pretty(&record)?;

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample request {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}

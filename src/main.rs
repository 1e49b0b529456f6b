//! CHD Risk Service - Main Entry Point
//!
//! Loads the artifact bundle once, then answers prediction requests and
//! readiness probes over NATS request/reply.

use anyhow::{Context, Result};
use chd_risk_pipeline::{
    config::{init_tracing, AppConfig},
    consumer::RequestConsumer,
    handler::RequestHandler,
    metrics::{MetricsReporter, ServiceMetrics},
    models::{loader::ArtifactBundle, inference::InferenceEngine},
    producer::ReplyProducer,
};
use futures::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info};
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config.logging)?;

    info!("Starting CHD Risk Service");

    // No model, no service: any load fault ends the process here
    let bundle = ArtifactBundle::load(&config.artifacts).context("Failed to load artifact bundle")?;
    let engine = InferenceEngine::new(bundle);
    info!(
        version = %engine.version(),
        threshold = engine.threshold(),
        "Inference engine ready"
    );

    let metrics = Arc::new(ServiceMetrics::new());
    let handler = RequestHandler::new(engine, metrics.clone());

    // Connect to NATS
    let client = async_nats::connect(&config.nats.url)
        .await
        .with_context(|| format!("Failed to connect to NATS at {}", config.nats.url))?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = RequestConsumer::new(
        client.clone(),
        &config.nats.predict_subject,
        &config.nats.health_subject,
    );
    let producer = ReplyProducer::new(client.clone());

    // Readiness probes
    let mut health = consumer.subscribe_health().await?;
    let health_handler = handler.clone();
    let health_producer = producer.clone();
    tokio::spawn(async move {
        while let Some(message) = health.next().await {
            let reply = health_handler.handle_health();
            match reply.to_bytes() {
                Ok(payload) => {
                    if let Err(e) = health_producer.reply(message.reply, payload).await {
                        error!(error = %e, "Failed to answer readiness probe");
                    }
                }
                Err(e) => error!(error = %e, "Failed to encode readiness reply"),
            }
        }
    });

    let num_workers = config.service.workers;
    info!(
        workers = num_workers,
        predict_subject = %consumer.predict_subject(),
        health_subject = %consumer.health_subject(),
        "Starting request loop"
    );

    // Semaphore to limit concurrent processing
    let semaphore = Arc::new(Semaphore::new(num_workers));
    let handled_count = Arc::new(AtomicU64::new(0));

    let reporter = MetricsReporter::new(metrics.clone(), config.service.metrics_interval_secs);
    tokio::spawn(reporter.start());

    let mut subscription = consumer.subscribe_predict().await?;

    while let Some(message) = subscription.next().await {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                error!(error = %e, "Worker semaphore closed");
                break;
            }
        };

        let handler = handler.clone();
        let producer = producer.clone();
        let metrics = metrics.clone();
        let handled_count = handled_count.clone();

        tokio::spawn(async move {
            let request_id = Uuid::new_v4().to_string();
            let reply = handler.handle_predict(&request_id, &message.payload);

            match reply.to_bytes() {
                Ok(payload) => {
                    if let Err(e) = producer.reply(message.reply, payload).await {
                        error!(request_id = %request_id, error = %e, "Failed to publish reply");
                    }
                }
                Err(e) => error!(request_id = %request_id, error = %e, "Failed to encode reply"),
            }

            let count = handled_count.fetch_add(1, Ordering::Relaxed) + 1;

            // Log progress every 100 requests
            if count % 100 == 0 {
                let latency = metrics.latency_stats();
                info!(
                    handled = count,
                    throughput = format!("{:.1} req/s", metrics.throughput()),
                    avg_latency_us = latency.mean_us,
                    "Processing milestone"
                );
            }

            drop(permit);
        });
    }

    info!("Service shutting down...");
    metrics.print_summary();

    Ok(())
}

//! NATS subscriber for incoming service requests

use anyhow::{Context, Result};
use async_nats::{Client, Subscriber};
use tracing::info;

/// Subscribes the service to its request subjects
pub struct RequestConsumer {
    client: Client,
    predict_subject: String,
    health_subject: String,
}

impl RequestConsumer {
    pub fn new(client: Client, predict_subject: &str, health_subject: &str) -> Self {
        Self {
            client,
            predict_subject: predict_subject.to_string(),
            health_subject: health_subject.to_string(),
        }
    }

    /// Subscribe to prediction requests
    pub async fn subscribe_predict(&self) -> Result<Subscriber> {
        self.subscribe(&self.predict_subject).await
    }

    /// Subscribe to readiness probes
    pub async fn subscribe_health(&self) -> Result<Subscriber> {
        self.subscribe(&self.health_subject).await
    }

    async fn subscribe(&self, subject: &str) -> Result<Subscriber> {
        let subscriber = self
            .client
            .subscribe(subject.to_string())
            .await
            .with_context(|| format!("Failed to subscribe to {}", subject))?;
        info!(subject = %subject, "Subscribed to request subject");
        Ok(subscriber)
    }

    pub fn predict_subject(&self) -> &str {
        &self.predict_subject
    }

    pub fn health_subject(&self) -> &str {
        &self.health_subject
    }
}

//! NATS publisher for request replies

use anyhow::Result;
use async_nats::{Client, Subject};
use tracing::{debug, warn};

/// Publishes encoded replies to the requester's inbox
#[derive(Clone)]
pub struct ReplyProducer {
    client: Client,
}

impl ReplyProducer {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Publish a reply. Requests sent without a reply subject are dropped.
    pub async fn reply(&self, reply_to: Option<Subject>, payload: Vec<u8>) -> Result<()> {
        let Some(subject) = reply_to else {
            warn!("Request has no reply subject, dropping reply");
            return Ok(());
        };

        let bytes = payload.len();
        self.client.publish(subject.clone(), payload.into()).await?;

        debug!(reply_to = %subject, bytes, "Published reply");
        Ok(())
    }
}

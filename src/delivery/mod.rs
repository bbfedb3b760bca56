//! Streaming of transcript updates to the connected listener.
//!
//! Every finished chunk produces one update. The listener must acknowledge
//! each update within a bounded timeout; a missing acknowledgement or a send
//! failure means the remote side is gone, which ends the session gracefully.

use crate::error::DeliveryError;
use crate::store::{put_json, ObjectStore};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Structured update sent after every chunk. `segments` and `ai_preds` are
/// placeholder fields reserved for per-segment and summary detail filled in
/// by downstream collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptUpdate {
    pub transcript: String,
    pub segments: Vec<serde_json::Value>,
    pub ai_preds: serde_json::Map<String, serde_json::Value>,
    pub success: bool,
}

impl TranscriptUpdate {
    pub fn new(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            segments: Vec::new(),
            ai_preds: serde_json::Map::new(),
            success: true,
        }
    }
}

/// Transcript snapshot persisted next to the stage marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSnapshot {
    pub transcript: String,
}

/// Sends one update and waits for the listener's acknowledgement.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    async fn send_update(&self, update: &TranscriptUpdate) -> Result<(), DeliveryError>;
}

/// NATS request-reply sink: the reply is the acknowledgement.
pub struct NatsDelivery {
    client: async_nats::Client,
    subject: String,
    ack_timeout: Duration,
}

impl NatsDelivery {
    pub async fn connect(
        url: &str,
        session_key: &str,
        ack_timeout: Duration,
    ) -> anyhow::Result<Self> {
        info!(url, "connecting to delivery server");
        let client = async_nats::connect(url).await?;
        let subject = format!("transcript.update.session-{session_key}");
        info!(subject, "delivery channel ready");
        Ok(Self {
            client,
            subject,
            ack_timeout,
        })
    }
}

#[async_trait]
impl DeliverySink for NatsDelivery {
    async fn send_update(&self, update: &TranscriptUpdate) -> Result<(), DeliveryError> {
        let payload = serde_json::to_vec(update)?;
        let request = self.client.request(self.subject.clone(), payload.into());
        match tokio::time::timeout(self.ack_timeout, request).await {
            Ok(Ok(_reply)) => {
                debug!(subject = %self.subject, "update acknowledged");
                Ok(())
            }
            Ok(Err(err)) => Err(DeliveryError::Closed(err.to_string())),
            Err(_) => Err(DeliveryError::AckTimeout(self.ack_timeout)),
        }
    }
}

/// Per-session delivery: pushes each snapshot to the listener and mirrors it
/// into the external store.
pub struct DeliveryChannel {
    sink: Arc<dyn DeliverySink>,
    store: Arc<dyn ObjectStore>,
    session_key: String,
}

impl DeliveryChannel {
    pub fn new(sink: Arc<dyn DeliverySink>, store: Arc<dyn ObjectStore>, session_key: String) -> Self {
        Self {
            sink,
            store,
            session_key,
        }
    }

    /// Sends the current cumulative transcript and persists the same
    /// snapshot. An error means the listener is gone; a failed snapshot
    /// write is only logged, the store being best-effort.
    pub async fn publish(&self, transcript: &str) -> Result<(), DeliveryError> {
        let update = TranscriptUpdate::new(transcript);
        self.sink.send_update(&update).await?;

        let key = format!("{}/transcript.json", self.session_key);
        let snapshot = TranscriptSnapshot {
            transcript: transcript.to_string(),
        };
        if let Err(err) = put_json(&*self.store, &key, &snapshot).await {
            warn!(key, error = %err, "failed to persist transcript snapshot");
        }
        Ok(())
    }
}

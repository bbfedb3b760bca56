//! Fire-and-forget pipeline progress events.
//!
//! The collector is an external collaborator with no response contract; a
//! failed push is logged and dropped, never surfaced to the session.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Which side of the conversation a stream belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ParticipantKind {
    Patient,
    Provider,
}

impl fmt::Display for ParticipantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParticipantKind::Patient => f.write_str("patient"),
            ParticipantKind::Provider => f.write_str("provider"),
        }
    }
}

/// Progress event pushed to the log collector. Field names are the
/// collector's wire contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub care_request_id: String,
    pub he_type: String,
    pub req_type: String,
    pub message: String,
    pub source_type: String,
}

impl TelemetryEvent {
    fn new(session_key: &str, kind: ParticipantKind, req_type: &str, message: &str) -> Self {
        Self {
            care_request_id: session_key.to_string(),
            he_type: kind.to_string(),
            req_type: req_type.to_string(),
            message: message.to_string(),
            source_type: "backend".to_string(),
        }
    }

    pub fn stream_started(session_key: &str, kind: ParticipantKind) -> Self {
        Self::new(session_key, kind, "rtmp_start", "Livestream started (RTMP)")
    }

    pub fn stream_restarted(session_key: &str, kind: ParticipantKind) -> Self {
        Self::new(
            session_key,
            kind,
            "rtmp_restart",
            "Livestream restarted (RTMP)",
        )
    }

    pub fn stream_stopped(session_key: &str, kind: ParticipantKind) -> Self {
        Self::new(session_key, kind, "rtmp_stop", "Livestream stopped (RTMP)")
    }

    pub fn delivery_closed(session_key: &str, kind: ParticipantKind, message: &str) -> Self {
        Self::new(session_key, kind, "websocket_stop", message)
    }
}

#[async_trait]
pub trait TelemetrySink: Send + Sync {
    /// Fire and forget; implementations must never fail the caller.
    async fn push(&self, event: TelemetryEvent);
}

/// Posts events to the collector's HTTP endpoint.
pub struct HttpTelemetry {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpTelemetry {
    pub fn new(endpoint: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl TelemetrySink for HttpTelemetry {
    async fn push(&self, event: TelemetryEvent) {
        let url = format!("{}/post_websocket_logs", self.endpoint);
        match self.http.post(&url).json(&event).send().await {
            Ok(response) => {
                debug!(status = %response.status(), req_type = %event.req_type, "telemetry pushed");
            }
            Err(err) => {
                debug!(error = %err, req_type = %event.req_type, "telemetry push failed");
            }
        }
    }
}

/// Sink for deployments without a collector.
pub struct NoopTelemetry;

#[async_trait]
impl TelemetrySink for NoopTelemetry {
    async fn push(&self, _event: TelemetryEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_carries_collector_field_set() {
        let event = TelemetryEvent::stream_restarted("demo1", ParticipantKind::Patient);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["care_request_id"], "demo1");
        assert_eq!(json["he_type"], "patient");
        assert_eq!(json["req_type"], "rtmp_restart");
        assert_eq!(json["source_type"], "backend");
        assert!(json["message"].as_str().unwrap().contains("RTMP"));
    }

    #[test]
    fn participant_kind_display() {
        assert_eq!(ParticipantKind::Patient.to_string(), "patient");
        assert_eq!(ParticipantKind::Provider.to_string(), "provider");
    }
}

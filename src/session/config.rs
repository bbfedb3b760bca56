use crate::retry::RetryPolicy;
use crate::telemetry::ParticipantKind;
use std::time::Duration;

/// Resolved settings for one ingestion session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Session identifier, appended to the base URL to reach the stream.
    pub session_key: String,
    pub participant_kind: ParticipantKind,
    pub stream_base_url: String,
    /// Target duration of each transcription chunk.
    pub chunk_duration: Duration,
    /// Canonical PCM rate (the recognizer expects 16 kHz).
    pub sample_rate: u32,
    /// Capacity of the feeder-to-assembler block queue.
    pub queue_depth: usize,
    /// Cool-down sleep before reconnect attempts begin.
    pub reconnect_cooldown: Duration,
    pub retry: RetryPolicy,
}

impl SessionConfig {
    pub fn stream_url(&self) -> String {
        format!("{}{}", self.stream_base_url, self.session_key)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_key: format!("session-{}", uuid::Uuid::new_v4()),
            participant_kind: ParticipantKind::Patient,
            stream_base_url: "http://127.0.0.1:8935/live/".to_string(),
            chunk_duration: Duration::from_secs(5),
            sample_rate: 16000,
            queue_depth: 64,
            reconnect_cooldown: Duration::from_secs(2),
            retry: RetryPolicy::default(),
        }
    }
}

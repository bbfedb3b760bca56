use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub stream: StreamConfig,
    pub chunking: ChunkingConfig,
    pub transcription: TranscriptionConfig,
    pub delivery: DeliveryConfig,
    pub store: StoreConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct StreamConfig {
    /// Base URL the session key is appended to.
    pub base_url: String,
    pub connect_timeout_secs: u64,
    /// Stalled-read cutoff; a blocked read surfaces as an i/o error.
    pub read_timeout_secs: u64,
    pub reconnect_cooldown_secs: u64,
    pub retry_max_attempts: u32,
    pub retry_delay_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct ChunkingConfig {
    pub chunk_duration_secs: u64,
    pub sample_rate: u32,
    pub queue_depth: usize,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptionConfig {
    /// Inference server base URL.
    pub endpoint: String,
}

#[derive(Debug, Deserialize)]
pub struct DeliveryConfig {
    pub nats_url: String,
    pub ack_timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    /// Root directory of the blob store.
    pub root: String,
}

#[derive(Debug, Deserialize)]
pub struct TelemetryConfig {
    /// Log collector base URL; omit to disable pushes.
    pub endpoint: Option<String>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

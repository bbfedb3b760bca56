//! Shared in-memory doubles for the integration tests. Sources are scripted
//! per connection attempt; sinks record what the pipeline handed them.

#![allow(dead_code)]

use async_trait::async_trait;
use rtmp_scribe::{
    AudioChunk, AudioCodec, AudioPacket, DeliveryError, DeliverySink, MediaConnect, PacketSource,
    SourceError, TelemetryEvent, TelemetrySink, Transcriber, TranscriptUpdate,
};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// One scripted event inside a connection. An exhausted script is an orderly
/// end of stream.
pub enum ScriptItem {
    Packet(AudioPacket),
    Sleep(Duration),
    Error(SourceError),
}

pub struct ScriptedSource {
    items: VecDeque<ScriptItem>,
}

#[async_trait]
impl PacketSource for ScriptedSource {
    async fn next_packet(&mut self) -> Result<Option<AudioPacket>, SourceError> {
        loop {
            match self.items.pop_front() {
                Some(ScriptItem::Packet(packet)) => return Ok(Some(packet)),
                Some(ScriptItem::Sleep(duration)) => tokio::time::sleep(duration).await,
                Some(ScriptItem::Error(err)) => return Err(err),
                None => return Ok(None),
            }
        }
    }
}

/// Hands out one scripted connection per `open` call; once the script runs
/// out, every further attempt is refused.
pub struct ScriptedConnect {
    connections: Mutex<VecDeque<Result<Vec<ScriptItem>, SourceError>>>,
}

impl ScriptedConnect {
    pub fn new(connections: Vec<Result<Vec<ScriptItem>, SourceError>>) -> Self {
        Self {
            connections: Mutex::new(connections.into()),
        }
    }
}

#[async_trait]
impl MediaConnect for ScriptedConnect {
    async fn open(&self, _url: &str) -> Result<Box<dyn PacketSource>, SourceError> {
        let next = self.connections.lock().unwrap().pop_front();
        match next {
            Some(Ok(items)) => Ok(Box::new(ScriptedSource {
                items: items.into(),
            })),
            Some(Err(err)) => Err(err),
            None => Err(SourceError::Connect("connection refused".into())),
        }
    }
}

/// Raw 16 kHz mono PCM packet; bypasses the codec decoders entirely.
pub fn pcm_packet(pts: i64, samples: &[i16]) -> AudioPacket {
    AudioPacket {
        pts,
        codec: AudioCodec::PcmS16le,
        sample_rate: 16000,
        channels: 1,
        is_config: false,
        data: samples.iter().flat_map(|s| s.to_le_bytes()).collect(),
    }
}

pub fn silence(frames: usize) -> Vec<i16> {
    vec![0; frames]
}

#[derive(Default)]
pub struct RecordingTelemetry {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl RecordingTelemetry {
    pub fn req_types(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|event| event.req_type.clone())
            .collect()
    }
}

#[async_trait]
impl TelemetrySink for RecordingTelemetry {
    async fn push(&self, event: TelemetryEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Pops one canned text per chunk and records what was dispatched.
pub struct ScriptedTranscriber {
    texts: Mutex<VecDeque<Option<String>>>,
    calls: Mutex<Vec<(u32, u64)>>,
}

impl ScriptedTranscriber {
    pub fn new(texts: Vec<Option<&str>>) -> Self {
        Self {
            texts: Mutex::new(texts.into_iter().map(|t| t.map(String::from)).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `(chunk_index, frame_count)` per dispatched chunk, in order.
    pub fn calls(&self) -> Vec<(u32, u64)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn transcribe(&self, chunk: &AudioChunk) -> Option<String> {
        self.calls
            .lock()
            .unwrap()
            .push((chunk.chunk_index, chunk.frame_count));
        self.texts.lock().unwrap().pop_front().flatten()
    }
}

/// Records every update attempt; pops one scripted result per send, default
/// acknowledged.
pub struct ScriptedSink {
    results: Mutex<VecDeque<Result<(), DeliveryError>>>,
    updates: Mutex<Vec<TranscriptUpdate>>,
}

impl ScriptedSink {
    pub fn always_ok() -> Self {
        Self::new(Vec::new())
    }

    pub fn new(results: Vec<Result<(), DeliveryError>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            updates: Mutex::new(Vec::new()),
        }
    }

    pub fn transcripts(&self) -> Vec<String> {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .map(|update| update.transcript.clone())
            .collect()
    }
}

#[async_trait]
impl DeliverySink for ScriptedSink {
    async fn send_update(&self, update: &TranscriptUpdate) -> Result<(), DeliveryError> {
        self.updates.lock().unwrap().push(update.clone());
        self.results.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

//! Error types for rtmp-scribe, one enum per failure domain.

use std::time::Duration;
use thiserror::Error;

/// Failures raised by the media source while connecting or demultiplexing.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to connect to media source: {0}")]
    Connect(String),

    #[error("stream contains no audio track")]
    NoAudioTrack,

    #[error("stream i/o error: {0}")]
    Io(String),

    #[error("malformed container data: {0}")]
    Container(String),
}

impl SourceError {
    /// Transient failures are recovered by reconnecting; the rest end the
    /// session.
    pub fn is_transient(&self) -> bool {
        !matches!(self, SourceError::NoAudioTrack)
    }
}

/// Decode or resample failures. These indicate stream corruption rather than
/// transient i/o and are always session-ending.
#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("audio decode failed: {0}")]
    Decode(#[from] symphonia::core::errors::Error),

    #[error("malformed audio stream: {0}")]
    Malformed(String),
}

/// WAV encoding failures while finalizing a chunk.
#[derive(Error, Debug)]
pub enum ChunkError {
    #[error("wav encoding failed: {0}")]
    Encode(#[from] hound::Error),
}

/// Outcomes of a delivery attempt that mean the listener is gone.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("no acknowledgement within {0:?}")]
    AckTimeout(Duration),

    #[error("delivery channel closed: {0}")]
    Closed(String),

    #[error("failed to encode update: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Failures from the external blob store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid stored json at {key}: {message}")]
    InvalidJson { key: String, message: String },
}

/// Fatal, session-ending errors. Caught and logged at the session boundary;
/// they never cross into other sessions.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("stream contains no audio track")]
    NoAudioTrack,

    #[error("reconnect attempts exhausted: {0}")]
    RetriesExhausted(SourceError),

    #[error("media source failed: {0}")]
    Source(SourceError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Chunk(#[from] ChunkError),

    #[error("pipeline task failed: {0}")]
    Task(String),
}

//! Connection ownership and reconnection for the live media source.

use super::flv::AudioPacket;
use crate::error::{SessionError, SourceError};
use crate::retry::RetryPolicy;
use crate::telemetry::{ParticipantKind, TelemetryEvent, TelemetrySink};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Demultiplexed packet supply from one open connection.
#[async_trait]
pub trait PacketSource: Send {
    /// Next audio packet in stream order; `Ok(None)` on orderly end of
    /// stream. Dropping the source closes the connection.
    async fn next_packet(&mut self) -> Result<Option<AudioPacket>, SourceError>;
}

/// Opens connections to the media source. Implementations must fail with
/// [`SourceError::NoAudioTrack`] when the stream carries no audio.
#[async_trait]
pub trait MediaConnect: Send + Sync {
    async fn open(&self, url: &str) -> Result<Box<dyn PacketSource>, SourceError>;
}

/// Connection lifecycle of the connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorState {
    Disconnected,
    Connecting,
    Streaming,
    Reconnecting,
    Stopped,
}

/// Owns the connection to the media source and hides transient failures from
/// the rest of the pipeline: demux i/o errors are recovered by a cool-down
/// sleep plus bounded reconnect attempts, and packets replayed by the source
/// after a reconnect are filtered out by PTS.
pub struct StreamConnector {
    connect: Arc<dyn MediaConnect>,
    url: String,
    session_key: String,
    participant_kind: ParticipantKind,
    retry: RetryPolicy,
    cooldown: Duration,
    telemetry: Arc<dyn TelemetrySink>,
    source: Option<Box<dyn PacketSource>>,
    state: ConnectorState,
    last_position: Option<i64>,
    just_reconnected: bool,
}

impl StreamConnector {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        connect: Arc<dyn MediaConnect>,
        url: String,
        session_key: String,
        participant_kind: ParticipantKind,
        retry: RetryPolicy,
        cooldown: Duration,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            connect,
            url,
            session_key,
            participant_kind,
            retry,
            cooldown,
            telemetry,
            source: None,
            state: ConnectorState::Disconnected,
            last_position: None,
            just_reconnected: false,
        }
    }

    pub fn state(&self) -> ConnectorState {
        self.state
    }

    /// Highest accepted packet PTS so far; non-decreasing once reconnect
    /// filtering has been applied.
    pub fn last_position(&self) -> Option<i64> {
        self.last_position
    }

    /// Initial connection, through the retry policy. A stream without audio
    /// is fatal.
    pub async fn connect(&mut self) -> Result<(), SessionError> {
        self.state = ConnectorState::Connecting;
        let connect = Arc::clone(&self.connect);
        let url = self.url.clone();
        let result = self.retry.run(|| connect.open(&url)).await;
        match result {
            Ok(source) => {
                self.source = Some(source);
                self.state = ConnectorState::Streaming;
                info!(session_key = %self.session_key, "connected to media source");
                Ok(())
            }
            Err(SourceError::NoAudioTrack) => {
                self.state = ConnectorState::Stopped;
                Err(SessionError::NoAudioTrack)
            }
            Err(err) => {
                self.state = ConnectorState::Stopped;
                Err(SessionError::RetriesExhausted(err))
            }
        }
    }

    /// Next accepted packet. `Ok(None)` means the stream ended in order.
    /// Transient failures reconnect internally; any returned error is fatal.
    pub async fn next(&mut self) -> Result<Option<AudioPacket>, SessionError> {
        loop {
            let Some(source) = self.source.as_mut() else {
                return Ok(None);
            };
            match source.next_packet().await {
                Ok(Some(packet)) => {
                    if self.just_reconnected {
                        // Drop anything at or behind the position reached
                        // before the drop; stop filtering at the first packet
                        // strictly past it.
                        if let Some(last) = self.last_position {
                            if packet.pts <= last {
                                continue;
                            }
                        }
                        self.just_reconnected = false;
                    }
                    self.last_position = Some(packet.pts);
                    return Ok(Some(packet));
                }
                Ok(None) => {
                    self.source = None;
                    self.state = ConnectorState::Stopped;
                    info!(session_key = %self.session_key, "media stream ended");
                    return Ok(None);
                }
                Err(err) if err.is_transient() => {
                    warn!(session_key = %self.session_key, error = %err, "stream i/o failure, reconnecting");
                    self.reconnect().await?;
                }
                Err(err) => {
                    self.source = None;
                    self.state = ConnectorState::Stopped;
                    return Err(SessionError::Source(err));
                }
            }
        }
    }

    async fn reconnect(&mut self) -> Result<(), SessionError> {
        self.state = ConnectorState::Reconnecting;
        // Dropping the source closes the dead connection.
        self.source = None;
        sleep(self.cooldown).await;

        let connect = Arc::clone(&self.connect);
        let url = self.url.clone();
        let result = self.retry.run(|| connect.open(&url)).await;
        match result {
            Ok(source) => {
                self.source = Some(source);
                self.just_reconnected = true;
                self.state = ConnectorState::Streaming;
                info!(session_key = %self.session_key, position = ?self.last_position, "reconnected to media source");
                self.telemetry
                    .push(TelemetryEvent::stream_restarted(
                        &self.session_key,
                        self.participant_kind,
                    ))
                    .await;
                Ok(())
            }
            Err(err) => {
                self.state = ConnectorState::Stopped;
                Err(SessionError::RetriesExhausted(err))
            }
        }
    }
}

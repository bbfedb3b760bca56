use super::config::SessionConfig;
use crate::audio::{AudioChunk, ChunkAssembler, ChunkConfig, FrameNormalizer};
use crate::delivery::{DeliveryChannel, DeliverySink};
use crate::error::{DeliveryError, SessionError};
use crate::store::{ObjectStore, PipelineStateTracker};
use crate::stream::{MediaConnect, StreamConnector};
use crate::telemetry::{TelemetryEvent, TelemetrySink};
use crate::transcribe::Transcriber;
use crate::transcript::TranscriptAccumulator;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Session-level lifecycle. `Stopped` is terminal; a new session restarts
/// the whole machine from `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Streaming,
    Reconnecting,
    Stopped,
}

/// How a session reached `Stopped`.
#[derive(Debug)]
pub enum SessionOutcome {
    /// The source stream ended; the terminal partial chunk was processed.
    Completed,
    /// The listener closed the channel or never acknowledged in time.
    /// Normal termination, not an error.
    DeliveryClosed(DeliveryError),
    /// A fatal pipeline error, already logged at the session boundary.
    /// The done marker is withheld so the abort stays observable.
    Failed(SessionError),
}

impl SessionOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            SessionOutcome::Completed => "completed",
            SessionOutcome::DeliveryClosed(_) => "delivery_closed",
            SessionOutcome::Failed(_) => "failed",
        }
    }
}

/// One continuous ingestion-transcription-delivery lifecycle.
///
/// All collaborators are passed in explicitly so sessions share no hidden
/// global state; distinct sessions are fully independent units of work.
pub struct StreamSession {
    config: SessionConfig,
    connect: Arc<dyn MediaConnect>,
    transcriber: Arc<dyn Transcriber>,
    delivery: DeliveryChannel,
    tracker: PipelineStateTracker,
    telemetry: Arc<dyn TelemetrySink>,
    state: SessionState,
    started_at: DateTime<Utc>,
}

impl StreamSession {
    pub fn new(
        config: SessionConfig,
        connect: Arc<dyn MediaConnect>,
        transcriber: Arc<dyn Transcriber>,
        sink: Arc<dyn DeliverySink>,
        store: Arc<dyn ObjectStore>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        let delivery = DeliveryChannel::new(sink, Arc::clone(&store), config.session_key.clone());
        let tracker = PipelineStateTracker::new(store);
        Self {
            config,
            connect,
            transcriber,
            delivery,
            tracker,
            telemetry,
            state: SessionState::Disconnected,
            started_at: Utc::now(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Runs the session to its terminal state. Every failure is caught and
    /// logged here; nothing propagates past the session boundary.
    pub async fn run(mut self) -> SessionOutcome {
        let session_key = self.config.session_key.clone();
        let kind = self.config.participant_kind;
        info!(session_key = %session_key, participant = %kind, "session starting");
        self.telemetry
            .push(TelemetryEvent::stream_started(&session_key, kind))
            .await;

        let outcome = match self.run_pipeline().await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(session_key = %session_key, error = %err, "session failed");
                self.telemetry
                    .push(TelemetryEvent::stream_stopped(&session_key, kind))
                    .await;
                SessionOutcome::Failed(err)
            }
        };
        self.state = SessionState::Stopped;

        // The done marker is a graceful-completion breadcrumb; an aborted
        // session stays observably "started" for external reconciliation.
        if !matches!(outcome, SessionOutcome::Failed(_)) {
            if let Err(err) = self.tracker.mark_done(&session_key).await {
                warn!(session_key = %session_key, error = %err, "failed to write done marker");
            }
        }

        let elapsed = Utc::now().signed_duration_since(self.started_at);
        info!(
            session_key = %session_key,
            elapsed_secs = elapsed.num_milliseconds() as f64 / 1000.0,
            outcome = outcome.label(),
            "session stopped"
        );
        outcome
    }

    async fn run_pipeline(&mut self) -> Result<SessionOutcome, SessionError> {
        self.state = SessionState::Connecting;
        let mut connector = StreamConnector::new(
            Arc::clone(&self.connect),
            self.config.stream_url(),
            self.config.session_key.clone(),
            self.config.participant_kind,
            self.config.retry.clone(),
            self.config.reconnect_cooldown,
            Arc::clone(&self.telemetry),
        );
        connector.connect().await?;
        self.state = SessionState::Streaming;

        // Explicit bounded hand-off: the feeder turns packets into PCM
        // blocks, the loop below assembles and delivers chunks. Chunk N+1 is
        // never dispatched before chunk N's delivery has completed.
        let (tx, mut rx) = mpsc::channel::<Vec<u8>>(self.config.queue_depth.max(1));
        let mut normalizer = FrameNormalizer::new(self.config.sample_rate);
        let feeder: JoinHandle<Result<(), SessionError>> = tokio::spawn(async move {
            loop {
                match connector.next().await {
                    Ok(Some(packet)) => {
                        for block in normalizer.push(&packet)? {
                            if tx.send(block).await.is_err() {
                                // Receiver dropped: the session chose to stop.
                                return Ok(());
                            }
                        }
                    }
                    Ok(None) => return Ok(()),
                    Err(err) => return Err(err),
                }
            }
        });

        let mut assembler = ChunkAssembler::new(ChunkConfig {
            session_key: self.config.session_key.clone(),
            chunk_duration: self.config.chunk_duration,
            sample_rate: self.config.sample_rate,
        });
        let mut accumulator = TranscriptAccumulator::new();
        let mut started = false;

        loop {
            let Some(block) = rx.recv().await else {
                // Feeder finished: orderly end of stream, or a fatal error.
                return match feeder.await {
                    Ok(Ok(())) => {
                        if let Some(chunk) = assembler.finish()? {
                            if let Err(err) = self.process_chunk(chunk, &mut accumulator).await {
                                return Ok(self.delivery_closed(err).await);
                            }
                        }
                        Ok(SessionOutcome::Completed)
                    }
                    Ok(Err(err)) => Err(err),
                    Err(join_err) => Err(SessionError::Task(join_err.to_string())),
                };
            };

            if !started {
                if let Err(err) = self.tracker.ensure_started(&self.config.session_key).await {
                    warn!(
                        session_key = %self.config.session_key,
                        error = %err,
                        "failed to write started marker"
                    );
                }
                started = true;
            }

            if let Some(chunk) = assembler.push(&block)? {
                if let Err(err) = self.process_chunk(chunk, &mut accumulator).await {
                    drop(rx);
                    if let Ok(Err(feed_err)) = feeder.await {
                        warn!(error = %feed_err, "feeder error during shutdown");
                    }
                    return Ok(self.delivery_closed(err).await);
                }
            }
        }
    }

    /// Transcribe, accumulate, deliver for one finished chunk. A delivery
    /// error means the listener is gone and the session should halt.
    async fn process_chunk(
        &self,
        chunk: AudioChunk,
        accumulator: &mut TranscriptAccumulator,
    ) -> Result<(), DeliveryError> {
        info!(
            chunk = %chunk.label(),
            frames = chunk.frame_count,
            "dispatching chunk for transcription"
        );
        if let Some(text) = self.transcriber.transcribe(&chunk).await {
            accumulator.push(&text);
        }
        self.delivery.publish(accumulator.as_str()).await
    }

    async fn delivery_closed(&self, err: DeliveryError) -> SessionOutcome {
        let message = match &err {
            DeliveryError::AckTimeout(_) => "delivery channel closed by server - no ack received",
            _ => "delivery channel closed by client",
        };
        info!(
            session_key = %self.config.session_key,
            error = %err,
            "listener gone, halting session"
        );
        self.telemetry
            .push(TelemetryEvent::delivery_closed(
                &self.config.session_key,
                self.config.participant_kind,
                message,
            ))
            .await;
        SessionOutcome::DeliveryClosed(err)
    }
}

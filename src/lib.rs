pub mod audio;
pub mod config;
pub mod delivery;
pub mod error;
pub mod retry;
pub mod session;
pub mod store;
pub mod stream;
pub mod telemetry;
pub mod transcribe;
pub mod transcript;

pub use audio::{AudioChunk, ChunkAssembler, ChunkConfig, FrameNormalizer};
pub use config::Config;
pub use delivery::{DeliveryChannel, DeliverySink, NatsDelivery, TranscriptSnapshot, TranscriptUpdate};
pub use error::{
    ChunkError, DeliveryError, NormalizeError, SessionError, SourceError, StoreError,
};
pub use retry::RetryPolicy;
pub use session::{SessionConfig, SessionOutcome, SessionState, StreamSession};
pub use store::{FsStore, ObjectStore, PipelineStateTracker, Stage, StageRecord};
pub use stream::{
    AudioCodec, AudioPacket, ConnectorState, FlvDemuxer, HttpFlvConnect, MediaConnect,
    PacketSource, StreamConnector,
};
pub use telemetry::{HttpTelemetry, NoopTelemetry, ParticipantKind, TelemetryEvent, TelemetrySink};
pub use transcribe::{HttpTranscriber, Transcriber};
pub use transcript::TranscriptAccumulator;

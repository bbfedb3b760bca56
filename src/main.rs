use anyhow::Result;
use clap::Parser;
use rtmp_scribe::{
    Config, FsStore, HttpFlvConnect, HttpTelemetry, HttpTranscriber, NatsDelivery, NoopTelemetry,
    ParticipantKind, RetryPolicy, SessionConfig, SessionOutcome, StreamSession, TelemetrySink,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "rtmp-scribe", about = "Live-stream chunked transcription pipeline")]
struct Args {
    /// Stream session key, appended to the configured base URL
    stream_key: String,

    /// Which participant this stream belongs to
    #[arg(value_enum, default_value_t = ParticipantKind::Patient)]
    participant: ParticipantKind,

    /// Path to the configuration file (extension optional)
    #[arg(long, default_value = "config/rtmp-scribe")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;
    info!(service = %cfg.service.name, stream_key = %args.stream_key, "starting");

    let connect = Arc::new(HttpFlvConnect::new(
        Duration::from_secs(cfg.stream.connect_timeout_secs),
        Duration::from_secs(cfg.stream.read_timeout_secs),
    )?);
    let transcriber = Arc::new(HttpTranscriber::new(cfg.transcription.endpoint.clone()));
    let sink = Arc::new(
        NatsDelivery::connect(
            &cfg.delivery.nats_url,
            &args.stream_key,
            Duration::from_secs(cfg.delivery.ack_timeout_secs),
        )
        .await?,
    );
    let store = Arc::new(FsStore::new(&cfg.store.root));
    let telemetry: Arc<dyn TelemetrySink> = match &cfg.telemetry.endpoint {
        Some(endpoint) => Arc::new(HttpTelemetry::new(endpoint.clone())),
        None => Arc::new(NoopTelemetry),
    };

    let session_config = SessionConfig {
        session_key: args.stream_key,
        participant_kind: args.participant,
        stream_base_url: cfg.stream.base_url.clone(),
        chunk_duration: Duration::from_secs(cfg.chunking.chunk_duration_secs),
        sample_rate: cfg.chunking.sample_rate,
        queue_depth: cfg.chunking.queue_depth,
        reconnect_cooldown: Duration::from_secs(cfg.stream.reconnect_cooldown_secs),
        retry: RetryPolicy::new(
            cfg.stream.retry_max_attempts,
            Duration::from_millis(cfg.stream.retry_delay_ms),
        ),
    };

    let session = StreamSession::new(
        session_config,
        connect,
        transcriber,
        sink,
        store,
        telemetry,
    );

    match session.run().await {
        SessionOutcome::Completed => info!("session completed"),
        SessionOutcome::DeliveryClosed(err) => info!(error = %err, "listener closed the channel"),
        SessionOutcome::Failed(err) => return Err(err.into()),
    }
    Ok(())
}

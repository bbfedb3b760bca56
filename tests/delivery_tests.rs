mod common;

use common::*;
use rtmp_scribe::{DeliveryChannel, DeliveryError, FsStore, ObjectStore};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn publish_sends_update_and_persists_snapshot() {
    let dir = TempDir::new().unwrap();
    let store: Arc<dyn ObjectStore> = Arc::new(FsStore::new(dir.path()));
    let sink = Arc::new(ScriptedSink::always_ok());
    let channel = DeliveryChannel::new(sink.clone(), Arc::clone(&store), "demo1".into());

    channel.publish("hello").await.unwrap();
    channel.publish("hello\nworld").await.unwrap();

    assert_eq!(sink.transcripts(), vec!["hello", "hello\nworld"]);

    // The store mirrors the latest cumulative transcript.
    let snapshot = store.get("demo1/transcript.json").await.unwrap().unwrap();
    let json: serde_json::Value = serde_json::from_slice(&snapshot).unwrap();
    assert_eq!(json, serde_json::json!({"transcript": "hello\nworld"}));
}

#[tokio::test]
async fn sink_failure_propagates_and_skips_snapshot() {
    let dir = TempDir::new().unwrap();
    let store: Arc<dyn ObjectStore> = Arc::new(FsStore::new(dir.path()));
    let sink = Arc::new(ScriptedSink::new(vec![Err(DeliveryError::AckTimeout(
        Duration::from_secs(2),
    ))]));
    let channel = DeliveryChannel::new(sink, Arc::clone(&store), "demo1".into());

    let err = channel.publish("hello").await.unwrap_err();
    assert!(matches!(err, DeliveryError::AckTimeout(_)));
    assert!(store.get("demo1/transcript.json").await.unwrap().is_none());
}

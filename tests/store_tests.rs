use rtmp_scribe::{FsStore, ObjectStore, PipelineStateTracker, Stage};
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn fs_store_round_trips_blobs() {
    let dir = TempDir::new().unwrap();
    let store = FsStore::new(dir.path());

    assert!(!store.exists("demo1/blob.bin").await.unwrap());
    assert!(store.get("demo1/blob.bin").await.unwrap().is_none());

    store.put("demo1/blob.bin", vec![1, 2, 3]).await.unwrap();
    assert!(store.exists("demo1/blob.bin").await.unwrap());
    assert_eq!(
        store.get("demo1/blob.bin").await.unwrap(),
        Some(vec![1, 2, 3])
    );

    // Keys map to paths under the root.
    assert!(dir.path().join("demo1/blob.bin").is_file());
}

#[tokio::test]
async fn started_marker_is_written_once() {
    let dir = TempDir::new().unwrap();
    let store: Arc<dyn ObjectStore> = Arc::new(FsStore::new(dir.path()));
    let tracker = PipelineStateTracker::new(Arc::clone(&store));

    tracker.ensure_started("demo1").await.unwrap();
    let record = tracker.record("demo1").await.unwrap().unwrap();
    assert_eq!(record.session_key, "demo1");
    assert_eq!(record.stage, Stage::SavingStarted);
    assert_eq!(record.last_processed_end_time, 0.0);

    tracker.mark_done("demo1").await.unwrap();
    // A post-completion resume must not clobber the done marker.
    tracker.ensure_started("demo1").await.unwrap();
    let record = tracker.record("demo1").await.unwrap().unwrap();
    assert_eq!(record.stage, Stage::SavingDone);

    assert!(dir.path().join("demo1/demo1.json").is_file());
}

#[tokio::test]
async fn mark_done_without_record_is_a_noop() {
    let dir = TempDir::new().unwrap();
    let store: Arc<dyn ObjectStore> = Arc::new(FsStore::new(dir.path()));
    let tracker = PipelineStateTracker::new(store);

    tracker.mark_done("ghost").await.unwrap();
    assert!(tracker.record("ghost").await.unwrap().is_none());
}

use super::{get_json, put_json, ObjectStore};
use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Ingestion stage of a session, as seen by external observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    #[serde(rename = "rtmp_saving_started")]
    SavingStarted,
    #[serde(rename = "rtmp_saving_done")]
    SavingDone,
}

/// Durable stage marker for one session. Single producer per session,
/// last-writer-wins; no locking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    pub session_key: String,
    pub last_processed_end_time: f64,
    pub stage: Stage,
}

/// Writes and reads stage markers in the external store. Both operations are
/// best-effort breadcrumbs for reconciliation, not control state.
pub struct PipelineStateTracker {
    store: Arc<dyn ObjectStore>,
}

impl PipelineStateTracker {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    fn record_key(session_key: &str) -> String {
        format!("{session_key}/{session_key}.json")
    }

    /// Writes the "started" marker only if no record exists yet, so repeat
    /// calls (and post-reconnect resumes) leave the record alone.
    pub async fn ensure_started(&self, session_key: &str) -> Result<(), StoreError> {
        let key = Self::record_key(session_key);
        if self.store.exists(&key).await? {
            return Ok(());
        }
        let record = StageRecord {
            session_key: session_key.to_string(),
            last_processed_end_time: 0.0,
            stage: Stage::SavingStarted,
        };
        put_json(&*self.store, &key, &record).await?;
        info!(session_key, "stage marker written: saving started");
        Ok(())
    }

    /// Flips the existing record to "done". A missing record is logged, not
    /// an error.
    pub async fn mark_done(&self, session_key: &str) -> Result<(), StoreError> {
        let key = Self::record_key(session_key);
        let Some(mut record) = get_json::<StageRecord>(&*self.store, &key).await? else {
            warn!(session_key, "no stage record to mark done");
            return Ok(());
        };
        record.stage = Stage::SavingDone;
        put_json(&*self.store, &key, &record).await?;
        info!(session_key, "stage marker written: saving done");
        Ok(())
    }

    /// Current record, if any. Used by observers and tests.
    pub async fn record(&self, session_key: &str) -> Result<Option<StageRecord>, StoreError> {
        get_json(&*self.store, &Self::record_key(session_key)).await
    }
}

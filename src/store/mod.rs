//! Opaque key-value blob store.
//!
//! The pipeline only ever reads and writes JSON/byte blobs addressed by key;
//! storage internals are an external concern. `FsStore` is the default
//! implementation, keyed by relative path under a root directory.

mod stage;

pub use stage::{PipelineStateTracker, Stage, StageRecord};

use crate::error::StoreError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<(), StoreError>;

    /// Ok(None) when no blob exists under `key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    async fn exists(&self, key: &str) -> Result<bool, StoreError>;
}

pub async fn put_json<T: Serialize + Sync>(
    store: &dyn ObjectStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let data = serde_json::to_vec(value).map_err(|err| StoreError::InvalidJson {
        key: key.to_string(),
        message: err.to_string(),
    })?;
    store.put(key, data).await
}

pub async fn get_json<T: DeserializeOwned>(
    store: &dyn ObjectStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    let Some(data) = store.get(key).await? else {
        return Ok(None);
    };
    let value = serde_json::from_slice(&data).map_err(|err| StoreError::InvalidJson {
        key: key.to_string(),
        message: err.to_string(),
    })?;
    Ok(Some(value))
}

/// Filesystem-backed store. Keys map directly to paths under the root.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        info!(root = %root.display(), "filesystem store initialized");
        Self { root }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl ObjectStore for FsStore {
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<(), StoreError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, data).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(tokio::fs::try_exists(self.path_for(key)).await?)
    }
}

mod prefs;
mod relay;

pub use prefs::*;
pub use relay::*;

use std::{
    collections::HashMap,
    io::{self, Write},
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use spdlog::prelude::*;
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::{sync::Mutex, task};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store write failed: {0}")]
    WriteFailed(String),
    #[error("store load failed: {0}")]
    LoadFailed(String),
}

/// Keyed document collection. Production uses [`JsonDocStore`], tests an
/// in-memory fake.
#[async_trait]
pub trait DocStore<T>: Send + Sync
where
    T: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<Option<T>, StoreError>;

    /// Persisted before returning.
    async fn put(&self, key: &str, value: T) -> Result<(), StoreError>;

    async fn remove(&self, key: &str) -> Result<Option<T>, StoreError>;
}

/// File-backed store. Every mutation serializes the whole collection and
/// swaps it into place atomically, so a crash leaves either the previous or
/// the new document, never a torn one.
pub struct JsonDocStore<T> {
    path: PathBuf,
    map: Mutex<HashMap<String, T>>,
}

impl<T> JsonDocStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let map = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|err| StoreError::LoadFailed(format!("{}: {err}", path.display())))?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("store file '{}' absent, starting empty", path.display());
                HashMap::new()
            }
            Err(err) => {
                return Err(StoreError::LoadFailed(format!("{}: {err}", path.display())))
            }
        };

        Ok(Self {
            path,
            map: Mutex::new(map),
        })
    }

    async fn persist(&self, map: &HashMap<String, T>) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(map)
            .map_err(|err| StoreError::WriteFailed(err.to_string()))?;
        let path = self.path.clone();

        task::spawn_blocking(move || atomic_replace(&path, &bytes))
            .await
            .map_err(|err| StoreError::WriteFailed(err.to_string()))?
            .map_err(|err| StoreError::WriteFailed(err.to_string()))
    }
}

fn atomic_replace(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));

    let mut file = NamedTempFile::new_in(parent)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|err| err.error)?;

    Ok(())
}

#[async_trait]
impl<T> DocStore<T> for JsonDocStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<Option<T>, StoreError> {
        Ok(self.map.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: T) -> Result<(), StoreError> {
        let mut map = self.map.lock().await;
        map.insert(key.to_owned(), value);
        self.persist(&map).await
    }

    async fn remove(&self, key: &str) -> Result<Option<T>, StoreError> {
        let mut map = self.map.lock().await;
        let removed = map.remove(key);
        if removed.is_some() {
            self.persist(&map).await?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
pub struct MemDocStore<T> {
    map: Mutex<HashMap<String, T>>,
}

#[cfg(test)]
impl<T> MemDocStore<T> {
    pub fn new() -> Self {
        Self {
            map: Mutex::new(HashMap::new()),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl<T> DocStore<T> for MemDocStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<Option<T>, StoreError> {
        Ok(self.map.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: T) -> Result<(), StoreError> {
        self.map.lock().await.insert(key.to_owned(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<Option<T>, StoreError> {
        Ok(self.map.lock().await.remove(key))
    }
}

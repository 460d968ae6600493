use std::{collections::HashMap, future::Future, sync::Arc};

use thiserror::Error;
use tokio::sync::Mutex;

use super::{DocStore, StoreError};
use crate::platform::{RelayError, RelayHandle};

#[derive(Debug, Error)]
pub enum RelayCacheError {
    #[error(transparent)]
    Create(RelayError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Per-channel relay identities. Acquisition and invalidation of the same
/// channel are mutually exclusive so concurrent events cannot provision
/// duplicate identities; unrelated channels never contend.
pub struct RelayIdentityCache {
    store: Arc<dyn DocStore<RelayHandle>>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RelayIdentityCache {
    pub fn new(store: impl DocStore<RelayHandle> + 'static) -> Self {
        Self {
            store: Arc::new(store),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the channel's cached handle, provisioning one through
    /// `create` on a miss. A failed creation is never cached.
    pub async fn get_or_create<F, Fut>(
        &self,
        channel_id: &str,
        create: F,
    ) -> Result<RelayHandle, RelayCacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<RelayHandle, RelayError>>,
    {
        let lock = self.channel_lock(channel_id).await;
        let _guard = lock.lock().await;

        if let Some(handle) = self.store.get(channel_id).await? {
            return Ok(handle);
        }

        let handle = create().await.map_err(RelayCacheError::Create)?;
        self.store.put(channel_id, handle.clone()).await?;
        Ok(handle)
    }

    /// Drops the cached handle, forcing recreation on next use. Returns the
    /// dropped handle so the caller may clean it up on the platform.
    pub async fn invalidate(&self, channel_id: &str) -> Result<Option<RelayHandle>, StoreError> {
        let lock = self.channel_lock(channel_id).await;
        let _guard = lock.lock().await;

        self.store.remove(channel_id).await
    }

    async fn channel_lock(&self, channel_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .await
            .entry(channel_id.to_owned())
            .or_default()
            .clone()
    }
}

use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

use super::{DocStore, StoreError};
use crate::lang::Language;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preference {
    pub language: Language,
    pub auto_enabled: bool,
}

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("a target language is required to enable auto-translation")]
    LanguageRequired,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Per-user translation preferences. Mutations of the same user are
/// serialized; distinct users never contend.
pub struct Preferences {
    store: Arc<dyn DocStore<Preference>>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Preferences {
    pub fn new(store: impl DocStore<Preference> + 'static) -> Self {
        Self {
            store: Arc::new(store),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, user_id: &str) -> Result<Option<Preference>, StoreError> {
        self.store.get(user_id).await
    }

    /// Enables auto-translation, overwriting any stored language.
    pub async fn set_enabled(
        &self,
        user_id: &str,
        language: Language,
    ) -> Result<Preference, StoreError> {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        let pref = Preference {
            language,
            auto_enabled: true,
        };
        self.store.put(user_id, pref.clone()).await?;
        Ok(pref)
    }

    /// Flips `auto_enabled`. A language argument only applies while
    /// transitioning to enabled; re-enabling without one keeps the stored
    /// language, and creating a fresh record requires one.
    pub async fn toggle(
        &self,
        user_id: &str,
        language: Option<Language>,
    ) -> Result<(Preference, bool), PreferenceError> {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        let pref = match self.store.get(user_id).await? {
            None => Preference {
                language: language.ok_or(PreferenceError::LanguageRequired)?,
                auto_enabled: true,
            },
            Some(mut pref) => {
                pref.auto_enabled = !pref.auto_enabled;
                if pref.auto_enabled {
                    if let Some(language) = language {
                        pref.language = language;
                    }
                }
                pref
            }
        };

        self.store.put(user_id, pref.clone()).await?;
        let enabled = pref.auto_enabled;
        Ok((pref, enabled))
    }

    async fn user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .await
            .entry(user_id.to_owned())
            .or_default()
            .clone()
    }
}

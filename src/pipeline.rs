use std::sync::Arc;

use lingua::LanguageDetector;
use spdlog::prelude::*;
use tokio::time;

use crate::{
    config,
    lang::Language,
    platform::{ChatPlatform, MessageEvent, RelayError, RelayHandle},
    store::{Preferences, RelayCacheError, RelayIdentityCache},
    translate::{TranslateError, TranslationRequest, Translator},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    RelayAuthored,
    NoPreference,
    Disabled,
    EmptyContent,
    AlreadyInTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    UnsupportedLanguage,
    QuotaExceeded,
    ServiceUnavailable,
    RelayUnavailable,
    Store,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Filtered(SkipReason),
    Done { post_id: String },
    Failed(FailureKind),
}

/// The per-message engine: decide whether to intercept, translate, re-post
/// through the channel's relay identity as the original author, then delete
/// the original. The original message survives every failure; it is only
/// deleted after the relayed post succeeded.
pub struct Pipeline {
    prefs: Arc<Preferences>,
    relay_ids: Arc<RelayIdentityCache>,
    platform: Arc<dyn ChatPlatform>,
    translator: Arc<dyn Translator>,
    detector: Option<Arc<LanguageDetector>>,
}

impl Pipeline {
    pub fn new(
        prefs: Arc<Preferences>,
        relay_ids: Arc<RelayIdentityCache>,
        platform: Arc<dyn ChatPlatform>,
        translator: Arc<dyn Translator>,
        detector: Option<Arc<LanguageDetector>>,
    ) -> Self {
        Self {
            prefs,
            relay_ids,
            platform,
            translator,
            detector,
        }
    }

    pub async fn run(&self, event: &MessageEvent) -> Outcome {
        let (channel_id, message_id) = (&event.channel_id, &event.message_id);

        // Relay-authored messages must never re-enter the pipeline, or a
        // re-posted translation would translate itself forever.
        if event.via_relay.is_some() {
            trace!("relay-authored event ignored. channel id '{channel_id}', msg id '{message_id}'");
            return Outcome::Filtered(SkipReason::RelayAuthored);
        }

        let pref = match self.prefs.get(&event.author_id).await {
            Ok(Some(pref)) if pref.auto_enabled => pref,
            Ok(Some(_)) => return Outcome::Filtered(SkipReason::Disabled),
            Ok(None) => return Outcome::Filtered(SkipReason::NoPreference),
            Err(err) => {
                warn!("preference lookup failed. user id '{}', err: '{err}'", event.author_id);
                return Outcome::Failed(FailureKind::Store);
            }
        };

        if event.content.trim().is_empty() {
            return Outcome::Filtered(SkipReason::EmptyContent);
        }

        if self.already_in_target(&event.content, pref.language) {
            trace!(
                "message already in target language. channel id '{channel_id}', msg id '{message_id}'"
            );
            return Outcome::Filtered(SkipReason::AlreadyInTarget);
        }

        trace!("translating message. channel id '{channel_id}', msg id '{message_id}'");

        let request = TranslationRequest {
            source_text: event.content.clone(),
            target_language: pref.language,
            formality: None,
        };
        let translated = match time::timeout(
            config::TRANSLATE_TIMEOUT,
            self.translator.translate(request),
        )
        .await
        {
            Ok(Ok(result)) => result.translated_text,
            Ok(Err(err)) => {
                warn!("translation failed. channel id '{channel_id}', msg id '{message_id}', err: '{err}'");
                return Outcome::Failed(match err {
                    TranslateError::UnsupportedLanguage => FailureKind::UnsupportedLanguage,
                    TranslateError::QuotaExceeded => FailureKind::QuotaExceeded,
                    TranslateError::ServiceUnavailable(_) => FailureKind::ServiceUnavailable,
                });
            }
            Err(_) => {
                warn!("translation timed out. channel id '{channel_id}', msg id '{message_id}'");
                return Outcome::Failed(FailureKind::ServiceUnavailable);
            }
        };

        let handle = match self.acquire_relay(channel_id).await {
            Ok(handle) => handle,
            Err(kind) => return Outcome::Failed(kind),
        };

        let post_id = match self.post(&handle, event, &translated).await {
            Ok(post_id) => post_id,
            Err(RelayError::Invalid) => {
                // The cached identity died on the platform. Recreate and
                // retry exactly once.
                info!("cached relay identity invalid, recreating. channel id '{channel_id}'");
                match self.relay_ids.invalidate(channel_id).await {
                    Ok(Some(stale)) => {
                        if let Err(err) = self.platform.delete_relay(&stale).await {
                            debug!("stale relay cleanup failed. channel id '{channel_id}', err: '{err}'");
                        }
                    }
                    Ok(None) => {}
                    Err(err) => {
                        warn!("relay invalidation failed. channel id '{channel_id}', err: '{err}'");
                        return Outcome::Failed(FailureKind::Store);
                    }
                }

                let fresh = match self.acquire_relay(channel_id).await {
                    Ok(handle) => handle,
                    Err(kind) => return Outcome::Failed(kind),
                };
                match self.post(&fresh, event, &translated).await {
                    Ok(post_id) => post_id,
                    Err(err) => {
                        warn!("relay retry failed. channel id '{channel_id}', msg id '{message_id}', err: '{err}'");
                        return Outcome::Failed(FailureKind::RelayUnavailable);
                    }
                }
            }
            Err(err) => {
                warn!("relay post failed. channel id '{channel_id}', msg id '{message_id}', err: '{err}'");
                return Outcome::Failed(FailureKind::RelayUnavailable);
            }
        };

        // Only now is the original expendable. A deletion failure is logged
        // and not rolled back: a duplicate beats losing the content.
        match time::timeout(
            config::RELAY_TIMEOUT,
            self.platform.delete_message(channel_id, message_id),
        )
        .await
        {
            Ok(Ok(())) => {
                trace!("original deleted. channel id '{channel_id}', msg id '{message_id}'")
            }
            Ok(Err(err)) => {
                error!("failed to delete original after relay. channel id '{channel_id}', msg id '{message_id}', err: '{err}'")
            }
            Err(_) => {
                error!("timed out deleting original after relay. channel id '{channel_id}', msg id '{message_id}'")
            }
        }

        Outcome::Done { post_id }
    }

    async fn acquire_relay(&self, channel_id: &str) -> Result<RelayHandle, FailureKind> {
        let platform = &self.platform;
        let created = self
            .relay_ids
            .get_or_create(channel_id, || async {
                time::timeout(config::RELAY_TIMEOUT, platform.create_relay(channel_id))
                    .await
                    .map_err(|_| RelayError::Unavailable("timed out".into()))?
            })
            .await;

        match created {
            Ok(handle) => Ok(handle),
            Err(RelayCacheError::Create(err)) => {
                warn!("relay identity unavailable. channel id '{channel_id}', err: '{err}'");
                Err(FailureKind::RelayUnavailable)
            }
            Err(RelayCacheError::Store(err)) => {
                warn!("relay identity store failed. channel id '{channel_id}', err: '{err}'");
                Err(FailureKind::Store)
            }
        }
    }

    async fn post(
        &self,
        handle: &RelayHandle,
        event: &MessageEvent,
        text: &str,
    ) -> Result<String, RelayError> {
        time::timeout(
            config::RELAY_TIMEOUT,
            self.platform.post_as(
                handle,
                text,
                &event.author_display_name,
                event.author_avatar_url.as_deref(),
            ),
        )
        .await
        .map_err(|_| RelayError::Unavailable("timed out".into()))?
    }

    fn already_in_target(&self, text: &str, target: Language) -> bool {
        let (Some(detector), Some(target)) = (self.detector.as_deref(), target.detection_language())
        else {
            return false;
        };
        detector.detect_language_of(text) == Some(target)
    }
}

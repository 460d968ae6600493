mod cmd;
pub mod config;
mod discord;
mod handler;
mod intake;
mod lang;
mod pipeline;
mod platform;
mod store;
mod translate;

use std::sync::Arc;

use lingua::LanguageDetectorBuilder;
use spdlog::prelude::*;
use tokio::sync::mpsc;

use crate::{
    cmd::Command,
    config::Settings,
    discord::Discord,
    pipeline::Pipeline,
    platform::{ChatPlatform, MessageEvent},
    store::{JsonDocStore, Preferences, RelayIdentityCache},
    translate::{DeepL, Translator},
};

pub struct InstanceState {
    pub prefs: Arc<Preferences>,
    pub platform: Arc<dyn ChatPlatform>,
    pub translator: Arc<dyn Translator>,
    pub pipeline: Pipeline,
}

impl InstanceState {
    async fn new(settings: &Settings) -> anyhow::Result<Arc<Self>> {
        lang::validate_table()?;

        tokio::fs::create_dir_all(&settings.state_dir).await?;
        info!("state directory '{}'", settings.state_dir.display());

        let prefs = Arc::new(Preferences::new(
            JsonDocStore::open(settings.state_dir.join("preferences.json")).await?,
        ));
        let relay_ids = Arc::new(RelayIdentityCache::new(
            JsonDocStore::open(settings.state_dir.join("relay_identities.json")).await?,
        ));

        let platform: Arc<dyn ChatPlatform> = Arc::new(Discord::new(settings.bot_token.clone())?);
        let translator: Arc<dyn Translator> = Arc::new(DeepL::new(settings.deepl_key.clone())?);

        let detector =
            Arc::new(LanguageDetectorBuilder::from_languages(&lang::detection_languages()).build());

        let pipeline = Pipeline::new(
            Arc::clone(&prefs),
            relay_ids,
            Arc::clone(&platform),
            Arc::clone(&translator),
            Some(detector),
        );

        Ok(Arc::new(Self {
            prefs,
            platform,
            translator,
            pipeline,
        }))
    }
}

pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let state = InstanceState::new(&settings).await?;

    let (tx, mut rx) = mpsc::channel::<MessageEvent>(512);

    info!("listening for message events on {}", settings.bind_addr);

    let dispatch = async {
        while let Some(event) = rx.recv().await {
            let state = Arc::clone(&state);
            tokio::spawn(async move {
                dispatch_event(state, event).await;
            });
        }
        Ok::<_, anyhow::Error>(())
    };

    tokio::select! {
        res = intake::serve(settings.bind_addr, tx, settings.event_secret.clone()) => res,
        res = dispatch => res,
    }
}

async fn dispatch_event(state: Arc<InstanceState>, event: MessageEvent) {
    // Commands are only accepted from real users; relay-authored content is
    // handed to the pipeline, whose first filter drops it.
    let req = match Command::parse(&event.content) {
        Some(cmd) if event.via_relay.is_none() => handler::Request::new_command(state, event, cmd),
        _ => handler::Request::new_message(state, event),
    };
    handler::handle(req).await;
}

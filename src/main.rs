use std::process::exit;

use bot::config::{self, Settings};
use spdlog::prelude::*;

#[tokio::main]
async fn main() {
    setup_logger();

    info!("{} startup!", config::PACKAGE.name);
    info!("current version: {}", config::PACKAGE.version);

    if let Err(err) = run().await {
        error!("exited with err: {err}");
        exit(1);
    }
}

fn setup_logger() {
    if cfg!(debug_assertions) {
        spdlog::default_logger().set_level_filter(LevelFilter::All)
    }
}

async fn run() -> anyhow::Result<()> {
    let settings = Settings::from_env()?;
    bot::run(settings).await
}

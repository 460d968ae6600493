use std::{env, net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::{anyhow, Context};
use const_format::formatcp;

pub const BOT_TOKEN_ENV_VAR: &str = "DCBOT_AUTO_TRANSLATE_BOT_TOKEN";
pub const DEEPL_KEY_ENV_VAR: &str = "DCBOT_AUTO_TRANSLATE_DEEPL_KEY";
pub const BIND_ADDR_ENV_VAR: &str = "DCBOT_AUTO_TRANSLATE_BIND_ADDR";
pub const STATE_DIR_ENV_VAR: &str = "DCBOT_AUTO_TRANSLATE_STATE_DIR";
pub const EVENT_SECRET_ENV_VAR: &str = "DCBOT_AUTO_TRANSLATE_EVENT_SECRET";

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8060";

pub const TRANSLATE_TIMEOUT: Duration = Duration::from_secs(15);
pub const RELAY_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Package {
    pub name: &'static str,
    pub version: &'static str,
}

pub const PACKAGE: Package = Package {
    name: env!("CARGO_PKG_NAME"),
    version: env!("CARGO_PKG_VERSION"),
};

pub const USER_AGENT: &str = formatcp!("{}/{}", PACKAGE.name, PACKAGE.version);

#[derive(Clone)]
pub struct Settings {
    pub bot_token: String,
    pub deepl_key: String,
    pub bind_addr: SocketAddr,
    pub state_dir: PathBuf,
    pub event_secret: Option<String>,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            bot_token: env::var(BOT_TOKEN_ENV_VAR)
                .with_context(|| format!("env var `{BOT_TOKEN_ENV_VAR}` is not set"))?,
            deepl_key: env::var(DEEPL_KEY_ENV_VAR)
                .with_context(|| format!("env var `{DEEPL_KEY_ENV_VAR}` is not set"))?,
            bind_addr: env::var(BIND_ADDR_ENV_VAR)
                .unwrap_or_else(|_| DEFAULT_BIND_ADDR.into())
                .parse()
                .with_context(|| format!("env var `{BIND_ADDR_ENV_VAR}` is not a socket address"))?,
            state_dir: match env::var(STATE_DIR_ENV_VAR) {
                Ok(dir) => PathBuf::from(dir),
                Err(_) => default_state_dir()?,
            },
            event_secret: env::var(EVENT_SECRET_ENV_VAR).ok(),
        })
    }
}

fn default_state_dir() -> anyhow::Result<PathBuf> {
    let base = dirs::data_local_dir()
        .ok_or_else(|| anyhow!("no local data directory on this platform, set `{STATE_DIR_ENV_VAR}`"))?;
    Ok(base.join(PACKAGE.name))
}

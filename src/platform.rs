use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One newly created message, as delivered by the event feed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEvent {
    pub author_id: String,
    pub channel_id: String,
    pub message_id: String,
    pub content: String,
    pub author_display_name: String,
    #[serde(default)]
    pub author_avatar_url: Option<String>,
    /// Set when the message was posted through a relay identity.
    #[serde(default)]
    pub via_relay: Option<String>,
}

/// A channel-scoped identity the bot can post through while impersonating an
/// arbitrary display name and avatar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayHandle {
    pub id: String,
    pub token: String,
}

#[derive(Debug, Error)]
pub enum RelayError {
    /// The platform refused to provision or serve a relay identity
    /// (rate limited, forbidden, unreachable, timed out).
    #[error("relay unavailable: {0}")]
    Unavailable(String),
    /// The handle no longer exists on the platform.
    #[error("relay identity is no longer valid")]
    Invalid,
}

#[derive(Debug, Error)]
pub enum DeleteError {
    #[error("message not found")]
    NotFound,
    #[error("deletion failed: {0}")]
    Other(String),
}

/// Outbound platform capabilities consumed by the pipeline and the command
/// surface. The realtime inbound connection is not part of this contract.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    async fn create_relay(&self, channel_id: &str) -> Result<RelayHandle, RelayError>;

    /// Posts `text` through the relay identity, displayed as `display_name`
    /// with `avatar_url`. Returns the id of the created post.
    async fn post_as(
        &self,
        handle: &RelayHandle,
        text: &str,
        display_name: &str,
        avatar_url: Option<&str>,
    ) -> Result<String, RelayError>;

    async fn delete_relay(&self, handle: &RelayHandle) -> Result<(), RelayError>;

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), DeleteError>;

    /// Best-effort plain message into a channel, optionally as a reply.
    async fn send_notice(
        &self,
        channel_id: &str,
        text: &str,
        reply_to: Option<&str>,
    ) -> Result<(), RelayError>;
}

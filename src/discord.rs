use async_trait::async_trait;
use serde::Deserialize;
use serde_json as json;
use spdlog::prelude::*;

use crate::{
    config,
    platform::{ChatPlatform, DeleteError, RelayError, RelayHandle},
};

const API_BASE: &str = "https://discord.com/api/v10";

/// Outbound REST surface of the chat platform. Relay identities are channel
/// webhooks; the impersonation is the per-post `username`/`avatar_url`
/// override, nothing is created on the platform beyond the webhook itself.
pub struct Discord {
    http: reqwest::Client,
    api_base: String,
    token: String,
}

impl Discord {
    pub fn new(bot_token: impl Into<String>) -> anyhow::Result<Self> {
        Self::with_api_base(bot_token, API_BASE)
    }

    pub fn with_api_base(
        bot_token: impl Into<String>,
        api_base: impl Into<String>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder()
                .user_agent(config::USER_AGENT)
                .build()?,
            api_base: api_base.into(),
            token: bot_token.into(),
        })
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.token)
    }
}

#[derive(Deserialize)]
struct WebhookResponse {
    id: String,
    token: String,
}

#[derive(Deserialize)]
struct MessageResponse {
    id: String,
}

#[async_trait]
impl ChatPlatform for Discord {
    async fn create_relay(&self, channel_id: &str) -> Result<RelayHandle, RelayError> {
        let response = self
            .http
            .post(format!("{}/channels/{channel_id}/webhooks", self.api_base))
            .header("Authorization", self.auth_header())
            .json(&json::json!({ "name": config::PACKAGE.name }))
            .send()
            .await
            .map_err(|err| RelayError::Unavailable(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!("webhook creation rejected. channel id '{channel_id}', status '{status}', body '{body}'");
            return Err(RelayError::Unavailable(format!("status {status}")));
        }

        let webhook: WebhookResponse = response
            .json()
            .await
            .map_err(|err| RelayError::Unavailable(err.to_string()))?;

        Ok(RelayHandle {
            id: webhook.id,
            token: webhook.token,
        })
    }

    async fn post_as(
        &self,
        handle: &RelayHandle,
        text: &str,
        display_name: &str,
        avatar_url: Option<&str>,
    ) -> Result<String, RelayError> {
        let mut body = json::json!({
            "content": text,
            "username": display_name,
        });
        if let Some(avatar_url) = avatar_url {
            body["avatar_url"] = avatar_url.into();
        }

        let response = self
            .http
            .post(format!(
                "{}/webhooks/{}/{}?wait=true",
                self.api_base, handle.id, handle.token
            ))
            .json(&body)
            .send()
            .await
            .map_err(|err| RelayError::Unavailable(err.to_string()))?;

        let status = response.status();
        match status.as_u16() {
            _ if status.is_success() => {}
            // the webhook was deleted or its token rotated out from under us
            401 | 404 => return Err(RelayError::Invalid),
            _ => return Err(RelayError::Unavailable(format!("status {status}"))),
        }

        let posted: MessageResponse = response
            .json()
            .await
            .map_err(|err| RelayError::Unavailable(err.to_string()))?;

        Ok(posted.id)
    }

    async fn delete_relay(&self, handle: &RelayHandle) -> Result<(), RelayError> {
        let response = self
            .http
            .delete(format!(
                "{}/webhooks/{}/{}",
                self.api_base, handle.id, handle.token
            ))
            .send()
            .await
            .map_err(|err| RelayError::Unavailable(err.to_string()))?;

        let status = response.status();
        // already gone is as good as deleted
        if status.is_success() || status.as_u16() == 404 {
            Ok(())
        } else {
            Err(RelayError::Unavailable(format!("status {status}")))
        }
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), DeleteError> {
        let response = self
            .http
            .delete(format!(
                "{}/channels/{channel_id}/messages/{message_id}",
                self.api_base
            ))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|err| DeleteError::Other(err.to_string()))?;

        let status = response.status();
        match status.as_u16() {
            _ if status.is_success() => Ok(()),
            404 => Err(DeleteError::NotFound),
            _ => Err(DeleteError::Other(format!("status {status}"))),
        }
    }

    async fn send_notice(
        &self,
        channel_id: &str,
        text: &str,
        reply_to: Option<&str>,
    ) -> Result<(), RelayError> {
        let mut body = json::json!({ "content": text });
        if let Some(message_id) = reply_to {
            body["message_reference"] = json::json!({ "message_id": message_id });
        }

        let response = self
            .http
            .post(format!("{}/channels/{channel_id}/messages", self.api_base))
            .header("Authorization", self.auth_header())
            .json(&body)
            .send()
            .await
            .map_err(|err| RelayError::Unavailable(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(RelayError::Unavailable(format!("status {status}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use wiremock::{
        matchers::{body_string_contains, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;

    fn adapter(server: &MockServer) -> Discord {
        Discord::with_api_base("bot-token", server.uri()).unwrap()
    }

    fn handle() -> RelayHandle {
        RelayHandle {
            id: "wh1".into(),
            token: "wh1-token".into(),
        }
    }

    #[tokio::test]
    async fn creates_webhook_as_relay_identity() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/channels/c1/webhooks"))
            .and(header("Authorization", "Bot bot-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "wh1",
                "token": "wh1-token",
                "name": "dcbot-auto-translate"
            })))
            .mount(&server)
            .await;

        let created = adapter(&server).create_relay("c1").await.unwrap();
        assert_eq!(created, handle());
    }

    #[tokio::test]
    async fn rate_limited_creation_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/channels/c1/webhooks"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = adapter(&server).create_relay("c1").await.unwrap_err();
        assert!(matches!(err, RelayError::Unavailable(_)));
    }

    #[tokio::test]
    async fn posts_with_impersonation_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/webhooks/wh1/wh1-token"))
            .and(body_string_contains(r#""username":"Alice""#))
            .and(body_string_contains(r#""avatar_url":"https://cdn.example/a.png""#))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "m9" })),
            )
            .mount(&server)
            .await;

        let post_id = adapter(&server)
            .post_as(
                &handle(),
                "hallo",
                "Alice",
                Some("https://cdn.example/a.png"),
            )
            .await
            .unwrap();
        assert_eq!(post_id, "m9");
    }

    #[tokio::test]
    async fn deleted_webhook_reports_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/webhooks/wh1/wh1-token"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = adapter(&server)
            .post_as(&handle(), "hallo", "Alice", None)
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Invalid));
    }

    #[tokio::test]
    async fn missing_message_reports_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/channels/c1/messages/m1"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = adapter(&server)
            .delete_message("c1", "m1")
            .await
            .unwrap_err();
        assert!(matches!(err, DeleteError::NotFound));
    }

    #[tokio::test]
    async fn notice_replies_to_original_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/channels/c1/messages"))
            .and(body_string_contains(r#""message_id":"m1""#))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "m2" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        adapter(&server)
            .send_notice("c1", "couldn't translate that", Some("m1"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn deleting_stale_relay_tolerates_absence() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/webhooks/wh1/wh1-token"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        adapter(&server).delete_relay(&handle()).await.unwrap();
    }
}

use async_trait::async_trait;
use serde::Deserialize;
use spdlog::prelude::*;
use thiserror::Error;

use crate::{config, lang::Language};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formality {
    More,
    Less,
}

#[derive(Debug, Clone)]
pub struct TranslationRequest {
    pub source_text: String,
    pub target_language: Language,
    pub formality: Option<Formality>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationResult {
    pub translated_text: String,
}

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("the translation service does not support this language")]
    UnsupportedLanguage,
    #[error("translation quota exhausted")]
    QuotaExceeded,
    #[error("translation service unavailable: {0}")]
    ServiceUnavailable(String),
}

#[derive(Debug, Clone, Copy)]
pub struct Usage {
    pub used: u64,
    pub limit: u64,
}

/// Contract to the external translation capability. No caching, no retry:
/// retry policy belongs to the caller.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(
        &self,
        request: TranslationRequest,
    ) -> Result<TranslationResult, TranslateError>;

    async fn usage(&self) -> Result<Usage, TranslateError>;
}

pub struct DeepL {
    http: reqwest::Client,
    api_base: String,
    auth_key: String,
}

impl DeepL {
    /// Free-tier auth keys carry an `:fx` suffix and live on a separate host.
    pub fn new(auth_key: impl Into<String>) -> anyhow::Result<Self> {
        let auth_key = auth_key.into();
        let api_base = if auth_key.ends_with(":fx") {
            "https://api-free.deepl.com"
        } else {
            "https://api.deepl.com"
        };
        Self::with_api_base(auth_key, api_base)
    }

    pub fn with_api_base(
        auth_key: impl Into<String>,
        api_base: impl Into<String>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder()
                .user_agent(config::USER_AGENT)
                .build()?,
            api_base: api_base.into(),
            auth_key: auth_key.into(),
        })
    }

    fn auth_header(&self) -> String {
        format!("DeepL-Auth-Key {}", self.auth_key)
    }
}

#[derive(Deserialize)]
struct TranslateResponse {
    translations: Vec<Translation>,
}

#[derive(Deserialize)]
struct Translation {
    text: String,
}

#[derive(Deserialize)]
struct UsageResponse {
    character_count: u64,
    character_limit: u64,
}

#[async_trait]
impl Translator for DeepL {
    async fn translate(
        &self,
        request: TranslationRequest,
    ) -> Result<TranslationResult, TranslateError> {
        let mut form = vec![
            ("text", request.source_text),
            ("target_lang", request.target_language.code().to_owned()),
        ];
        match request.formality {
            Some(Formality::More) => form.push(("formality", "prefer_more".to_owned())),
            Some(Formality::Less) => form.push(("formality", "prefer_less".to_owned())),
            None => {}
        }

        let response = self
            .http
            .post(format!("{}/v2/translate", self.api_base))
            .header("Authorization", self.auth_header())
            .form(&form)
            .send()
            .await
            .map_err(|err| TranslateError::ServiceUnavailable(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!("translation request rejected. status '{status}', body '{body}'");
            return Err(match status.as_u16() {
                // quota of the billing period exhausted
                456 => TranslateError::QuotaExceeded,
                400 => TranslateError::UnsupportedLanguage,
                _ => TranslateError::ServiceUnavailable(format!("status {status}")),
            });
        }

        let parsed: TranslateResponse = response
            .json()
            .await
            .map_err(|err| TranslateError::ServiceUnavailable(err.to_string()))?;

        let translation = parsed
            .translations
            .into_iter()
            .next()
            .ok_or_else(|| TranslateError::ServiceUnavailable("empty response".into()))?;

        Ok(TranslationResult {
            translated_text: translation.text,
        })
    }

    async fn usage(&self) -> Result<Usage, TranslateError> {
        let response = self
            .http
            .get(format!("{}/v2/usage", self.api_base))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|err| TranslateError::ServiceUnavailable(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status.as_u16() {
                456 => TranslateError::QuotaExceeded,
                _ => TranslateError::ServiceUnavailable(format!("status {status}")),
            });
        }

        let parsed: UsageResponse = response
            .json()
            .await
            .map_err(|err| TranslateError::ServiceUnavailable(err.to_string()))?;

        Ok(Usage {
            used: parsed.character_count,
            limit: parsed.character_limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use wiremock::{
        matchers::{body_string_contains, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;

    fn client(server: &MockServer) -> DeepL {
        DeepL::with_api_base("test-key:fx", server.uri()).unwrap()
    }

    fn request(text: &str, code: &str, formality: Option<Formality>) -> TranslationRequest {
        TranslationRequest {
            source_text: text.into(),
            target_language: Language::from_code(code).unwrap(),
            formality,
        }
    }

    #[test]
    fn key_suffix_selects_api_host() {
        let free = DeepL::new("k:fx").unwrap();
        assert_eq!(free.api_base, "https://api-free.deepl.com");

        let pro = DeepL::new("k").unwrap();
        assert_eq!(pro.api_base, "https://api.deepl.com");
    }

    #[tokio::test]
    async fn translates_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/translate"))
            .and(header("Authorization", "DeepL-Auth-Key test-key:fx"))
            .and(body_string_contains("target_lang=DE"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "translations": [
                    { "detected_source_language": "EN", "text": "hallo" }
                ]
            })))
            .mount(&server)
            .await;

        let result = client(&server)
            .translate(request("hello", "DE", None))
            .await
            .unwrap();
        assert_eq!(result.translated_text, "hallo");
    }

    #[tokio::test]
    async fn formality_hint_is_forwarded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/translate"))
            .and(body_string_contains("formality=prefer_more"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "translations": [{ "text": "guten Tag" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .translate(request("hello", "DE", Some(Formality::More)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn quota_status_maps_to_quota_exceeded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/translate"))
            .respond_with(ResponseTemplate::new(456))
            .mount(&server)
            .await;

        let err = client(&server)
            .translate(request("hello", "DE", None))
            .await
            .unwrap_err();
        assert!(matches!(err, TranslateError::QuotaExceeded));
    }

    #[tokio::test]
    async fn bad_request_maps_to_unsupported_language() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/translate"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_string(r#"{"message":"Value for 'target_lang' not supported."}"#),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .translate(request("hello", "DE", None))
            .await
            .unwrap_err();
        assert!(matches!(err, TranslateError::UnsupportedLanguage));
    }

    #[tokio::test]
    async fn server_error_maps_to_service_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/translate"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(&server)
            .translate(request("hello", "DE", None))
            .await
            .unwrap_err();
        assert!(matches!(err, TranslateError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn empty_translation_list_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/translate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "translations": [] })),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .translate(request("hello", "DE", None))
            .await
            .unwrap_err();
        assert!(matches!(err, TranslateError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn reports_usage() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/usage"))
            .and(header("Authorization", "DeepL-Auth-Key test-key:fx"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "character_count": 30315,
                "character_limit": 500000
            })))
            .mount(&server)
            .await;

        let usage = client(&server).usage().await.unwrap();
        assert_eq!(usage.used, 30315);
        assert_eq!(usage.limit, 500000);
    }
}

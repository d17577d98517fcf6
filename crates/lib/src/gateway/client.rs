//! HTTP client for the bot backends.
//!
//! Chat goes to `<apiUrl>/chat`, or `<faqUrl>/chat` for the FAQ bot. Speech and health live on the
//! general service: `/speech/stt`, `/speech/tts`, `/health`.

use crate::bots::BotType;
use crate::config::{self, Config};
use crate::gateway::error::GatewayError;
use crate::gateway::protocol::{
    ChatRequest, ChatResponse, SpeechToTextRequest, SpeechToTextResponse, TextToSpeechRequest,
    TextToSpeechResponse,
};
use crate::gateway::BotBackend;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

const DEFAULT_CHAT_RETRIES: u32 = 2;

/// Client for the bot backend HTTP API.
#[derive(Clone)]
pub struct BotClient {
    api_url: String,
    faq_url: String,
    chat_retries: u32,
    client: reqwest::Client,
}

impl BotClient {
    pub fn new(api_url: impl Into<String>, faq_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            faq_url: faq_url.into().trim_end_matches('/').to_string(),
            chat_retries: DEFAULT_CHAT_RETRIES,
            client: reqwest::Client::new(),
        }
    }

    /// Build from config (env overrides applied), with the configured timeout and retry count.
    pub fn from_config(config: &Config) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.backend.timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            api_url: config::resolve_api_url(config),
            faq_url: config::resolve_faq_url(config),
            chat_retries: config.backend.chat_retries,
            client,
        })
    }

    /// Number of extra attempts after a failed chat send.
    pub fn with_chat_retries(mut self, retries: u32) -> Self {
        self.chat_retries = retries;
        self
    }

    /// Chat endpoint for a bot id. The FAQ bot has its own service.
    pub fn chat_endpoint(&self, bot_id: &str) -> String {
        if bot_id == BotType::Faq.id() {
            format!("{}/chat", self.faq_url)
        } else {
            format!("{}/chat", self.api_url)
        }
    }

    async fn post_json<Req, Res>(&self, url: &str, body: &Req) -> Result<Res, GatewayError>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let res = self.client.post(url).json(body).send().await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(GatewayError::from_response(
                status.as_u16(),
                status.canonical_reason().unwrap_or(""),
                url,
                &body,
            ));
        }
        Ok(res.json().await?)
    }
}

#[async_trait]
impl BotBackend for BotClient {
    /// POST the chat turn, retrying up to `chat_retries` more times on any failure.
    async fn send_message(&self, request: &ChatRequest) -> Result<ChatResponse, GatewayError> {
        let url = self.chat_endpoint(&request.bot_id);
        let attempts = self.chat_retries + 1;
        let mut attempt = 1;
        loop {
            match self.post_json::<_, ChatResponse>(&url, request).await {
                Ok(res) => return Ok(res),
                Err(e) if attempt < attempts => {
                    log::warn!(
                        "chat send attempt {}/{} to {} failed: {}",
                        attempt,
                        attempts,
                        url,
                        e
                    );
                    attempt += 1;
                }
                Err(e) => {
                    log::error!("chat send to {} failed after {} attempts: {}", url, attempts, e);
                    return Err(e);
                }
            }
        }
    }

    /// POST /speech/stt. Not retried.
    async fn speech_to_text(
        &self,
        request: &SpeechToTextRequest,
    ) -> Result<SpeechToTextResponse, GatewayError> {
        let url = format!("{}/speech/stt", self.api_url);
        self.post_json(&url, request).await.map_err(|e| {
            log::error!("speech-to-text failed: {}", e);
            e
        })
    }

    /// POST /speech/tts. Not retried.
    async fn text_to_speech(
        &self,
        request: &TextToSpeechRequest,
    ) -> Result<TextToSpeechResponse, GatewayError> {
        let url = format!("{}/speech/tts", self.api_url);
        self.post_json(&url, request).await.map_err(|e| {
            log::error!("text-to-speech failed: {}", e);
            e
        })
    }

    /// GET /health. Returns `status` from a JSON body, else the trimmed body text.
    async fn health_check(&self) -> Result<String, GatewayError> {
        let url = format!("{}/health", self.api_url);
        let res = self.client.get(&url).send().await?;
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(GatewayError::from_response(
                status.as_u16(),
                status.canonical_reason().unwrap_or(""),
                &url,
                &body,
            ));
        }
        let parsed = serde_json::from_str::<serde_json::Value>(&body).ok();
        let text = match parsed {
            Some(serde_json::Value::Object(map)) => map
                .get("status")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| body.trim().to_string()),
            Some(serde_json::Value::String(s)) => s,
            _ => body.trim().to_string(),
        };
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faq_bot_routes_to_its_own_service() {
        let c = BotClient::new("http://localhost:5000/api/", "http://localhost:5119/api/faq");
        assert_eq!(c.chat_endpoint("faq-bot"), "http://localhost:5119/api/faq/chat");
        assert_eq!(c.chat_endpoint("quote-auto"), "http://localhost:5000/api/chat");
    }

    #[test]
    fn unknown_bot_ids_use_general_service() {
        let c = BotClient::new("http://a/api", "http://b/faq");
        assert_eq!(c.chat_endpoint("something-else"), "http://a/api/chat");
    }

    #[test]
    fn from_config_uses_backend_section() {
        let mut config = Config::default();
        config.backend.api_url = "http://bots.test/api/".to_string();
        config.backend.chat_retries = 0;
        let c = BotClient::from_config(&config).unwrap();
        assert_eq!(c.chat_retries, 0);
        if std::env::var("BOTCHAT_API_URL").is_err() {
            assert_eq!(c.chat_endpoint("quote-auto"), "http://bots.test/api/chat");
        }
    }
}

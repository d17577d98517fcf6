//! Bot backend wire types (chat, speech-to-text, text-to-speech).

use serde::{Deserialize, Serialize};

/// POST body for a chat turn: `{ "sessionId", "botId", "message" }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub session_id: String,
    pub bot_id: String,
    pub message: String,
}

/// Bot reply for one chat turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub bot_id: String,
    #[serde(default)]
    pub response: String,
    /// Set when the bot considers the conversation finished (e.g. quote processed).
    #[serde(default)]
    pub is_complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl ChatResponse {
    /// `metadata.sources` rendered for display: list entries comma-joined, a scalar as-is.
    /// None when absent, null, or an empty list.
    pub fn sources(&self) -> Option<String> {
        let value = self.metadata.as_ref()?.get("sources")?;
        let joined = match value {
            serde_json::Value::Null => return None,
            serde_json::Value::Array(items) => items
                .iter()
                .map(value_to_text)
                .collect::<Vec<_>>()
                .join(", "),
            other => value_to_text(other),
        };
        if joined.trim().is_empty() {
            None
        } else {
            Some(joined)
        }
    }
}

fn value_to_text(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// POST body for speech recognition. Audio is base64 without a data-URL prefix.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechToTextRequest {
    pub audio_base64: String,
    pub audio_format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechToTextResponse {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// POST body for speech synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextToSpeechRequest {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speech_rate: Option<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextToSpeechResponse {
    #[serde(default)]
    pub audio_base64: String,
    #[serde(default)]
    pub audio_format: String,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub audio_size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response_with(metadata: serde_json::Value) -> ChatResponse {
        serde_json::from_value(json!({
            "sessionId": "s",
            "botId": "faq-bot",
            "response": "r",
            "isComplete": false,
            "metadata": metadata
        }))
        .unwrap()
    }

    #[test]
    fn chat_request_uses_camel_case() {
        let req = ChatRequest {
            session_id: "session-1".into(),
            bot_id: "faq-bot".into(),
            message: "hola".into(),
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({ "sessionId": "session-1", "botId": "faq-bot", "message": "hola" })
        );
    }

    #[test]
    fn sources_list_is_comma_joined() {
        let r = response_with(json!({ "sources": ["a.pdf", "b.pdf"] }));
        assert_eq!(r.sources().as_deref(), Some("a.pdf, b.pdf"));
    }

    #[test]
    fn sources_scalar_is_used_as_is() {
        let r = response_with(json!({ "sources": "manual.pdf" }));
        assert_eq!(r.sources().as_deref(), Some("manual.pdf"));
    }

    #[test]
    fn missing_or_empty_sources() {
        assert_eq!(response_with(json!({})).sources(), None);
        assert_eq!(response_with(json!({ "sources": [] })).sources(), None);
        assert_eq!(response_with(json!({ "sources": null })).sources(), None);
    }

    #[test]
    fn minimal_chat_response_parses() {
        let r: ChatResponse = serde_json::from_str(r#"{"response":"ok"}"#).unwrap();
        assert_eq!(r.response, "ok");
        assert!(!r.is_complete);
        assert!(r.metadata.is_none());
    }
}

//! Bot gateway: request/response contracts with the remote bots.
//!
//! `BotBackend` is the seam the conversation talks to; `BotClient` is the HTTP binding.
//! Chat sends are retried by the client; speech calls are not.

mod client;
mod error;
mod protocol;

pub use client::BotClient;
pub use error::GatewayError;
pub use protocol::{
    ChatRequest, ChatResponse, SpeechToTextRequest, SpeechToTextResponse, TextToSpeechRequest,
    TextToSpeechResponse,
};

use crate::audio::{decode_audio, RecordedAudio, SynthesizedAudio};
use crate::config::SpeechConfig;
use async_trait::async_trait;

/// A remote bot service.
#[async_trait]
pub trait BotBackend: Send + Sync {
    async fn send_message(&self, request: &ChatRequest) -> Result<ChatResponse, GatewayError>;

    async fn speech_to_text(
        &self,
        request: &SpeechToTextRequest,
    ) -> Result<SpeechToTextResponse, GatewayError>;

    async fn text_to_speech(
        &self,
        request: &TextToSpeechRequest,
    ) -> Result<TextToSpeechResponse, GatewayError>;

    /// Backend status string.
    async fn health_check(&self) -> Result<String, GatewayError>;

    /// Transcribe a clip to text. Unsuccessful, empty or low-confidence results are `Recognition` errors.
    async fn transcribe(
        &self,
        audio: &RecordedAudio,
        speech: &SpeechConfig,
    ) -> Result<String, GatewayError> {
        let request = SpeechToTextRequest {
            audio_base64: audio.base64.clone(),
            audio_format: audio.format.clone(),
            language: Some(speech.language.clone()),
            sample_rate: None,
        };
        let res = self.speech_to_text(&request).await?;
        if !res.success {
            return Err(GatewayError::Recognition(
                res.error_message
                    .unwrap_or_else(|| "recognition was not successful".to_string()),
            ));
        }
        let text = res.text.trim();
        if text.is_empty() {
            return Err(GatewayError::Recognition("empty transcript".to_string()));
        }
        if let (Some(min), Some(confidence)) = (speech.min_confidence, res.confidence) {
            if confidence < min {
                return Err(GatewayError::Recognition(format!(
                    "confidence {:.2} below {:.2}",
                    confidence, min
                )));
            }
        }
        Ok(text.to_string())
    }

    /// Synthesize speech for `text` and decode it.
    async fn synthesize(
        &self,
        text: &str,
        speech: &SpeechConfig,
    ) -> Result<SynthesizedAudio, GatewayError> {
        let request = TextToSpeechRequest {
            text: text.to_string(),
            voice: speech.voice.clone(),
            audio_format: None,
            language: Some(speech.language.clone()),
            speech_rate: None,
        };
        let res = self.text_to_speech(&request).await?;
        if !res.success {
            return Err(GatewayError::Synthesis(
                res.error_message
                    .unwrap_or_else(|| "synthesis was not successful".to_string()),
            ));
        }
        let bytes =
            decode_audio(&res.audio_base64).map_err(|e| GatewayError::Synthesis(e.to_string()))?;
        let format = if res.audio_format.trim().is_empty() {
            "audio/mpeg".to_string()
        } else {
            res.audio_format
        };
        Ok(SynthesizedAudio { bytes, format })
    }
}

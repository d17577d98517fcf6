//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.botchat/config.json`) and environment.
//! Every field is optional; a missing file yields the defaults below.

use crate::bots::BotType;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Bot backend endpoints and request policy.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Inactivity watchdog timings.
    #[serde(default)]
    pub inactivity: InactivityConfig,

    /// Speech-to-text and text-to-speech options.
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Widget behavior (default bot, timestamps, microphone).
    #[serde(default)]
    pub widget: WidgetConfig,
}

/// Where the bot backends live and how chat requests are retried.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    /// Base URL of the general bot service; also serves speech and health. Overridden by BOTCHAT_API_URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Base URL of the FAQ bot service. Overridden by BOTCHAT_FAQ_URL.
    #[serde(default = "default_faq_url")]
    pub faq_url: String,

    /// Additional attempts after a failed chat send (default 2, i.e. 3 attempts total).
    #[serde(default = "default_chat_retries")]
    pub chat_retries: u32,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_faq_url() -> String {
    "http://localhost:5119/api/faq".to_string()
}

fn default_chat_retries() -> u32 {
    2
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            faq_url: default_faq_url(),
            chat_retries: default_chat_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Inactivity watchdog timings in milliseconds, measured from the last user activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InactivityConfig {
    /// Show the warning after this long without activity (default 60s).
    #[serde(default = "default_warning_ms")]
    pub warning_ms: u64,
    /// Close the chat after this long without activity (default 120s). Must exceed `warning_ms`.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Grace delay between the closure notice and the actual close (default 2s).
    #[serde(default = "default_close_delay_ms")]
    pub close_delay_ms: u64,
    /// Countdown tick interval (default 1s).
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

fn default_warning_ms() -> u64 {
    60_000
}

fn default_timeout_ms() -> u64 {
    120_000
}

fn default_close_delay_ms() -> u64 {
    2_000
}

fn default_tick_ms() -> u64 {
    1_000
}

impl Default for InactivityConfig {
    fn default() -> Self {
        Self {
            warning_ms: default_warning_ms(),
            timeout_ms: default_timeout_ms(),
            close_delay_ms: default_close_delay_ms(),
            tick_ms: default_tick_ms(),
        }
    }
}

impl InactivityConfig {
    pub fn warning(&self) -> Duration {
        Duration::from_millis(self.warning_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn close_delay(&self) -> Duration {
        Duration::from_millis(self.close_delay_ms)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Whole seconds shown in the countdown when the warning appears.
    pub fn countdown_seconds(&self) -> u64 {
        self.timeout_ms.saturating_sub(self.warning_ms) / 1000
    }

    /// Reject timings the watchdog cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms <= self.warning_ms {
            anyhow::bail!(
                "inactivity.timeoutMs ({}) must be greater than inactivity.warningMs ({})",
                self.timeout_ms,
                self.warning_ms
            );
        }
        if self.tick_ms == 0 {
            anyhow::bail!("inactivity.tickMs must be greater than zero");
        }
        Ok(())
    }
}

/// Speech options sent with transcription and synthesis requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    /// Recognition and synthesis language (default "es-MX").
    #[serde(default = "default_language")]
    pub language: String,
    /// Format of recorded audio (default "webm").
    #[serde(default = "default_audio_format")]
    pub audio_format: String,
    /// Synthesis voice.
    #[serde(default = "default_voice")]
    pub voice: Option<String>,
    /// When true, bot replies are synthesized and emitted as audio.
    #[serde(default)]
    pub speak_responses: bool,
    /// Transcripts reported below this confidence are rejected. None accepts any confidence.
    #[serde(default)]
    pub min_confidence: Option<f32>,
}

fn default_language() -> String {
    "es-MX".to_string()
}

fn default_audio_format() -> String {
    "webm".to_string()
}

fn default_voice() -> Option<String> {
    Some("es-MX-DaliaNeural".to_string())
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            audio_format: default_audio_format(),
            voice: default_voice(),
            speak_responses: false,
            min_confidence: None,
        }
    }
}

/// Widget behavior toggles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetConfig {
    /// Bot selected at startup.
    #[serde(default)]
    pub default_bot: BotType,
    /// Stamp user messages with the time they were sent.
    #[serde(default = "default_true")]
    pub enable_timestamps: bool,
    /// Allow the microphone button.
    #[serde(default = "default_true")]
    pub enable_microphone: bool,
}

fn default_true() -> bool {
    true
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            default_bot: BotType::default(),
            enable_timestamps: true,
            enable_microphone: true,
        }
    }
}

fn env_override(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.trim_end_matches('/').to_string())
        }
    })
}

/// Resolve the general bot base URL: env BOTCHAT_API_URL overrides config.
pub fn resolve_api_url(config: &Config) -> String {
    env_override("BOTCHAT_API_URL")
        .unwrap_or_else(|| config.backend.api_url.trim().trim_end_matches('/').to_string())
}

/// Resolve the FAQ bot base URL: env BOTCHAT_FAQ_URL overrides config.
pub fn resolve_faq_url(config: &Config) -> String {
    env_override("BOTCHAT_FAQ_URL")
        .unwrap_or_else(|| config.backend.faq_url.trim().trim_end_matches('/').to_string())
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("BOTCHAT_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".botchat").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the given path, BOTCHAT_CONFIG_PATH, or the default. Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config: Config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    config
        .inactivity
        .validate()
        .with_context(|| format!("validating config from {}", path.display()))?;
    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_inactivity_timings() {
        let c = InactivityConfig::default();
        assert_eq!(c.warning(), Duration::from_secs(60));
        assert_eq!(c.timeout(), Duration::from_secs(120));
        assert_eq!(c.close_delay(), Duration::from_secs(2));
        assert_eq!(c.tick(), Duration::from_secs(1));
        assert_eq!(c.countdown_seconds(), 60);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn timeout_must_exceed_warning() {
        let c = InactivityConfig {
            warning_ms: 5_000,
            timeout_ms: 5_000,
            ..InactivityConfig::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn countdown_is_zero_for_inverted_timings() {
        let c = InactivityConfig {
            warning_ms: 10_000,
            timeout_ms: 4_000,
            ..InactivityConfig::default()
        };
        assert_eq!(c.countdown_seconds(), 0);
    }

    #[test]
    fn countdown_floors_partial_seconds() {
        let c = InactivityConfig {
            warning_ms: 1_000,
            timeout_ms: 3_500,
            ..InactivityConfig::default()
        };
        assert_eq!(c.countdown_seconds(), 2);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: Config = serde_json::from_str(
            r#"{ "backend": { "apiUrl": "http://bots.internal/api" }, "widget": { "defaultBot": "faq-bot" } }"#,
        )
        .unwrap();
        assert_eq!(config.backend.api_url, "http://bots.internal/api");
        assert_eq!(config.backend.faq_url, "http://localhost:5119/api/faq");
        assert_eq!(config.backend.chat_retries, 2);
        assert_eq!(config.widget.default_bot, BotType::Faq);
        assert!(config.widget.enable_timestamps);
        assert_eq!(config.inactivity, InactivityConfig::default());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = std::env::temp_dir().join(format!("botchat-missing-{}.json", uuid::Uuid::new_v4()));
        let (config, used) = load_config(Some(path.clone())).unwrap();
        assert_eq!(used, path);
        assert_eq!(config.speech.language, "es-MX");
    }

    #[test]
    fn invalid_timings_in_file_are_rejected() {
        let path = std::env::temp_dir().join(format!("botchat-bad-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, r#"{ "inactivity": { "warningMs": 10000, "timeoutMs": 5000 } }"#).unwrap();
        let res = load_config(Some(path.clone()));
        let _ = std::fs::remove_file(&path);
        assert!(res.is_err());
    }
}

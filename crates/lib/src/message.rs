//! Chat log entries as shown in the window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Extra payload for link messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkConfig {
    pub link: String,
    pub message: String,
    pub label: String,
}

/// Extra payload for interactive-input messages (quick-reply options).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputConfig {
    pub message: String,
    pub options: Vec<String>,
}

/// Message type tag with its kind-specific payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "messageType", rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    Link {
        #[serde(rename = "linkConfig")]
        config: LinkConfig,
    },
    Input {
        #[serde(rename = "inputConfig")]
        config: InputConfig,
    },
}

/// A single entry in the conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub message: String,
    #[serde(flatten)]
    pub kind: MessageKind,
    #[serde(default)]
    pub from_user: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub error_state: bool,
}

impl Message {
    /// Plain text typed (or dictated) by the user.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            message: text.into(),
            kind: MessageKind::Text,
            from_user: true,
            timestamp: None,
            error_state: false,
        }
    }

    /// Plain text from the bot.
    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            message: text.into(),
            kind: MessageKind::Text,
            from_user: false,
            timestamp: None,
            error_state: false,
        }
    }

    /// Bot-side message flagged as an error.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            error_state: true,
            ..Self::bot(text)
        }
    }

    pub fn with_timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp = Some(at);
        self
    }
}

/// Render a log as plain text, one line per message.
pub fn transcript(messages: &[Message]) -> String {
    let mut out = String::new();
    for m in messages {
        let who = if m.from_user { "You" } else { "Bot" };
        if let Some(ts) = m.timestamp {
            out.push_str(&format!("[{}] ", ts.format("%Y-%m-%d %H:%M:%S")));
        }
        out.push_str(who);
        out.push_str(": ");
        out.push_str(&m.message);
        match &m.kind {
            MessageKind::Text => {}
            MessageKind::Link { config } => {
                out.push_str(&format!(" ({}: {})", config.label, config.link));
            }
            MessageKind::Input { config } => {
                out.push_str(&format!(" [{}]", config.options.join(" / ")));
            }
        }
        out.push('\n');
    }
    out
}

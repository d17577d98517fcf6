//! Bot catalog: the two backends the widget can talk to and their fixed UI configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which bot the widget is talking to. Serialized as the backend's bot id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BotType {
    /// General auto-insurance quote bot.
    #[default]
    #[serde(rename = "quote-auto")]
    QuoteAuto,
    /// Frequently-asked-questions bot; answers may cite source documents.
    #[serde(rename = "faq-bot")]
    Faq,
}

/// Color theme applied to the chat window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorTheme {
    Purple,
    Blue,
    Green,
}

/// Immutable per-bot UI record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotConfig {
    pub bot: BotType,
    pub title: &'static str,
    pub welcome_message: &'static str,
    pub avatar: &'static str,
    pub theme: ColorTheme,
}

static QUOTE_AUTO: BotConfig = BotConfig {
    bot: BotType::QuoteAuto,
    title: "Chubb Bot - Auto Quote",
    welcome_message: "Hi! I'm your auto insurance quote assistant. How can I help you?",
    avatar: "https://st5.depositphotos.com/72897924/62255/v/450/depositphotos_622556394-stock-illustration-robot-web-icon-vector-illustration.jpg",
    theme: ColorTheme::Purple,
};

static FAQ: BotConfig = BotConfig {
    bot: BotType::Faq,
    title: "Chubb Bot - Frequently Asked Questions",
    welcome_message: "Hi! I'm your FAQ assistant. I can answer questions about policies, coverage and more.",
    avatar: "https://cdn-icons-png.flaticon.com/512/4712/4712027.png",
    theme: ColorTheme::Blue,
};

impl BotType {
    pub const ALL: [BotType; 2] = [BotType::QuoteAuto, BotType::Faq];

    /// Stable backend identifier sent as `botId`.
    pub fn id(self) -> &'static str {
        match self {
            BotType::QuoteAuto => "quote-auto",
            BotType::Faq => "faq-bot",
        }
    }

    /// The bot's fixed UI configuration.
    pub fn config(self) -> &'static BotConfig {
        match self {
            BotType::QuoteAuto => &QUOTE_AUTO,
            BotType::Faq => &FAQ,
        }
    }
}

impl fmt::Display for BotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for BotType {
    type Err = String;

    /// Accepts the backend id or a short alias ("quote", "faq"), case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "quote-auto" | "quote" | "auto" => Ok(BotType::QuoteAuto),
            "faq-bot" | "faq" => Ok(BotType::Faq),
            other => Err(format!("unknown bot: {}", other)),
        }
    }
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::render::escape_html;

/// Host di default della Bot API.
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Percorso del metodo sendMessage per un certo token.
pub fn send_message_path(token: &str) -> String {
    format!("/bot{}/sendMessage", token)
}

/// Destinatario: id numerico della chat oppure username di un canale ("@canale").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatId {
    Id(i64),
    Username(String),
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatId::Id(id) => write!(f, "{}", id),
            ChatId::Username(name) => f.write_str(name),
        }
    }
}

impl FromStr for ChatId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(match s.parse::<i64>() {
            Ok(id) => ChatId::Id(id),
            Err(_) => ChatId::Username(s.to_string()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseMode {
    #[serde(rename = "HTML")]
    Html,
}

/// Body JSON di sendMessage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub chat_id: ChatId,
    pub text: String,
    pub parse_mode: ParseMode,
}

impl SendMessageRequest {
    pub fn html(chat_id: ChatId, text: String) -> Self {
        Self { chat_id, text, parse_mode: ParseMode::Html }
    }
}

/// Risposta della Bot API; `description` è presente quando ok = false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelegramResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

/// Testo della notifica nel dialetto HTML di Telegram: nome in grassetto e messaggio.
pub fn notification_text(name: &str, message: &str) -> String {
    format!("<b>{}</b>: {}", escape_html(name), escape_html(message))
}

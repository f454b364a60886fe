//! Notifiche dei nuovi messaggi verso la Bot API di Telegram.
//!
//! Ogni destinatario è indipendente: gli invii sono sequenziali, nell'ordine della lista,
//! e un fallimento non ferma quelli successivi. Nessun errore viene propagato al chiamante,
//! tutto finisce nel [`NotifyReport`].

use async_trait::async_trait;
use bacheca_core::protocol::telegram::{notification_text, send_message_path};
use bacheca_core::{ChatId, SendMessageRequest, TelegramResponse};
use reqwest::Client;

use crate::config::BoardConfig;
use crate::error::{ConfigError, NotifierError};

/// Esito della consegna verso un singolo destinatario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientOutcome {
    pub chat_id: ChatId,
    pub result: Result<(), NotifierError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NotifyReport {
    pub outcomes: Vec<RecipientOutcome>,
    /// Token o destinatari mancanti: nessuna chiamata è stata fatta.
    pub not_configured: bool,
}

impl NotifyReport {
    pub fn not_configured() -> Self {
        Self { outcomes: Vec::new(), not_configured: true }
    }

    /// AND di tutti gli esiti. Senza destinatari non c'è successo.
    pub fn success(&self) -> bool {
        !self.not_configured && !self.outcomes.is_empty() && self.outcomes.iter().all(|o| o.result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&ChatId, &NotifierError)> {
        self.outcomes.iter().filter_map(|o| match &o.result {
            Ok(()) => None,
            Err(e) => Some((&o.chat_id, e)),
        })
    }
}

#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn notify(&self, name: &str, message: &str, recipients: &[ChatId]) -> NotifyReport;
}

pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    token: Option<String>,
}

impl TelegramNotifier {
    pub fn new(api_base: &str, token: Option<String>) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .user_agent(concat!("bacheca/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ConfigError::ClientUnavailable)?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn from_config(config: &BoardConfig) -> Result<Self, ConfigError> {
        Self::new(&config.telegram_api_base, Some(config.telegram_bot_token.clone()))
    }

    async fn send_one(&self, token: &str, chat_id: &ChatId, text: &str) -> Result<(), NotifierError> {
        let url = format!("{}{}", self.api_base, send_message_path(token));
        let body = SendMessageRequest::html(chat_id.clone(), text.to_string());

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            // senza l'URL: contiene il token
            .map_err(|e| NotifierError::Transport(e.without_url().to_string()))?;

        // la Bot API risponde con lo stesso envelope anche per gli errori HTTP
        let status = resp.status();
        let reply: TelegramResponse = resp
            .json()
            .await
            .map_err(|e| NotifierError::Decode(format!("HTTP {}: {}", status.as_u16(), e.without_url())))?;

        if reply.ok {
            Ok(())
        } else {
            Err(NotifierError::Rejected {
                description: reply
                    .description
                    .unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
                error_code: reply.error_code,
            })
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, name: &str, message: &str, recipients: &[ChatId]) -> NotifyReport {
        let Some(token) = self.token.as_deref() else {
            tracing::warn!("telegram bot token not configured");
            return NotifyReport::not_configured();
        };
        if recipients.is_empty() {
            tracing::warn!("no telegram recipients configured");
            return NotifyReport::not_configured();
        }

        let text = notification_text(name, message);
        let mut outcomes = Vec::with_capacity(recipients.len());
        for chat_id in recipients {
            let result = self.send_one(token, chat_id, &text).await;
            match &result {
                Ok(()) => tracing::info!(chat = %chat_id, "telegram notification delivered"),
                Err(e) => tracing::warn!(chat = %chat_id, "telegram notification failed: {}", e),
            }
            outcomes.push(RecipientOutcome { chat_id: chat_id.clone(), result });
        }
        NotifyReport { outcomes, not_configured: false }
    }
}

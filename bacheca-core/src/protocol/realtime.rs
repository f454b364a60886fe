/* Questo file definisce come i dati "viaggiano" sul canale realtime (websocket, frame Phoenix in JSON).
    Ogni frame è un envelope { topic, event, payload, ref, join_ref }:
    phx_join -> il client si unisce al canale e dichiara quali postgres_changes vuole ricevere
    phx_reply -> risposta del server ad un frame con ref (join, heartbeat, leave)
    postgres_changes -> evento INSERT/UPDATE di una riga della tabella
    heartbeat -> keepalive sul topic "phoenix"
    phx_error / phx_close -> il canale è in errore o è stato chiuso
*/
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::Message;

pub const EVENT_JOIN: &str = "phx_join";
pub const EVENT_LEAVE: &str = "phx_leave";
pub const EVENT_REPLY: &str = "phx_reply";
pub const EVENT_ERROR: &str = "phx_error";
pub const EVENT_CLOSE: &str = "phx_close";
pub const EVENT_HEARTBEAT: &str = "heartbeat";
pub const EVENT_POSTGRES_CHANGES: &str = "postgres_changes";

/// Topic riservato al keepalive del socket.
pub const PHOENIX_TOPIC: &str = "phoenix";

/// Percorso del websocket realtime, relativo all'URL dello store.
pub const WEBSOCKET_PATH: &str = "/realtime/v1/websocket";

/// Versione del protocollo dichiarata in query string.
pub const PROTOCOL_VSN: &str = "1.0.0";

/// Topic del canale a partire dal suo nome.
pub fn channel_topic(channel: &str) -> String {
    format!("realtime:{}", channel)
}

/// Frame Phoenix (formato JSON a oggetto).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_ref: Option<String>,
}

impl PhoenixMessage {
    pub fn new(topic: impl Into<String>, event: impl Into<String>, payload: Value) -> Self {
        Self {
            topic: topic.into(),
            event: event.into(),
            payload,
            reference: None,
            join_ref: None,
        }
    }

    pub fn with_ref(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_join_ref(mut self, join_ref: impl Into<String>) -> Self {
        self.join_ref = Some(join_ref.into());
        self
    }

    pub fn heartbeat(reference: impl Into<String>) -> Self {
        Self::new(PHOENIX_TOPIC, EVENT_HEARTBEAT, Value::Object(Default::default())).with_ref(reference)
    }

    /// Risposta (phx_reply) ad un frame con `ref`.
    pub fn reply(topic: &str, reference: Option<String>, reply: ReplyPayload) -> Self {
        Self {
            topic: topic.to_string(),
            event: EVENT_REPLY.to_string(),
            payload: serde_json::to_value(reply).unwrap_or(Value::Null),
            reference,
            join_ref: None,
        }
    }

    pub fn is_reply_to(&self, reference: &str) -> bool {
        self.event == EVENT_REPLY && self.reference.as_deref() == Some(reference)
    }
}

/// Tipo di modifica di una riga.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// Filtro dichiarato nel join: quali eventi di quale tabella ricevere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeFilter {
    pub event: ChangeKind,
    pub schema: String,
    pub table: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JoinConfig {
    #[serde(default)]
    pub postgres_changes: Vec<ChangeFilter>,
}

/// Payload del phx_join.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JoinPayload {
    #[serde(default)]
    pub config: JoinConfig,
}

impl JoinPayload {
    /// Join per INSERT e UPDATE di una singola tabella.
    pub fn inserts_and_updates(schema: &str, table: &str) -> Self {
        let filter = |event| ChangeFilter {
            event,
            schema: schema.to_string(),
            table: table.to_string(),
        };
        Self {
            config: JoinConfig {
                postgres_changes: vec![filter(ChangeKind::Insert), filter(ChangeKind::Update)],
            },
        }
    }
}

/// Esito di una richiesta nel phx_reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    Ok,
    Error,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyPayload {
    pub status: ReplyStatus,
    #[serde(default)]
    pub response: Value,
}

impl ReplyPayload {
    pub fn ok(response: Value) -> Self {
        Self { status: ReplyStatus::Ok, response }
    }

    pub fn error(reason: &str) -> Self {
        Self {
            status: ReplyStatus::Error,
            response: serde_json::json!({ "reason": reason }),
        }
    }
}

/// Dati della modifica dentro un frame postgres_changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeData {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub schema: String,
    pub table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_record: Option<Value>,
}

impl ChangeData {
    /// Decodifica la riga nuova come messaggio.
    pub fn message(&self) -> Result<Message, serde_json::Error> {
        Message::deserialize(self.record.clone().unwrap_or(Value::Null))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangesPayload {
    pub data: ChangeData,
    #[serde(default)]
    pub ids: Vec<u64>,
}

/// Stato della sottoscrizione realtime, come riportato alla UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelStatus {
    Subscribed,
    ChannelError,
    TimedOut,
    Closed,
}

impl ChannelStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelStatus::Subscribed => "SUBSCRIBED",
            ChannelStatus::ChannelError => "CHANNEL_ERROR",
            ChannelStatus::TimedOut => "TIMED_OUT",
            ChannelStatus::Closed => "CLOSED",
        }
    }

    pub fn is_connected(self) -> bool {
        self == ChannelStatus::Subscribed
    }
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Identificativo opaco assegnato dallo store.
/// Sul wire può essere una stringa (uuid) o un intero (bigserial): lato client è sempre testo.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for MessageId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Serialize for MessageId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for MessageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdVisitor;

        impl<'de> Visitor<'de> for IdVisitor {
            type Value = MessageId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string or integer message id")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(MessageId(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
                Ok(MessageId(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(MessageId(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(MessageId(v.to_string()))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

/// Riga della tabella messaggi, così come arriva dallo store (REST o realtime).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub name: String,
    pub message: String,
    pub created_at: String, // RFC3339, assegnato dallo store
    /// Tri-stato: Some(true) consegnato, Some(false) non consegnato, None sconosciuto.
    #[serde(rename = "telegram_sent", default)]
    pub notification_sent: Option<bool>,
}

impl Message {
    /// Fonde una versione più recente della stessa riga.
    /// Una notifica confermata resta confermata anche se arriva un evento vecchio.
    pub fn merge(&mut self, newer: Message) {
        let confirmed = self.notification_sent == Some(true);
        *self = newer;
        if confirmed {
            self.notification_sent = Some(true);
        }
    }
}

/// Stato della notifica come lo vede la UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationStatus {
    Pending,
    Confirmed,
    Degraded,
}

impl NotificationStatus {
    /// Classe CSS dell'indicatore.
    pub fn css_class(self) -> &'static str {
        match self {
            NotificationStatus::Pending => "pending",
            NotificationStatus::Confirmed => "success",
            NotificationStatus::Degraded => "failed",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            NotificationStatus::Pending => "⏳",
            NotificationStatus::Confirmed => "✓",
            NotificationStatus::Degraded => "✗",
        }
    }

    /// Stato derivato dal solo valore persistito (nessuna informazione sui flussi locali).
    pub fn from_stored(sent: Option<bool>) -> Self {
        match sent {
            Some(true) => NotificationStatus::Confirmed,
            Some(false) => NotificationStatus::Degraded,
            None => NotificationStatus::Pending,
        }
    }
}

use crate::error::ValidationError;
use crate::protocol::rest::NewMessageRow;

/// Messaggio scritto dall'utente, già validato e non ancora persistito.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub name: String,
    pub message: String,
}

impl Draft {
    /// Applica il trim a nome e testo; entrambi devono restare non vuoti.
    pub fn new(name: &str, message: &str) -> Result<Self, ValidationError> {
        let name = name.trim();
        let message = message.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if message.is_empty() {
            return Err(ValidationError::EmptyMessage);
        }
        Ok(Self {
            name: name.to_string(),
            message: message.to_string(),
        })
    }

    /// Riga da inserire nello store: la notifica parte sempre come non inviata.
    pub fn to_row(&self) -> NewMessageRow {
        NewMessageRow {
            name: self.name.clone(),
            message: self.message.clone(),
            telegram_sent: false,
        }
    }
}

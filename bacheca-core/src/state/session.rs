use std::collections::HashSet;

use crate::models::{Message, MessageId, NotificationStatus};

/// Numero massimo di messaggi tenuti in memoria.
pub const DEFAULT_CAPACITY: usize = 50;

/// Esito della fusione di un messaggio nella lista.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    /// id nuovo, inserito in testa
    Inserted,
    /// id già presente, aggiornato sul posto
    Merged,
}

/// Stato della sessione: connessione realtime e messaggi noti (più recenti per primi).
/// È una cache di sola lettura dello store; viene modificata solo dal loop della bacheca.
#[derive(Debug, Clone)]
pub struct SessionState {
    connected: bool,
    messages: Vec<Message>,
    capacity: usize,
    in_flight: HashSet<MessageId>,
    highlight: Option<MessageId>,
    load_failed: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl SessionState {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            connected: false,
            messages: Vec::new(),
            capacity: capacity.max(1),
            in_flight: HashSet::new(),
            highlight: None,
            load_failed: false,
        }
    }

    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    pub fn highlight(&self) -> Option<&MessageId> {
        self.highlight.as_ref()
    }

    pub fn load_failed(&self) -> bool {
        self.load_failed
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Sostituisce la lista (risultato di un fetch), tagliandola alla capacità.
    pub fn set_messages(&mut self, mut messages: Vec<Message>) {
        messages.truncate(self.capacity);
        self.messages = messages;
        self.highlight = None;
        self.load_failed = false;
    }

    /// Il caricamento è fallito: la lista resta vuota e la vista mostra l'errore.
    pub fn set_load_failed(&mut self) {
        self.messages.clear();
        self.highlight = None;
        self.load_failed = true;
    }

    /// Aggiunge un messaggio in testa. Idempotente per id: un id già noto viene
    /// fuso sul posto invece di essere duplicato.
    pub fn prepend_message(&mut self, message: Message) -> Merge {
        self.load_failed = false;
        self.highlight = None;
        if let Some(existing) = self.messages.iter_mut().find(|m| m.id == message.id) {
            existing.merge(message);
            return Merge::Merged;
        }
        self.messages.insert(0, message);
        self.messages.truncate(self.capacity);
        Merge::Inserted
    }

    /// Come prepend_message, ma evidenzia il messaggio come nuovo (arrivato dal canale push).
    /// L'evidenziazione sparisce al cambio successivo della lista.
    pub fn receive_message(&mut self, message: Message) -> Merge {
        let id = message.id.clone();
        let outcome = self.prepend_message(message);
        if outcome == Merge::Inserted {
            self.highlight = Some(id);
        }
        outcome
    }

    /// L'evidenziazione vale per un solo cambio della lista.
    pub fn clear_highlight(&mut self) {
        self.highlight = None;
    }

    /// Evento UPDATE: aggiorna solo se l'id è già visualizzato, altrimenti non fa nulla.
    pub fn apply_update(&mut self, message: Message) -> bool {
        match self.messages.iter_mut().find(|m| m.id == message.id) {
            Some(existing) => {
                self.highlight = None;
                existing.merge(message);
                true
            }
            None => false,
        }
    }

    /// Registra l'esito della notifica per un messaggio visualizzato.
    /// Una conferma già avvenuta non viene mai annullata.
    pub fn mark_notified(&mut self, id: &MessageId, sent: bool) -> bool {
        match self.messages.iter_mut().find(|m| &m.id == id) {
            Some(existing) => {
                self.highlight = None;
                if existing.notification_sent != Some(true) {
                    existing.notification_sent = Some(sent);
                }
                true
            }
            None => false,
        }
    }

    /// Il flusso di invio locale per questo id è in corso.
    pub fn begin_delivery(&mut self, id: MessageId) {
        self.in_flight.insert(id);
    }

    pub fn end_delivery(&mut self, id: &MessageId) {
        self.in_flight.remove(id);
    }

    pub fn is_in_flight(&self, id: &MessageId) -> bool {
        self.in_flight.contains(id)
    }

    /// Stato dell'indicatore: `false` vale "in attesa" finché il flusso locale è in corso,
    /// "non consegnato" dopo.
    pub fn status_of(&self, message: &Message) -> NotificationStatus {
        match message.notification_sent {
            Some(true) => NotificationStatus::Confirmed,
            _ if self.in_flight.contains(&message.id) => NotificationStatus::Pending,
            other => NotificationStatus::from_stored(other),
        }
    }
}

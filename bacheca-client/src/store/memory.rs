use std::sync::Mutex;

use async_trait::async_trait;
use bacheca_core::{new_message_id, now_timestamp, ChannelStatus, Draft, Message, MessageId};
use tokio::sync::mpsc::{self, UnboundedSender};

use super::{MessageStore, StoreEvent, Subscription};
use crate::error::StoreError;

/// Store in memoria, con lo stesso comportamento osservabile di quello remoto.
/// Usato con `--memory` e nei test.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    // in ordine di inserimento
    rows: Vec<Message>,
    subscribers: Vec<UnboundedSender<StoreEvent>>,
    fail_inserts: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Precarica delle righe già esistenti (in ordine cronologico).
    pub fn with_rows(rows: Vec<Message>) -> Self {
        let store = Self::default();
        if let Ok(mut inner) = store.inner.lock() {
            inner.rows = rows;
        }
        store
    }

    /// Fa fallire tutti gli inserimenti successivi.
    pub fn fail_inserts(&self, fail: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_inserts = fail;
        }
    }

    /// Simula un evento push arrivato da un altro client.
    pub fn push(&self, event: StoreEvent) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.broadcast(event);
        }
    }

    pub fn rows(&self) -> Vec<Message> {
        self.inner.lock().map(|inner| inner.rows.clone()).unwrap_or_default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store poisoned".to_string()))
    }
}

impl Inner {
    fn broadcast(&mut self, event: StoreEvent) {
        // i subscriber chiusi vengono rimossi al primo invio fallito
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<Message>, StoreError> {
        let inner = self.lock()?;
        Ok(inner.rows.iter().rev().take(limit).cloned().collect())
    }

    async fn insert(&self, draft: &Draft) -> Result<Message, StoreError> {
        let mut inner = self.lock()?;
        if inner.fail_inserts {
            return Err(StoreError::Unavailable("insert rejected".to_string()));
        }
        let row = draft.to_row();
        let message = Message {
            id: new_message_id(),
            name: row.name,
            message: row.message,
            created_at: now_timestamp(),
            notification_sent: Some(row.telegram_sent),
        };
        inner.rows.push(message.clone());
        inner.broadcast(StoreEvent::Inserted(message.clone()));
        Ok(message)
    }

    async fn update_notified(&self, id: &MessageId, sent: bool) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let updated = match inner.rows.iter_mut().find(|m| &m.id == id) {
            Some(row) => {
                row.notification_sent = Some(sent);
                row.clone()
            }
            // come PostgREST: nessuna riga toccata non è un errore
            None => return Ok(()),
        };
        inner.broadcast(StoreEvent::Updated(updated));
        Ok(())
    }

    async fn subscribe(&self) -> Result<Subscription, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(StoreEvent::Status(ChannelStatus::Subscribed));
        self.lock()?.subscribers.push(tx);
        Ok(Subscription::new(rx, None, None))
    }
}

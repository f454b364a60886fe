//! Accesso allo store esterno: lettura, scrittura e canale push.

pub mod memory;
pub mod realtime;
pub mod rest;

use async_trait::async_trait;
use bacheca_core::{ChannelStatus, Draft, Message, MessageId};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::StoreError;

pub use memory::MemoryStore;
pub use rest::RestStore;

/// Evento consegnato dal canale push.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    Inserted(Message),
    Updated(Message),
    Status(ChannelStatus),
}

#[async_trait]
pub trait MessageStore: Send + Sync + 'static {
    /// Ultimi `limit` messaggi, più recenti per primi.
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<Message>, StoreError>;

    /// Inserisce il messaggio con la notifica a `false`; id e created_at li assegna lo store.
    async fn insert(&self, draft: &Draft) -> Result<Message, StoreError>;

    async fn update_notified(&self, id: &MessageId, sent: bool) -> Result<(), StoreError>;

    /// Apre il canale push per INSERT e UPDATE della tabella.
    async fn subscribe(&self) -> Result<Subscription, StoreError>;
}

/// Handle di una sottoscrizione. Se viene droppato, il task in background si ferma.
pub struct Subscription {
    events: mpsc::UnboundedReceiver<StoreEvent>,
    close: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub(crate) fn new(
        events: mpsc::UnboundedReceiver<StoreEvent>,
        close: Option<oneshot::Sender<()>>,
        task: Option<JoinHandle<()>>,
    ) -> Self {
        Self { events, close, task }
    }

    /// Prossimo evento; `None` quando il canale è terminato.
    pub async fn next(&mut self) -> Option<StoreEvent> {
        self.events.recv().await
    }

    /// Chiusura ordinata: phx_leave e chiusura del socket.
    pub async fn unsubscribe(mut self) {
        if let Some(close) = self.close.take() {
            let _ = close.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}

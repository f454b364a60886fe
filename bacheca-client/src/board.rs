//! Orchestrazione della bacheca.
//!
//! Il loop di [`Board::run`] è l'unico che modifica lo stato di sessione: serializza i
//! comandi dell'utente, l'avanzamento dei flussi di invio, gli eventi push e la scadenza
//! del banner. Il flusso di invio (insert → notifica → update) gira in un task separato e
//! riporta i passi sul canale `flow`.

use std::sync::Arc;
use std::time::Instant;

use bacheca_core::{ActivityLog, Banner, ChannelStatus, Draft, LogLevel, Merge, Message, MessageId, PageModel, SessionState};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::config::BoardConfig;
use crate::error::{BoardError, ConfigError, NotifierError, StoreError};
use crate::notifier::{Notifier, NotifyReport};
use crate::prefs::{LocalStorage, NAME_KEY};
use crate::store::{MessageStore, StoreEvent, Subscription};
use crate::view::View;

/// Azioni dell'utente, prodotte dal livello di interfaccia.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Submit { name: String, message: String },
    ClearLog,
    Reload,
    Quit,
}

/// Passi del flusso di invio, dal task al loop.
#[derive(Debug)]
pub enum FlowEvent {
    Inserted(Message),
    InsertFailed(StoreError),
    Delivered {
        id: MessageId,
        report: NotifyReport,
        update_error: Option<StoreError>,
    },
}

pub struct Board<S, N, V> {
    config: Arc<BoardConfig>,
    store: Option<Arc<S>>,
    notifier: Arc<N>,
    view: V,
    session: SessionState,
    activity: ActivityLog,
    banner: Option<Banner>,
    storage: Option<LocalStorage>,
    subscription: Option<Subscription>,
    flow_tx: UnboundedSender<FlowEvent>,
    flow_rx: UnboundedReceiver<FlowEvent>,
    // flussi di invio non ancora conclusi
    pending_flows: usize,
}

impl<S, N, V> Board<S, N, V>
where
    S: MessageStore,
    N: Notifier,
    V: View,
{
    /// `store` è l'esito dell'inizializzazione del client: se è un errore la bacheca
    /// resta disabilitata (niente caricamento, niente sottoscrizione, invii rifiutati)
    /// e mostra un banner permanente.
    pub fn new(
        config: Arc<BoardConfig>,
        store: Result<Arc<S>, ConfigError>,
        notifier: Arc<N>,
        view: V,
    ) -> Self {
        let (flow_tx, flow_rx) = mpsc::unbounded_channel();
        let mut board = Self {
            session: SessionState::with_capacity(config.fetch_limit),
            config,
            store: None,
            notifier,
            view,
            activity: ActivityLog::default(),
            banner: None,
            storage: None,
            subscription: None,
            flow_tx,
            flow_rx,
            pending_flows: 0,
        };
        match store {
            Ok(store) => {
                board.store = Some(store);
                board.log(LogLevel::Success, "Store client initialized");
            }
            Err(e) => {
                board.banner = Some(Banner::persistent(format!(
                    "Please configure the store credentials ({}).",
                    e
                )));
                board.log(LogLevel::Error, format!("ERROR: {}", e));
            }
        }
        board
    }

    /// Archivio locale da cui leggere e su cui salvare il nome.
    pub fn with_storage(mut self, storage: LocalStorage) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Un invio è in corso.
    pub fn is_sending(&self) -> bool {
        self.pending_flows > 0
    }

    /// Nome salvato all'ultimo invio, se c'è.
    pub fn saved_name(&self) -> Option<String> {
        self.storage.as_ref()?.get_item(NAME_KEY)
    }

    /// Avvio: caricamento iniziale, sottoscrizione e controllo della configurazione Telegram.
    pub async fn start(&mut self) {
        if self.store.is_some() {
            self.load().await;
            self.connect().await;
        }

        if self.config.notifier_configured() {
            self.log(
                LogLevel::Success,
                format!("Telegram configured for {} chat(s)", self.config.telegram_chat_ids.len()),
            );
        } else {
            self.log(
                LogLevel::Warning,
                "WARNING: Telegram bot not configured. Set BACHECA_TELEGRAM_BOT_TOKEN and BACHECA_TELEGRAM_CHAT_IDS to enable notifications.",
            );
        }
        self.render();
    }

    /// Ricarica gli ultimi messaggi. Nessun retry: in caso di errore la lista mostra lo stato d'errore.
    pub async fn load(&mut self) {
        let Some(store) = self.store.clone() else {
            self.log(LogLevel::Error, "ERROR: Store client not initialized");
            return;
        };
        match store.fetch_recent(self.config.fetch_limit).await {
            Ok(messages) => {
                self.session.set_messages(messages);
                let count = self.session.messages().len();
                self.log(LogLevel::Success, format!("Loaded {} messages", count));
            }
            Err(e) => {
                self.session.set_load_failed();
                self.show_error(format!("Failed to load messages: {}", e));
                self.log(LogLevel::Error, format!("ERROR: Failed to load messages - {}", e));
            }
        }
        self.render();
    }

    /// Apre il canale push. Un errore lascia la bacheca disconnessa ma utilizzabile.
    pub async fn connect(&mut self) {
        let Some(store) = self.store.clone() else {
            self.log(LogLevel::Error, "ERROR: Cannot setup real-time - store not initialized");
            return;
        };
        match store.subscribe().await {
            Ok(subscription) => self.subscription = Some(subscription),
            Err(e) => {
                tracing::warn!("realtime subscription failed: {}", e);
                self.session.set_connected(false);
                self.show_error(format!("Real-time subscription failed: {}", e));
                self.log(LogLevel::Error, "ERROR: Real-time subscription error");
            }
        }
        self.render();
    }

    /// Valida e avvia il flusso di invio. L'esito arriva poi come [`FlowEvent`].
    pub fn submit(&mut self, name: &str, message: &str) -> Result<(), BoardError> {
        let Some(store) = self.store.clone() else {
            let err = BoardError::NotInitialized;
            self.show_error(err.to_string());
            return Err(err);
        };
        let draft = match Draft::new(name, message) {
            Ok(draft) => draft,
            Err(e) => {
                let err = BoardError::from(e);
                self.show_error(err.to_string());
                return Err(err);
            }
        };

        self.banner = None;
        if let Some(storage) = &self.storage {
            if let Err(e) = storage.set_item(NAME_KEY, &draft.name) {
                tracing::warn!("cannot save name: {}", e);
            }
        }

        self.pending_flows += 1;
        self.spawn_flow(store, draft);
        self.render();
        Ok(())
    }

    fn spawn_flow(&self, store: Arc<S>, draft: Draft) {
        let notifier = Arc::clone(&self.notifier);
        let recipients = self.config.telegram_chat_ids.clone();
        let tx = self.flow_tx.clone();

        tokio::spawn(async move {
            let inserted = match store.insert(&draft).await {
                Ok(message) => message,
                Err(e) => {
                    let _ = tx.send(FlowEvent::InsertFailed(e));
                    return;
                }
            };
            let id = inserted.id.clone();
            let _ = tx.send(FlowEvent::Inserted(inserted));

            let report = notifier.notify(&draft.name, &draft.message, &recipients).await;
            // true solo se tutti i destinatari hanno accettato, altrimenti false
            let update_error = store.update_notified(&id, report.success()).await.err();
            let _ = tx.send(FlowEvent::Delivered { id, report, update_error });
        });
    }

    pub fn handle_flow_event(&mut self, event: FlowEvent) {
        match event {
            FlowEvent::Inserted(message) => {
                self.log(LogLevel::Success, format!("Message inserted with ID: {}", message.id));
                self.session.begin_delivery(message.id.clone());
                self.session.prepend_message(message);
            }
            FlowEvent::InsertFailed(e) => {
                self.pending_flows = self.pending_flows.saturating_sub(1);
                self.show_error(e.to_string());
                self.log(LogLevel::Error, format!("ERROR: Failed to send message - {}", e));
            }
            FlowEvent::Delivered { id, report, update_error } => {
                self.pending_flows = self.pending_flows.saturating_sub(1);
                self.log_report(&report);
                self.session.mark_notified(&id, report.success());
                self.session.end_delivery(&id);
                if let Some(e) = update_error {
                    self.log(LogLevel::Warning, format!("WARNING: Could not update Telegram status - {}", e));
                }
                self.log(LogLevel::Success, "Message sent successfully!");
                self.view.clear_input();
            }
        }
        self.render();
    }

    fn log_report(&mut self, report: &NotifyReport) {
        if report.not_configured {
            self.log(LogLevel::Warning, "WARNING: Telegram not configured");
            return;
        }
        for outcome in &report.outcomes {
            match &outcome.result {
                Ok(()) => self.log(LogLevel::Success, format!("Telegram sent to chat {}", outcome.chat_id)),
                Err(NotifierError::Rejected { description, .. }) => self.log(
                    LogLevel::Error,
                    format!("ERROR: Telegram failed for chat {} - {}", outcome.chat_id, description),
                ),
                Err(e) => self.log(
                    LogLevel::Error,
                    format!("ERROR: Telegram API error for chat {} - {}", outcome.chat_id, e),
                ),
            }
        }
    }

    pub fn handle_store_event(&mut self, event: StoreEvent) {
        match event {
            StoreEvent::Inserted(message) => {
                self.log(LogLevel::Info, format!("Real-time: New message received (ID: {})", message.id));
                let name = message.name.clone();
                if self.session.receive_message(message) == Merge::Inserted {
                    self.log(LogLevel::Info, format!("New message from {}", name));
                }
            }
            StoreEvent::Updated(message) => {
                self.log(LogLevel::Info, format!("Real-time: Message updated (ID: {})", message.id));
                self.session.apply_update(message);
            }
            StoreEvent::Status(status) => {
                self.session.set_connected(status.is_connected());
                match status {
                    ChannelStatus::Subscribed => self.log(LogLevel::Success, "Real-time subscription active"),
                    ChannelStatus::ChannelError => self.log(LogLevel::Error, "ERROR: Real-time subscription error"),
                    ChannelStatus::TimedOut => {
                        self.log(LogLevel::Warning, "WARNING: Real-time subscription timed out")
                    }
                    other => self.log(LogLevel::Warning, format!("Real-time status: {}", other)),
                }
            }
        }
        self.render();
    }

    pub async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Submit { name, message } => {
                // l'errore è già stato mostrato nel banner
                let _ = self.submit(&name, &message);
            }
            Command::ClearLog => {
                self.activity.clear();
                self.render();
            }
            Command::Reload => self.load().await,
            Command::Quit => {}
        }
    }

    /// Attende che tutti i flussi di invio in corso siano conclusi.
    pub async fn settle(&mut self) {
        while self.pending_flows > 0 {
            match self.flow_rx.recv().await {
                Some(event) => self.handle_flow_event(event),
                None => break,
            }
        }
    }

    /// Loop principale, fino a `Quit` o alla chiusura del canale dei comandi.
    /// Gli invii in corso vengono portati a termine prima di uscire.
    pub async fn run(&mut self, mut commands: UnboundedReceiver<Command>) {
        loop {
            let dismiss_at = self.banner.as_ref().and_then(|b| b.expires_at);
            let dismiss = tokio::time::sleep_until(tokio::time::Instant::from_std(
                dismiss_at.unwrap_or_else(Instant::now),
            ));

            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Quit) | None => break,
                    Some(command) => self.handle_command(command).await,
                },
                Some(event) = self.flow_rx.recv() => self.handle_flow_event(event),
                event = next_event(&mut self.subscription), if self.subscription.is_some() => match event {
                    Some(event) => self.handle_store_event(event),
                    None => {
                        tracing::debug!("realtime channel ended");
                        self.subscription = None;
                    }
                },
                _ = dismiss, if dismiss_at.is_some() => {
                    if self.banner.as_ref().is_some_and(|b| b.is_expired(Instant::now())) {
                        self.banner = None;
                        self.render();
                    }
                }
            }
        }

        self.settle().await;
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe().await;
        }
    }

    fn show_error(&mut self, text: impl Into<String>) {
        self.banner = Some(Banner::transient(text, Instant::now(), self.config.error_dismiss()));
    }

    /// Riga nel log attività, replicata su tracing.
    fn log(&mut self, level: LogLevel, text: impl Into<String>) {
        let text = text.into();
        match level {
            LogLevel::Info | LogLevel::Success => tracing::info!(target: "bacheca::activity", "{}", text),
            LogLevel::Warning => tracing::warn!(target: "bacheca::activity", "{}", text),
            LogLevel::Error => tracing::error!(target: "bacheca::activity", "{}", text),
        }
        self.activity.push(level, text);
    }

    fn render(&mut self) {
        let page = PageModel {
            session: &self.session,
            log: &self.activity,
            banner: self.banner.as_ref(),
            sending: self.pending_flows > 0,
        };
        self.view.render(&page);
    }
}

async fn next_event(subscription: &mut Option<Subscription>) -> Option<StoreEvent> {
    match subscription {
        Some(subscription) => subscription.next().await,
        None => std::future::pending().await,
    }
}

use anyhow::Result;
use async_trait::async_trait;
use bacheca_client::notifier::RecipientOutcome;
use bacheca_client::prefs::NAME_KEY;
use bacheca_client::{
    Board, BoardConfig, BoardError, Command, ConfigError, FlowEvent, LocalStorage, MemoryStore,
    MessageStore, Notifier, NotifierError, NotifyReport, StoreError, StoreEvent, Subscription, View,
};
use bacheca_core::{
    render_page, ChannelStatus, ChatId, Draft, Message, MessageId, NotificationStatus, PageModel, RenderOptions,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Notifier finto: accetta o rifiuta tutti i destinatari.
struct StubNotifier {
    accept: bool,
    calls: AtomicUsize,
}

impl StubNotifier {
    fn accepting() -> Arc<Self> {
        Arc::new(Self { accept: true, calls: AtomicUsize::new(0) })
    }

    fn rejecting() -> Arc<Self> {
        Arc::new(Self { accept: false, calls: AtomicUsize::new(0) })
    }
}

#[async_trait]
impl Notifier for StubNotifier {
    async fn notify(&self, _name: &str, _message: &str, recipients: &[ChatId]) -> NotifyReport {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if recipients.is_empty() {
            return NotifyReport::not_configured();
        }
        let outcomes = recipients
            .iter()
            .map(|chat_id| RecipientOutcome {
                chat_id: chat_id.clone(),
                result: if self.accept {
                    Ok(())
                } else {
                    Err(NotifierError::Rejected { description: "chat not found".into(), error_code: Some(400) })
                },
            })
            .collect();
        NotifyReport { outcomes, not_configured: false }
    }
}

/// Vista che tiene tutte le pagine disegnate.
#[derive(Default)]
struct RecordingView {
    pages: Vec<String>,
    cleared: usize,
}

impl RecordingView {
    fn last(&self) -> &str {
        self.pages.last().map(String::as_str).unwrap_or_default()
    }
}

impl View for RecordingView {
    fn render(&mut self, page: &PageModel<'_>) {
        self.pages.push(render_page(page, &RenderOptions::default()));
    }

    fn clear_input(&mut self) {
        self.cleared += 1;
    }
}

fn telegram_config() -> Arc<BoardConfig> {
    Arc::new(BoardConfig {
        telegram_bot_token: "TEST".into(),
        telegram_chat_ids: vec![ChatId::Id(1)],
        ..BoardConfig::default()
    })
}

fn message(id: &str, name: &str, sent: Option<bool>) -> Message {
    Message {
        id: MessageId::from(id),
        name: name.into(),
        message: "hi".into(),
        created_at: "2024-05-01T10:00:00.000000Z".into(),
        notification_sent: sent,
    }
}

fn has_log<S: MessageStore>(board: &Board<S, StubNotifier, RecordingView>, text: &str) -> bool {
    board.activity().entries().any(|e| e.text == text)
}

// Obiettivo test: Ann/"hi" con un destinatario sano -> riga salvata, notifica confermata
// nello store e nella vista, campo messaggio svuotato.
#[tokio::test]
async fn submit_with_healthy_recipient_confirms() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let notifier = StubNotifier::accepting();
    let mut board = Board::new(telegram_config(), Ok(store.clone()), notifier.clone(), RecordingView::default());
    board.start().await;

    board.submit("  Ann ", " hi ")?;
    assert!(board.is_sending());
    assert!(board.view().last().contains("Sending..."));
    board.settle().await;

    assert!(!board.is_sending());
    let rows = store.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "Ann");
    assert_eq!(rows[0].message, "hi");
    assert_eq!(rows[0].notification_sent, Some(true));

    let shown = &board.session().messages()[0];
    assert_eq!(shown.id, rows[0].id);
    assert_eq!(board.session().status_of(shown), NotificationStatus::Confirmed);
    assert!(board.view().last().contains("telegram-status success"));
    assert!(board.view().last().contains("Send Message"));
    assert_eq!(board.view().cleared, 1);
    assert_eq!(notifier.calls.load(Ordering::SeqCst), 1);

    assert!(has_log(&board, &format!("Message inserted with ID: {}", rows[0].id)));
    assert!(has_log(&board, "Telegram sent to chat 1"));
    assert!(has_log(&board, "Message sent successfully!"));
    Ok(())
}

// Obiettivo test: destinatario che rifiuta -> telegram_sent=false nello store, indicatore "failed".
#[tokio::test]
async fn submit_with_failing_recipient_is_degraded() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let mut board =
        Board::new(telegram_config(), Ok(store.clone()), StubNotifier::rejecting(), RecordingView::default());
    board.start().await;

    board.submit("Ann", "hi")?;
    board.settle().await;

    assert_eq!(store.rows()[0].notification_sent, Some(false));
    let shown = &board.session().messages()[0];
    assert_eq!(board.session().status_of(shown), NotificationStatus::Degraded);
    assert!(board.view().last().contains("telegram-status failed"));
    assert!(has_log(&board, "ERROR: Telegram failed for chat 1 - chat not found"));
    Ok(())
}

#[tokio::test]
async fn submit_without_telegram_config_is_degraded() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let mut board = Board::new(
        Arc::new(BoardConfig::default()),
        Ok(store.clone()),
        StubNotifier::accepting(),
        RecordingView::default(),
    );
    board.start().await;
    assert!(has_log(
        &board,
        "WARNING: Telegram bot not configured. Set BACHECA_TELEGRAM_BOT_TOKEN and BACHECA_TELEGRAM_CHAT_IDS to enable notifications."
    ));

    board.submit("Ann", "hi")?;
    board.settle().await;

    assert_eq!(store.rows()[0].notification_sent, Some(false));
    assert!(has_log(&board, "WARNING: Telegram not configured"));
    Ok(())
}

// Obiettivo test: campi vuoti dopo il trim -> nessun inserimento e banner d'errore transitorio.
#[tokio::test]
async fn blank_fields_are_rejected() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let notifier = StubNotifier::accepting();
    let mut board = Board::new(telegram_config(), Ok(store.clone()), notifier.clone(), RecordingView::default());

    let err = board.submit("   ", "hi").unwrap_err();
    assert!(matches!(err, BoardError::Validation(_)));
    let banner = board.banner().expect("banner shown");
    assert_eq!(banner.text, "Please fill in both name and message fields.");
    assert!(banner.expires_at.is_some());

    assert!(board.submit("Ann", "\n\t").is_err());
    board.settle().await;
    assert!(store.rows().is_empty());
    assert_eq!(notifier.calls.load(Ordering::SeqCst), 0);
    Ok(())
}

// Obiettivo test: senza credenziali la bacheca resta disabilitata con un banner permanente.
#[tokio::test]
async fn missing_store_credentials_disable_the_board() {
    let mut board = Board::<MemoryStore, _, _>::new(
        telegram_config(),
        Err(ConfigError::MissingStoreUrl),
        StubNotifier::accepting(),
        RecordingView::default(),
    );
    board.start().await;

    assert!(!board.is_enabled());
    let banner = board.banner().expect("banner shown");
    assert!(banner.expires_at.is_none());
    assert!(board.view().last().contains("error-banner"));
    assert!(board.view().last().contains("No messages yet. Be the first to post!"));

    let err = board.submit("Ann", "hi").unwrap_err();
    assert!(matches!(err, BoardError::NotInitialized));
    assert_eq!(
        board.banner().map(|b| b.text.as_str()),
        Some("Store client not initialized. Please check your credentials.")
    );
}

#[tokio::test]
async fn insert_failure_shows_error_and_skips_notification() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    store.fail_inserts(true);
    let notifier = StubNotifier::accepting();
    let mut board = Board::new(telegram_config(), Ok(store.clone()), notifier.clone(), RecordingView::default());

    board.submit("Ann", "hi")?;
    board.settle().await;

    assert!(board.session().messages().is_empty());
    assert_eq!(notifier.calls.load(Ordering::SeqCst), 0);
    assert!(board.banner().is_some_and(|b| b.text.contains("insert rejected")));
    assert!(has_log(&board, "ERROR: Failed to send message - store unavailable: insert rejected"));
    assert_eq!(board.view().cleared, 0);
    Ok(())
}

// Obiettivo test: il caricamento iniziale mostra i più recenti per primi.
#[tokio::test]
async fn start_loads_newest_first() {
    let store = Arc::new(MemoryStore::with_rows(vec![
        message("1", "Old", Some(true)),
        message("2", "New", Some(false)),
    ]));
    let mut board = Board::new(telegram_config(), Ok(store), StubNotifier::accepting(), RecordingView::default());
    board.start().await;

    let names: Vec<&str> = board.session().messages().iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["New", "Old"]);
    assert!(has_log(&board, "Loaded 2 messages"));
}

// Obiettivo test: eventi push ripetuti o fuori ordine non duplicano e non declassano.
#[tokio::test]
async fn push_events_merge_by_id() {
    let store = Arc::new(MemoryStore::new());
    let mut board = Board::new(telegram_config(), Ok(store), StubNotifier::accepting(), RecordingView::default());

    board.handle_store_event(StoreEvent::Updated(message("ghost", "Nobody", Some(true))));
    assert!(board.session().messages().is_empty());

    board.handle_store_event(StoreEvent::Inserted(message("a", "Bob", None)));
    board.handle_store_event(StoreEvent::Inserted(message("a", "Bob", None)));
    assert_eq!(board.session().messages().len(), 1);
    assert!(has_log(&board, "New message from Bob"));
    assert!(board.view().last().contains("message-item new-message"));
    assert!(board.view().last().contains("telegram-status pending"));

    board.handle_store_event(StoreEvent::Updated(message("a", "Bob", Some(true))));
    assert!(!board.view().last().contains("new-message"));
    board.handle_store_event(StoreEvent::Updated(message("a", "Bob", Some(false))));
    let shown = &board.session().messages()[0];
    assert_eq!(board.session().status_of(shown), NotificationStatus::Confirmed);
}

// Obiettivo test: macchina a stati dell'indicatore per il flusso locale.
// pending -> degraded, poi corretto da un UPDATE successivo; confirmed è terminale.
#[tokio::test]
async fn local_flow_indicator_transitions() {
    let store = Arc::new(MemoryStore::new());
    let mut board = Board::new(telegram_config(), Ok(store), StubNotifier::accepting(), RecordingView::default());
    let id = MessageId::from("42");

    board.handle_flow_event(FlowEvent::Inserted(message("42", "Ann", Some(false))));
    let status = |b: &Board<MemoryStore, StubNotifier, RecordingView>| {
        let m = b.session().get(&id).cloned().expect("message shown");
        b.session().status_of(&m)
    };
    assert_eq!(status(&board), NotificationStatus::Pending);

    let report = NotifyReport {
        outcomes: vec![RecipientOutcome {
            chat_id: ChatId::Id(1),
            result: Err(NotifierError::Transport("connection refused".into())),
        }],
        not_configured: false,
    };
    board.handle_flow_event(FlowEvent::Delivered { id: id.clone(), report, update_error: None });
    assert_eq!(status(&board), NotificationStatus::Degraded);
    assert!(has_log(
        &board,
        "ERROR: Telegram API error for chat 1 - Telegram API error: connection refused"
    ));

    board.handle_store_event(StoreEvent::Updated(message("42", "Ann", Some(true))));
    assert_eq!(status(&board), NotificationStatus::Confirmed);
    board.handle_store_event(StoreEvent::Updated(message("42", "Ann", Some(false))));
    assert_eq!(status(&board), NotificationStatus::Confirmed);
}

#[tokio::test]
async fn submit_saves_the_name() -> Result<()> {
    let td = tempfile::TempDir::new()?;
    let storage = LocalStorage::at(td.path().join("storage.toml"));
    let mut board = Board::new(
        telegram_config(),
        Ok(Arc::new(MemoryStore::new())),
        StubNotifier::accepting(),
        RecordingView::default(),
    )
    .with_storage(storage.clone());

    assert_eq!(board.saved_name(), None);
    board.submit(" Ann ", "hi")?;
    board.settle().await;
    assert_eq!(board.saved_name().as_deref(), Some("Ann"));
    assert_eq!(storage.get_item(NAME_KEY).as_deref(), Some("Ann"));
    Ok(())
}

// Obiettivo test: il loop esegue i comandi in ordine e prima di uscire
// porta a termine gli invii in corso.
#[tokio::test]
async fn run_finishes_pending_submissions_before_quitting() {
    let store = Arc::new(MemoryStore::new());
    let mut board =
        Board::new(telegram_config(), Ok(store.clone()), StubNotifier::accepting(), RecordingView::default());
    board.start().await;

    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(Command::ClearLog).unwrap();
    tx.send(Command::Submit { name: "Ann".into(), message: "hi".into() }).unwrap();
    tx.send(Command::Quit).unwrap();
    board.run(rx).await;

    assert_eq!(board.activity().entries().next().map(|e| e.text.as_str()), Some("Log cleared."));
    assert_eq!(store.rows().len(), 1);
    assert_eq!(store.rows()[0].notification_sent, Some(true));
    let shown = &board.session().messages()[0];
    assert_eq!(board.session().status_of(shown), NotificationStatus::Confirmed);
}

/// Store che legge e scrive in memoria ma non riesce ad aprire il canale push.
struct NoRealtimeStore(MemoryStore);

#[async_trait]
impl MessageStore for NoRealtimeStore {
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<Message>, StoreError> {
        self.0.fetch_recent(limit).await
    }

    async fn insert(&self, draft: &Draft) -> Result<Message, StoreError> {
        self.0.insert(draft).await
    }

    async fn update_notified(&self, id: &MessageId, sent: bool) -> Result<(), StoreError> {
        self.0.update_notified(id, sent).await
    }

    async fn subscribe(&self) -> Result<Subscription, StoreError> {
        Err(StoreError::Unavailable("ws refused".into()))
    }
}

// Obiettivo test: se la sottoscrizione fallisce l'utente vede l'errore nel banner,
// la bacheca resta disconnessa ma l'invio continua a funzionare.
#[tokio::test]
async fn failed_subscription_is_shown_to_the_user() -> Result<()> {
    let store = Arc::new(NoRealtimeStore(MemoryStore::new()));
    let mut board = Board::new(telegram_config(), Ok(store.clone()), StubNotifier::accepting(), RecordingView::default());
    board.start().await;

    assert!(!board.session().connected());
    let banner = board.banner().expect("error banner shown");
    assert!(banner.text.contains("Real-time subscription failed"));
    assert!(banner.text.contains("ws refused"));
    assert!(banner.expires_at.is_some());
    assert!(has_log(&board, "ERROR: Real-time subscription error"));
    assert!(board.view().last().contains("Real-time subscription failed"));
    assert!(board.view().last().contains("status-dot disconnected"));

    board.submit("Ann", "still here")?;
    board.settle().await;
    assert_eq!(store.0.rows().len(), 1);
    assert_eq!(store.0.rows()[0].notification_sent, Some(true));
    Ok(())
}

// Obiettivo test: dopo SUBSCRIBED ogni stato di errore del canale riporta
// l'indicatore a disconnesso e lascia la sua riga nel log.
#[tokio::test]
async fn channel_failures_mark_the_board_disconnected() {
    let cases = [
        (ChannelStatus::ChannelError, "ERROR: Real-time subscription error"),
        (ChannelStatus::TimedOut, "WARNING: Real-time subscription timed out"),
        (ChannelStatus::Closed, "Real-time status: CLOSED"),
    ];
    for (status, line) in cases {
        let store = Arc::new(MemoryStore::new());
        let mut board = Board::new(telegram_config(), Ok(store), StubNotifier::accepting(), RecordingView::default());

        board.handle_store_event(StoreEvent::Status(ChannelStatus::Subscribed));
        assert!(board.session().connected());
        assert!(board.view().last().contains("status-dot connected"));
        assert!(has_log(&board, "Real-time subscription active"));

        board.handle_store_event(StoreEvent::Status(status));
        assert!(!board.session().connected(), "{status} should disconnect");
        assert!(board.view().last().contains("status-dot disconnected"), "{status} page");
        assert!(has_log(&board, line), "{status} log line");
    }
}

use anyhow::{Context, Result};
use axum::extract::ws::{Message as WsFrame, WebSocketUpgrade};
use bacheca_client::{BoardConfig, MessageStore, RestStore, StoreError, StoreEvent, Subscription};
use bacheca_core::protocol::realtime::{ReplyPayload, EVENT_ERROR, EVENT_JOIN, WEBSOCKET_PATH};
use bacheca_core::{ChannelStatus, Draft, PhoenixMessage};
use bacheca_server::{connect_pool, routes, run_migrations, sqlite_url_for_path, AppState};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

// Avvia lo store locale su una porta effimera. Il TempDir va tenuto in vita.
async fn start_store(api_key: Option<&str>) -> Result<(String, TempDir)> {
    let td = TempDir::new()?;
    let url = sqlite_url_for_path(&td.path().join("bacheca.db"))?;
    let pool = connect_pool(&url).await?;
    run_migrations(&pool).await?;

    let state = Arc::new(AppState::new(pool, api_key.map(str::to_string)));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, routes::router(state)).await;
    });
    Ok((format!("http://{}", addr), td))
}

fn config_for(base: &str, key: &str) -> BoardConfig {
    BoardConfig {
        store_url: base.to_string(),
        store_key: key.to_string(),
        join_timeout_secs: 5,
        ..BoardConfig::default()
    }
}

fn client_for(base: &str, key: &str) -> Result<RestStore> {
    Ok(RestStore::initialize(&config_for(base, key))?)
}

// Server realtime finto. Senza `error_after_join` accetta il websocket e ignora ogni frame;
// con `error_after_join` conferma il join e poi manda phx_error sul topic del canale.
async fn start_realtime_stub(error_after_join: bool) -> Result<String> {
    let app = axum::Router::new().route(
        WEBSOCKET_PATH,
        axum::routing::get(move |ws: WebSocketUpgrade| async move {
            ws.on_upgrade(move |mut socket| async move {
                while let Some(Ok(frame)) = socket.recv().await {
                    let WsFrame::Text(text) = frame else { continue };
                    let Ok(msg) = serde_json::from_str::<PhoenixMessage>(&text) else { continue };
                    if !error_after_join || msg.event != EVENT_JOIN {
                        continue;
                    }
                    let ok = PhoenixMessage::reply(&msg.topic, msg.reference.clone(), ReplyPayload::ok(serde_json::json!({})));
                    let err = PhoenixMessage::new(msg.topic.clone(), EVENT_ERROR, serde_json::json!({}));
                    for frame in [ok, err] {
                        if let Ok(text) = serde_json::to_string(&frame) {
                            let _ = socket.send(WsFrame::Text(text)).await;
                        }
                    }
                }
            })
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{}", addr))
}

async fn assert_ended(sub: &mut Subscription) -> Result<()> {
    let next = tokio::time::timeout(Duration::from_secs(5), sub.next())
        .await
        .context("channel task still running")?;
    assert_eq!(next, None);
    Ok(())
}

async fn next_event(sub: &mut Subscription) -> Result<StoreEvent> {
    tokio::time::timeout(Duration::from_secs(5), sub.next())
        .await
        .context("timed out waiting for a realtime event")?
        .context("realtime channel ended")
}

// Obiettivo test: insert restituisce la riga con id e created_at dello store,
// fetch_recent la contiene e update_notified la aggiorna.
#[tokio::test]
async fn insert_fetch_update_roundtrip() -> Result<()> {
    let (base, _td) = start_store(Some("anon")).await?;
    let store = client_for(&base, "anon")?;

    let first = store.insert(&Draft::new("Ann", "hi")?).await?;
    let second = store.insert(&Draft::new("Bob", "<b>yo</b>")?).await?;
    assert!(!first.id.as_str().is_empty());
    assert!(!first.created_at.is_empty());
    assert_eq!(first.notification_sent, Some(false));
    assert_ne!(first.id, second.id);

    let rows = store.fetch_recent(50).await?;
    let ids: Vec<_> = rows.iter().map(|m| m.id.clone()).collect();
    assert_eq!(ids, vec![second.id.clone(), first.id.clone()]);
    assert_eq!(rows[0].message, "<b>yo</b>");

    assert_eq!(store.fetch_recent(1).await?.len(), 1);

    store.update_notified(&first.id, true).await?;
    let rows = store.fetch_recent(50).await?;
    let updated = rows.iter().find(|m| m.id == first.id).context("row present")?;
    assert_eq!(updated.notification_sent, Some(true));
    Ok(())
}

// Obiettivo test: con la chiave sbagliata REST risponde con un ApiError e il websocket rifiuta l'upgrade.
#[tokio::test]
async fn wrong_key_is_rejected() -> Result<()> {
    let (base, _td) = start_store(Some("secret")).await?;
    let store = client_for(&base, "wrong")?;

    match store.fetch_recent(10).await {
        Err(StoreError::Api { status, .. }) => assert_eq!(status, 401),
        other => panic!("expected 401, got {:?}", other.map(|rows| rows.len())),
    }
    assert!(matches!(store.subscribe().await, Err(StoreError::Realtime(_))));
    Ok(())
}

// Obiettivo test: la sottoscrizione riceve SUBSCRIBED, poi INSERT e UPDATE fatti da un altro client,
// e si chiude in modo ordinato.
#[tokio::test]
async fn subscription_receives_inserts_and_updates() -> Result<()> {
    let (base, _td) = start_store(None).await?;
    let listener = client_for(&base, "anon")?;
    let writer = client_for(&base, "anon")?;

    let mut sub = listener.subscribe().await?;
    assert_eq!(next_event(&mut sub).await?, StoreEvent::Status(ChannelStatus::Subscribed));

    let inserted = writer.insert(&Draft::new("Ann", "hi")?).await?;
    match next_event(&mut sub).await? {
        StoreEvent::Inserted(m) => {
            assert_eq!(m.id, inserted.id);
            assert_eq!(m.name, "Ann");
            assert_eq!(m.notification_sent, Some(false));
        }
        other => panic!("expected insert, got {:?}", other),
    }

    writer.update_notified(&inserted.id, true).await?;
    match next_event(&mut sub).await? {
        StoreEvent::Updated(m) => {
            assert_eq!(m.id, inserted.id);
            assert_eq!(m.notification_sent, Some(true));
        }
        other => panic!("expected update, got {:?}", other),
    }

    tokio::time::timeout(Duration::from_secs(5), sub.unsubscribe())
        .await
        .context("unsubscribe did not complete")?;
    Ok(())
}

// Obiettivo test: un server che non risponde mai al join porta a TIMED_OUT
// entro il timeout configurato, poi il canale termina.
#[tokio::test]
async fn unanswered_join_times_out() -> Result<()> {
    let base = start_realtime_stub(false).await?;
    let cfg = BoardConfig { join_timeout_secs: 1, ..config_for(&base, "anon") };
    let store = RestStore::initialize(&cfg)?;

    let mut sub = store.subscribe().await?;
    assert_eq!(next_event(&mut sub).await?, StoreEvent::Status(ChannelStatus::TimedOut));
    assert_ended(&mut sub).await
}

// Obiettivo test: un join rifiutato dallo store (tabella sconosciuta) diventa CHANNEL_ERROR.
#[tokio::test]
async fn rejected_join_is_a_channel_error() -> Result<()> {
    let (base, _td) = start_store(None).await?;
    let cfg = BoardConfig { table: "other_table".into(), ..config_for(&base, "anon") };
    let store = RestStore::initialize(&cfg)?;

    let mut sub = store.subscribe().await?;
    assert_eq!(next_event(&mut sub).await?, StoreEvent::Status(ChannelStatus::ChannelError));
    assert_ended(&mut sub).await
}

// Obiettivo test: phx_error dopo un join riuscito porta da SUBSCRIBED a CHANNEL_ERROR.
#[tokio::test]
async fn channel_error_after_subscribe() -> Result<()> {
    let base = start_realtime_stub(true).await?;
    let store = client_for(&base, "anon")?;

    let mut sub = store.subscribe().await?;
    assert_eq!(next_event(&mut sub).await?, StoreEvent::Status(ChannelStatus::Subscribed));
    assert_eq!(next_event(&mut sub).await?, StoreEvent::Status(ChannelStatus::ChannelError));
    assert_ended(&mut sub).await
}

//! Canale push dello store: websocket con frame Phoenix.
//!
//! Il task in background si unisce al canale, manda l'heartbeat e traduce i frame
//! `postgres_changes` in [`StoreEvent`]. Non ci sono riconnessioni automatiche:
//! quando il canale cade viene riportato lo stato e il task termina.

use std::time::Duration;

use bacheca_core::protocol::realtime::{
    channel_topic, ChangeKind, ChangesPayload, JoinPayload, PhoenixMessage, ReplyPayload, ReplyStatus,
    EVENT_CLOSE, EVENT_ERROR, EVENT_JOIN, EVENT_LEAVE, EVENT_POSTGRES_CHANGES,
};
use bacheca_core::ChannelStatus;
use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{connect_async, tungstenite::Message as WsFrame};

use super::{StoreEvent, Subscription};
use crate::config::BoardConfig;
use crate::error::StoreError;

const JOIN_REF: &str = "1";

#[derive(Debug, Clone)]
pub struct RealtimeOptions {
    pub channel: String,
    pub schema: String,
    pub table: String,
    pub heartbeat: Duration,
    pub join_timeout: Duration,
}

impl RealtimeOptions {
    pub fn from_config(config: &BoardConfig) -> Self {
        Self {
            channel: config.channel.clone(),
            schema: config.schema.clone(),
            table: config.table.clone(),
            heartbeat: config.heartbeat(),
            join_timeout: config.join_timeout(),
        }
    }
}

/// Apre il websocket e avvia il task del canale. L'errore di connessione è restituito
/// subito; tutto ciò che succede dopo arriva come evento.
pub async fn connect(url: Url, opts: RealtimeOptions) -> Result<Subscription, StoreError> {
    let (socket, _response) = connect_async(url.as_str()).await?;
    let (tx, rx) = mpsc::unbounded_channel();
    let (close_tx, close_rx) = oneshot::channel();
    let task = tokio::spawn(run_channel(socket, opts, tx, close_rx));
    Ok(Subscription::new(rx, Some(close_tx), Some(task)))
}

type Socket = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Contatore dei ref dei frame inviati.
struct Refs(u64);

impl Refs {
    fn next(&mut self) -> String {
        self.0 += 1;
        self.0.to_string()
    }
}

fn encode(frame: &PhoenixMessage) -> WsFrame {
    WsFrame::Text(serde_json::to_string(frame).unwrap_or_default())
}

async fn run_channel(
    socket: Socket,
    opts: RealtimeOptions,
    tx: mpsc::UnboundedSender<StoreEvent>,
    mut close_rx: oneshot::Receiver<()>,
) {
    let topic = channel_topic(&opts.channel);
    let (mut sink, mut stream) = socket.split();
    let mut refs = Refs(1);
    let status = |s: ChannelStatus| tx.send(StoreEvent::Status(s)).is_ok();

    let join = PhoenixMessage::new(
        topic.clone(),
        EVENT_JOIN,
        serde_json::to_value(JoinPayload::inserts_and_updates(&opts.schema, &opts.table))
            .unwrap_or_default(),
    )
    .with_ref(JOIN_REF)
    .with_join_ref(JOIN_REF);
    if let Err(e) = sink.send(encode(&join)).await {
        tracing::warn!("realtime join could not be sent: {}", e);
        status(ChannelStatus::ChannelError);
        return;
    }

    let mut heartbeat = tokio::time::interval(opts.heartbeat);
    // il primo tick è immediato: lo consumiamo, il primo heartbeat parte dopo un intervallo
    heartbeat.tick().await;
    let join_deadline = tokio::time::sleep(opts.join_timeout);
    tokio::pin!(join_deadline);
    let mut joined = false;

    loop {
        tokio::select! {
            _ = &mut close_rx => {
                let leave = PhoenixMessage::new(topic.clone(), EVENT_LEAVE, serde_json::json!({}))
                    .with_ref(refs.next())
                    .with_join_ref(JOIN_REF);
                let _ = sink.send(encode(&leave)).await;
                let _ = sink.close().await;
                status(ChannelStatus::Closed);
                break;
            }
            _ = heartbeat.tick() => {
                if let Err(e) = sink.send(encode(&PhoenixMessage::heartbeat(refs.next()))).await {
                    tracing::warn!("realtime heartbeat failed: {}", e);
                    status(ChannelStatus::ChannelError);
                    break;
                }
            }
            _ = &mut join_deadline, if !joined => {
                tracing::warn!(topic = %topic, "realtime join timed out");
                status(ChannelStatus::TimedOut);
                break;
            }
            frame = stream.next() => {
                let text = match frame {
                    Some(Ok(WsFrame::Text(text))) => text,
                    Some(Ok(WsFrame::Close(_))) | None => {
                        status(ChannelStatus::Closed);
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        tracing::warn!("realtime socket error: {}", e);
                        status(ChannelStatus::ChannelError);
                        break;
                    }
                };
                let Ok(msg) = serde_json::from_str::<PhoenixMessage>(&text) else {
                    tracing::debug!("ignoring malformed realtime frame");
                    continue;
                };
                if msg.topic != topic {
                    // risposte agli heartbeat e topic estranei
                    continue;
                }
                match handle_frame(msg, &mut joined) {
                    Step::Continue => {}
                    Step::Emit(event) => {
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    Step::Stop(final_status) => {
                        status(final_status);
                        break;
                    }
                }
            }
        }
    }
}

enum Step {
    Continue,
    Emit(StoreEvent),
    Stop(ChannelStatus),
}

fn handle_frame(msg: PhoenixMessage, joined: &mut bool) -> Step {
    match msg.event.as_str() {
        _ if !*joined && msg.is_reply_to(JOIN_REF) => {
            match serde_json::from_value::<ReplyPayload>(msg.payload) {
                Ok(reply) if reply.status == ReplyStatus::Ok => {
                    *joined = true;
                    Step::Emit(StoreEvent::Status(ChannelStatus::Subscribed))
                }
                Ok(reply) => {
                    tracing::warn!(response = %reply.response, "realtime join rejected");
                    Step::Stop(ChannelStatus::ChannelError)
                }
                Err(_) => Step::Stop(ChannelStatus::ChannelError),
            }
        }
        EVENT_POSTGRES_CHANGES => {
            let changes = match serde_json::from_value::<ChangesPayload>(msg.payload) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!("undecodable postgres_changes payload: {}", e);
                    return Step::Continue;
                }
            };
            let message = match changes.data.message() {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!("undecodable change record: {}", e);
                    return Step::Continue;
                }
            };
            match changes.data.kind {
                ChangeKind::Insert => Step::Emit(StoreEvent::Inserted(message)),
                ChangeKind::Update => Step::Emit(StoreEvent::Updated(message)),
                ChangeKind::Delete => Step::Continue,
            }
        }
        EVENT_ERROR => Step::Stop(ChannelStatus::ChannelError),
        EVENT_CLOSE => Step::Stop(ChannelStatus::Closed),
        _ => Step::Continue,
    }
}

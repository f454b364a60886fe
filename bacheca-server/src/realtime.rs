use axum::extract::ws::{Message as WsFrame, WebSocket};
use axum::{extract::Extension, extract::Query, extract::WebSocketUpgrade, http::StatusCode, response::IntoResponse};
use bacheca_core::protocol::realtime::{
    JoinPayload, PhoenixMessage, ReplyPayload, EVENT_CLOSE, EVENT_HEARTBEAT, EVENT_JOIN, EVENT_LEAVE,
    PHOENIX_TOPIC,
};
use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::{AppState, Subscriber, SCHEMA, TABLE};

/// Handler per /realtime/v1/websocket?apikey=...&vsn=1.0.0
pub async fn ws_handler(
    Extension(state): Extension<Arc<AppState>>,
    ws: WebSocketUpgrade,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    if let Some(expected) = state.api_key.as_deref() {
        if params.get("apikey").map(String::as_str) != Some(expected) {
            return (StatusCode::UNAUTHORIZED, "invalid or missing apikey").into_response();
        }
    }
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Risposta ad un phx_join: accettato solo se chiede la nostra tabella.
fn join_reply(payload: &serde_json::Value) -> Result<JoinPayload, &'static str> {
    let join: JoinPayload =
        serde_json::from_value(payload.clone()).map_err(|_| "invalid join payload")?;
    if join.config.postgres_changes.is_empty() {
        return Err("no postgres_changes requested");
    }
    if join
        .config
        .postgres_changes
        .iter()
        .any(|f| f.schema != SCHEMA || f.table != TABLE)
    {
        return Err("unknown table");
    }
    Ok(join)
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let conn_id = Uuid::new_v4().to_string();

    // `tx` è un `UnboundedSender<String>`: sia le risposte sia i broadcast passano da qui,
    // così l'ordine dei frame verso il client resta quello di invio.
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();

    // Split socket into sink/stream
    let (mut sender, mut receiver) = socket.split();

    // Task: forward messages from rx -> websocket
    let forward_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(WsFrame::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    let send = |frame: PhoenixMessage| {
        if let Ok(text) = serde_json::to_string(&frame) {
            let _ = tx.send(text);
        }
    };

    while let Some(Ok(msg)) = receiver.next().await {
        let text = match msg {
            WsFrame::Text(t) => t,
            WsFrame::Close(_) => break,
            _ => continue,
        };
        let Ok(frame) = serde_json::from_str::<PhoenixMessage>(&text) else {
            tracing::debug!(conn = %conn_id, "ignoring malformed frame");
            continue;
        };

        match frame.event.as_str() {
            EVENT_HEARTBEAT if frame.topic == PHOENIX_TOPIC => {
                send(PhoenixMessage::reply(PHOENIX_TOPIC, frame.reference, ReplyPayload::ok(serde_json::json!({}))));
            }
            EVENT_JOIN => match join_reply(&frame.payload) {
                Ok(join) => {
                    let events = join.config.postgres_changes.iter().map(|f| f.event).collect();
                    state.subscribers.insert(
                        conn_id.clone(),
                        Subscriber { topic: frame.topic.clone(), events, tx: tx.clone() },
                    );
                    tracing::info!(conn = %conn_id, topic = %frame.topic, "channel joined");
                    let response = serde_json::json!({ "postgres_changes": join.config.postgres_changes });
                    send(PhoenixMessage::reply(&frame.topic, frame.reference, ReplyPayload::ok(response)));
                }
                Err(reason) => {
                    tracing::warn!(conn = %conn_id, topic = %frame.topic, "join rejected: {}", reason);
                    send(PhoenixMessage::reply(&frame.topic, frame.reference, ReplyPayload::error(reason)));
                }
            },
            EVENT_LEAVE => {
                state.subscribers.remove(&conn_id);
                send(PhoenixMessage::reply(&frame.topic, frame.reference, ReplyPayload::ok(serde_json::json!({}))));
                send(PhoenixMessage::new(frame.topic.clone(), EVENT_CLOSE, serde_json::json!({})));
            }
            _ => {}
        }
    }

    // cleanup
    state.subscribers.remove(&conn_id);
    drop(send);
    drop(tx);
    // ensure forward task ends
    let _ = forward_task.await;
}

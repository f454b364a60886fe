use axum::{extract::Extension, extract::Query, http::HeaderMap, http::StatusCode, Json};
use bacheca_core::protocol::realtime::ChangeKind;
use bacheca_core::protocol::rest::{parse_eq_filter, Direction, InsertBody, NotifiedPatch, Order};
use bacheca_core::{new_message_id, now_timestamp, ApiError, Message};
use std::collections::HashMap;
use std::sync::Arc;

use crate::{message_from_row, AppState};

/// Errore HTTP con corpo JSON nello stile PostgREST.
pub type ApiFailure = (StatusCode, Json<ApiError>);

fn failure(status: StatusCode, code: &str, message: impl Into<String>) -> ApiFailure {
    (status, Json(ApiError::new(code, message)))
}

fn db_failure(e: sqlx::Error) -> ApiFailure {
    tracing::error!("db error: {}", e);
    failure(StatusCode::INTERNAL_SERVER_ERROR, "XX000", format!("db error: {}", e))
}

/// Verifica l'header `apikey` quando il server è configurato con una chiave.
pub fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiFailure> {
    let Some(expected) = state.api_key.as_deref() else {
        return Ok(());
    };
    match headers.get("apikey").and_then(|v| v.to_str().ok()) {
        Some(key) if key == expected => Ok(()),
        _ => Err(failure(StatusCode::UNAUTHORIZED, "PGRST301", "invalid or missing apikey")),
    }
}

/// Handler per GET /rest/v1/public_messages?select=*&order=created_at.desc&limit=N
pub async fn list_messages(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Message>>, ApiFailure> {
    authorize(&state, &headers)?;

    if let Some(select) = params.get("select") {
        if select != "*" {
            return Err(failure(StatusCode::BAD_REQUEST, "PGRST100", "only select=* is supported"));
        }
    }
    let order = match params.get("order") {
        Some(raw) => Order::parse(raw)
            .filter(|o| o.column == "created_at")
            .ok_or_else(|| failure(StatusCode::BAD_REQUEST, "PGRST100", format!("unsupported order: {}", raw)))?,
        None => Order::newest_first(),
    };
    let limit: i64 = match params.get("limit") {
        Some(raw) => raw
            .parse::<i64>()
            .ok()
            .filter(|l| *l >= 0)
            .ok_or_else(|| failure(StatusCode::BAD_REQUEST, "PGRST100", format!("invalid limit: {}", raw)))?,
        None => -1, // in SQLite LIMIT -1 significa "nessun limite"
    };

    // la direzione viene da un enum, non dall'input: nessun rischio di injection
    let sql = match order.direction {
        Direction::Desc => "SELECT id, name, message, created_at, telegram_sent FROM public_messages ORDER BY created_at DESC, rowid DESC LIMIT ?",
        Direction::Asc => "SELECT id, name, message, created_at, telegram_sent FROM public_messages ORDER BY created_at ASC, rowid ASC LIMIT ?",
    };
    let rows = sqlx::query(sql)
        .bind(limit)
        .fetch_all(&state.pool)
        .await
        .map_err(db_failure)?;

    let messages = rows
        .iter()
        .map(message_from_row)
        .collect::<Result<Vec<_>, _>>()
        .map_err(db_failure)?;
    Ok(Json(messages))
}

/// Handler per POST /rest/v1/public_messages (oggetto singolo o array)
pub async fn insert_messages(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<InsertBody>,
) -> Result<(StatusCode, Json<Vec<Message>>), ApiFailure> {
    authorize(&state, &headers)?;

    let rows = body.into_rows();
    // validazione prima di scrivere: il CHECK del DB c'è comunque, ma così l'errore è leggibile
    if rows.iter().any(|r| r.name.trim().is_empty() || r.message.trim().is_empty()) {
        return Err(failure(
            StatusCode::BAD_REQUEST,
            "23514",
            "name and message must not be empty",
        ));
    }

    let mut tx = state.pool.begin().await.map_err(db_failure)?;
    let mut inserted = Vec::with_capacity(rows.len());
    for row in rows {
        let message = Message {
            id: new_message_id(),
            name: row.name,
            message: row.message,
            created_at: now_timestamp(),
            notification_sent: Some(row.telegram_sent),
        };
        sqlx::query("INSERT INTO public_messages (id, name, message, created_at, telegram_sent) VALUES (?, ?, ?, ?, ?)")
            .bind(message.id.as_str())
            .bind(&message.name)
            .bind(&message.message)
            .bind(&message.created_at)
            .bind(message.notification_sent)
            .execute(&mut *tx)
            .await
            .map_err(db_failure)?;
        inserted.push(message);
    }
    tx.commit().await.map_err(db_failure)?;

    for message in &inserted {
        tracing::info!(id = %message.id, "message inserted");
        state.broadcast_change(ChangeKind::Insert, message);
    }
    Ok((StatusCode::CREATED, Json(inserted)))
}

/// Handler per PATCH /rest/v1/public_messages?id=eq.<id>
pub async fn update_messages(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
    Json(patch): Json<NotifiedPatch>,
) -> Result<StatusCode, ApiFailure> {
    authorize(&state, &headers)?;

    let id = params
        .get("id")
        .and_then(|raw| parse_eq_filter(raw))
        .ok_or_else(|| failure(StatusCode::BAD_REQUEST, "PGRST100", "update requires an id=eq.<id> filter"))?
        .to_string();

    let result = sqlx::query("UPDATE public_messages SET telegram_sent = ? WHERE id = ?")
        .bind(patch.telegram_sent)
        .bind(&id)
        .execute(&state.pool)
        .await
        .map_err(db_failure)?;

    // come PostgREST: nessuna riga toccata non è un errore
    if result.rows_affected() > 0 {
        let row = sqlx::query("SELECT id, name, message, created_at, telegram_sent FROM public_messages WHERE id = ?")
            .bind(&id)
            .fetch_one(&state.pool)
            .await
            .map_err(db_failure)?;
        let message = message_from_row(&row).map_err(db_failure)?;
        tracing::info!(id = %message.id, sent = patch.telegram_sent, "message updated");
        state.broadcast_change(ChangeKind::Update, &message);
    }
    Ok(StatusCode::NO_CONTENT)
}

use anyhow::Context;
use axum::http::StatusCode;
use bacheca_core::protocol::realtime::{
    ChangeData, ChangeKind, ChangesPayload, PhoenixMessage, EVENT_POSTGRES_CHANGES,
};
use bacheca_core::Message;
use dashmap::DashMap;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedSender;

/// Unica tabella esposta.
pub const TABLE: &str = "public_messages";
pub const SCHEMA: &str = "public";

/// Sessione realtime che si è unita ad un canale.
pub struct Subscriber {
    pub topic: String,
    /// Eventi richiesti nel phx_join.
    pub events: Vec<ChangeKind>,
    /// Canale verso il task che scrive sul websocket.
    pub tx: UnboundedSender<String>,
}

pub struct AppState {
    pub pool: SqlitePool,
    /// Se impostata, REST e websocket richiedono questa apikey.
    pub api_key: Option<String>,
    /// Map of connection id -> subscriber used to forward row changes to joined websocket sessions.
    pub subscribers: DashMap<String, Subscriber>,
}

impl AppState {
    pub fn new(pool: SqlitePool, api_key: Option<String>) -> Self {
        Self {
            pool,
            api_key: api_key.filter(|k| !k.is_empty()),
            subscribers: DashMap::new(),
        }
    }

    /// Invia una modifica di riga a tutte le sessioni che hanno chiesto quell'evento.
    pub fn broadcast_change(&self, kind: ChangeKind, record: &Message) {
        let data = ChangeData {
            kind,
            schema: SCHEMA.to_string(),
            table: TABLE.to_string(),
            commit_timestamp: Some(bacheca_core::now_timestamp()),
            record: serde_json::to_value(record).ok(),
            old_record: None,
        };
        let payload = match serde_json::to_value(ChangesPayload { data, ids: Vec::new() }) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("cannot encode change payload: {}", e);
                return;
            }
        };

        for sub in self.subscribers.iter() {
            if !sub.events.contains(&kind) {
                continue;
            }
            let frame = PhoenixMessage::new(sub.topic.clone(), EVENT_POSTGRES_CHANGES, payload.clone());
            if let Ok(text) = serde_json::to_string(&frame) {
                // se la sessione è già chiusa il send fallisce: la pulizia la fa il suo handler
                let _ = sub.tx.send(text);
            }
        }
    }
}

// Dato un percorso di file, restituisce un URL SQLite valido. Crea le directory genitrici se non esistono.
pub fn sqlite_url_for_path(p: &Path) -> anyhow::Result<String> {
    let abs = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };
    if let Some(parent) = abs.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create parent dirs for {:?}", parent))?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&abs)
        .with_context(|| format!("create/open sqlite file {:?}", abs))?;
    let s = abs.to_string_lossy().replace('\\', "/");
    Ok(format!("sqlite:///{}", s.trim_start_matches('/')))
}

/// Crea un DB URL SQLite leggendo la variabile d'ambiente DATABASE_URL.
/// Se non è impostata, usa "bacheca.db" nella directory corrente.
pub fn build_sqlite_url() -> anyhow::Result<String> {
    let raw = std::env::var("DATABASE_URL").unwrap_or_else(|_| "bacheca.db".to_string());
    // Rimuovi il prefisso "sqlite://" se presente, per ottenere il percorso del file.
    let path_part = if raw.starts_with("sqlite://") {
        raw.trim_start_matches("sqlite:///")
            .trim_start_matches("sqlite://")
            .to_string()
    } else {
        raw
    };
    sqlite_url_for_path(&PathBuf::from(path_part))
}

// Connect to the database and return a connection pool.
pub async fn connect_pool(db_url: &str) -> anyhow::Result<SqlitePool> {
    let pool = SqlitePool::connect(db_url)
        .await
        .with_context(|| format!("connect to sqlite via {}", db_url))?;
    Ok(pool)
}

// Esegue le migrazioni del database. Crea la tabella dei messaggi se non esiste.
pub async fn run_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    let stmts = [
        r#"
        CREATE TABLE IF NOT EXISTS public_messages (
            id            TEXT PRIMARY KEY,
            name          TEXT NOT NULL CHECK (length(trim(name)) > 0),
            message       TEXT NOT NULL CHECK (length(trim(message)) > 0),
            created_at    TEXT NOT NULL,
            telegram_sent INTEGER
        );"#,
        r#"
        CREATE INDEX IF NOT EXISTS public_messages_created_at
            ON public_messages (created_at);"#,
    ];
    // applica ogni statement di migrazione
    for s in &stmts {
        sqlx::query(s)
            .execute(pool)
            .await
            .with_context(|| format!("apply migration: {}", s.trim().chars().take(40).collect::<String>()))?;
    }
    Ok(())
}

/// Converte una riga SQLite nel modello condiviso.
pub fn message_from_row(row: &SqliteRow) -> Result<Message, sqlx::Error> {
    let id: String = row.try_get("id")?;
    Ok(Message {
        id: id.into(),
        name: row.try_get("name")?,
        message: row.try_get("message")?,
        created_at: row.try_get("created_at")?,
        notification_sent: row.try_get("telegram_sent")?,
    })
}

pub mod controllers;
pub mod realtime;
pub mod routes;

/// Controlla lo stato di salute del database tentando di acquisire una connessione dal pool.
pub async fn health_with_pool(pool: &SqlitePool) -> StatusCode {
    match pool.acquire().await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

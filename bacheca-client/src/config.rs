//! Configurazione del client, costruita una sola volta all'avvio e poi condivisa in sola lettura.
//!
//! Ordine di precedenza: valori di default, file TOML, variabili d'ambiente.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bacheca_core::protocol::telegram::DEFAULT_API_BASE;
use bacheca_core::ChatId;
use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// URL base dello store (es. `https://xyz.supabase.co` o `http://127.0.0.1:3000`).
    pub store_url: String,
    /// Chiave pubblica (anon) dello store.
    pub store_key: String,
    pub schema: String,
    pub table: String,
    /// Nome del canale realtime.
    pub channel: String,
    /// Quanti messaggi caricare e tenere in memoria.
    pub fetch_limit: usize,

    pub telegram_bot_token: String,
    pub telegram_chat_ids: Vec<ChatId>,
    pub telegram_api_base: String,

    /// Dopo quanto scompare un banner d'errore transitorio.
    pub error_dismiss_secs: u64,
    pub heartbeat_secs: u64,
    pub join_timeout_secs: u64,

    /// Filtro `tracing`, es. `"info"` o `"debug,reqwest=warn"`.
    pub log_level: String,
    pub log_json: bool,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            store_url: String::new(),
            store_key: String::new(),
            schema: "public".to_string(),
            table: "public_messages".to_string(),
            channel: "public_messages_channel".to_string(),
            fetch_limit: 50,
            telegram_bot_token: String::new(),
            telegram_chat_ids: Vec::new(),
            telegram_api_base: DEFAULT_API_BASE.to_string(),
            error_dismiss_secs: 5,
            heartbeat_secs: 25,
            join_timeout_secs: 10,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl BoardConfig {
    /// File di default: `<config dir>/bacheca/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push("bacheca");
        path.push("config.toml");
        Some(path)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// File esplicito (deve esistere) oppure quello di default se presente, poi l'ambiente.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        Ok(base.with_env(|key| std::env::var(key).ok()))
    }

    /// Applica le variabili d'ambiente. Accetta anche i nomi storici (SUPABASE_*, TELEGRAM_*).
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let first = |keys: &[&str]| keys.iter().find_map(|k| lookup(k).filter(|v| !v.is_empty()));

        if let Some(v) = first(&["BACHECA_STORE_URL", "SUPABASE_URL"]) {
            self.store_url = v;
        }
        if let Some(v) = first(&["BACHECA_STORE_KEY", "SUPABASE_ANON_KEY"]) {
            self.store_key = v;
        }
        if let Some(v) = first(&["BACHECA_TELEGRAM_BOT_TOKEN", "TELEGRAM_BOT_TOKEN"]) {
            self.telegram_bot_token = v;
        }
        if let Some(v) = first(&["BACHECA_TELEGRAM_CHAT_IDS", "TELEGRAM_CHAT_IDS"]) {
            self.telegram_chat_ids = parse_chat_ids(&v);
        }
        if let Some(v) = first(&["BACHECA_TELEGRAM_API_BASE"]) {
            self.telegram_api_base = v;
        }
        if let Some(v) = first(&["BACHECA_LOG"]) {
            self.log_level = v;
        }
        if let Some(v) = first(&["BACHECA_LOG_JSON"]) {
            self.log_json = v == "1" || v.eq_ignore_ascii_case("true");
        }
        if let Some(v) = first(&["BACHECA_FETCH_LIMIT"]).and_then(|v| v.parse().ok()) {
            self.fetch_limit = v;
        }
        self
    }

    /// Bot token e almeno un destinatario.
    pub fn notifier_configured(&self) -> bool {
        !self.telegram_bot_token.trim().is_empty() && !self.telegram_chat_ids.is_empty()
    }

    pub fn error_dismiss(&self) -> Duration {
        Duration::from_secs(self.error_dismiss_secs)
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs.max(1))
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_secs(self.join_timeout_secs.max(1))
    }
}

/// Lista separata da virgole: "-100123, @canale" -> [Id(-100123), Username("@canale")].
pub fn parse_chat_ids(raw: &str) -> Vec<ChatId> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect()
}

use bacheca_core::{ApiError, ValidationError};
use thiserror::Error;

/// Configurazione mancante o non valida: blocca l'inizializzazione della componente.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing store URL")]
    MissingStoreUrl,

    #[error("missing store API key")]
    MissingStoreKey,

    #[error("invalid store URL {url}: {reason}")]
    InvalidStoreUrl { url: String, reason: String },

    #[error("store API key contains characters not allowed in a header")]
    InvalidStoreKey,

    /// Il client HTTP non può essere costruito in questo ambiente (TLS, resolver, ...).
    #[error("HTTP client unavailable: {0}")]
    ClientUnavailable(#[source] reqwest::Error),

    #[error("cannot read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Errore di lettura/scrittura verso lo store: mostrato all'utente, mai ritentato.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("store rejected the request ({status}): {error}")]
    Api { status: u16, error: ApiError },

    #[error("store returned no row")]
    EmptyResponse,

    #[error("realtime connection failed: {0}")]
    Realtime(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Fallimento della consegna verso un singolo destinatario. Non interrompe gli altri.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifierError {
    #[error("Telegram API error: {0}")]
    Transport(String),

    #[error("{description}")]
    Rejected { description: String, error_code: Option<i64> },

    #[error("invalid Telegram response: {0}")]
    Decode(String),
}

/// Errori del file di stato locale (nome salvato).
#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("could not find local data directory")]
    NoDataDir,

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid storage file: {0}")]
    Deserialize(#[from] toml::de::Error),

    #[error("cannot serialize storage: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Rifiuto di una azione utente sulla bacheca.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Please fill in both name and message fields.")]
    Validation(#[from] ValidationError),

    #[error("Store client not initialized. Please check your credentials.")]
    NotInitialized,
}

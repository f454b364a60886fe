use async_trait::async_trait;
use bacheca_core::protocol::realtime::{PROTOCOL_VSN, WEBSOCKET_PATH};
use bacheca_core::protocol::rest::{eq_filter, table_path, ListQuery, NotifiedPatch};
use bacheca_core::{ApiError, Draft, Message, MessageId};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Response, Url};

use super::realtime::{self, RealtimeOptions};
use super::{MessageStore, Subscription};
use crate::config::BoardConfig;
use crate::error::{ConfigError, StoreError};

/// Client dello store esterno: REST per le righe, websocket per il canale push.
#[derive(Debug, Clone)]
pub struct RestStore {
    client: Client,
    table_url: Url,
    realtime_url: Url,
    realtime: RealtimeOptions,
}

impl RestStore {
    /// Valida URL e chiave e prepara il client HTTP con gli header di autenticazione.
    pub fn initialize(config: &BoardConfig) -> Result<Self, ConfigError> {
        let base = config.store_url.trim();
        let key = config.store_key.trim();
        if base.is_empty() {
            return Err(ConfigError::MissingStoreUrl);
        }
        if key.is_empty() {
            return Err(ConfigError::MissingStoreKey);
        }

        let invalid = |reason: String| ConfigError::InvalidStoreUrl { url: base.to_string(), reason };
        let base = base.trim_end_matches('/');
        let table_url = Url::parse(&format!("{}{}", base, table_path(&config.table)))
            .map_err(|e| invalid(e.to_string()))?;
        let ws_scheme = match table_url.scheme() {
            "http" => "ws",
            "https" => "wss",
            other => return Err(invalid(format!("unsupported scheme {}", other))),
        };

        let mut realtime_url = Url::parse(&format!("{}{}", base, WEBSOCKET_PATH))
            .map_err(|e| invalid(e.to_string()))?;
        realtime_url
            .set_scheme(ws_scheme)
            .map_err(|_| invalid("cannot derive websocket URL".to_string()))?;
        realtime_url
            .query_pairs_mut()
            .append_pair("apikey", key)
            .append_pair("vsn", PROTOCOL_VSN);

        let mut headers = HeaderMap::new();
        headers.insert("apikey", HeaderValue::from_str(key).map_err(|_| ConfigError::InvalidStoreKey)?);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", key)).map_err(|_| ConfigError::InvalidStoreKey)?,
        );

        let client = Client::builder()
            .user_agent(concat!("bacheca/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(ConfigError::ClientUnavailable)?;

        tracing::info!(table = %table_url, "store client initialized");
        Ok(Self {
            client,
            table_url,
            realtime_url,
            realtime: RealtimeOptions::from_config(config),
        })
    }

    pub fn realtime_url(&self) -> &Url {
        &self.realtime_url
    }
}

/// Risposte non 2xx: il corpo è un ApiError, oppure testo libero se il server non è PostgREST.
async fn check(resp: Response) -> Result<Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let error = serde_json::from_str::<ApiError>(&body).unwrap_or_else(|_| {
        let message = if body.is_empty() {
            status.canonical_reason().unwrap_or("request failed").to_string()
        } else {
            body
        };
        ApiError::new(status.as_str(), message)
    });
    Err(StoreError::Api { status: status.as_u16(), error })
}

#[async_trait]
impl MessageStore for RestStore {
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<Message>, StoreError> {
        let resp = self
            .client
            .get(self.table_url.clone())
            .query(&ListQuery::recent(limit).to_pairs())
            .send()
            .await?;
        let messages: Vec<Message> = check(resp).await?.json().await?;
        tracing::debug!(count = messages.len(), "messages fetched");
        Ok(messages)
    }

    async fn insert(&self, draft: &Draft) -> Result<Message, StoreError> {
        let resp = self
            .client
            .post(self.table_url.clone())
            .header("Prefer", "return=representation")
            .json(&[draft.to_row()])
            .send()
            .await?;
        let rows: Vec<Message> = check(resp).await?.json().await?;
        rows.into_iter().next().ok_or(StoreError::EmptyResponse)
    }

    async fn update_notified(&self, id: &MessageId, sent: bool) -> Result<(), StoreError> {
        let resp = self
            .client
            .patch(self.table_url.clone())
            .query(&[("id", eq_filter(id.as_str()))])
            .header("Prefer", "return=minimal")
            .json(&NotifiedPatch { telegram_sent: sent })
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    async fn subscribe(&self) -> Result<Subscription, StoreError> {
        realtime::connect(self.realtime_url.clone(), self.realtime.clone()).await
    }
}

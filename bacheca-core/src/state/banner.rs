use std::time::{Duration, Instant};

/// Banner d'errore visibile all'utente.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub text: String,
    /// None: resta finché la configurazione non viene corretta
    pub expires_at: Option<Instant>,
}

impl Banner {
    /// Banner che scompare da solo dopo `ttl`.
    pub fn transient(text: impl Into<String>, now: Instant, ttl: Duration) -> Self {
        Self { text: text.into(), expires_at: Some(now + ttl) }
    }

    pub fn persistent(text: impl Into<String>) -> Self {
        Self { text: text.into(), expires_at: None }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

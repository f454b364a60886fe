use std::collections::VecDeque;

use time::OffsetDateTime;

/// Righe massime conservate nel log attività.
pub const MAX_ENTRIES: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    pub fn css_class(self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Success => "success",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// None solo per la riga "Log cleared."
    pub at: Option<OffsetDateTime>,
    pub level: LogLevel,
    pub text: String,
}

/// Log attività mostrato all'utente.
#[derive(Debug, Clone, Default)]
pub struct ActivityLog {
    entries: VecDeque<LogEntry>,
}

impl ActivityLog {
    pub fn push(&mut self, level: LogLevel, text: impl Into<String>) {
        self.push_at(OffsetDateTime::now_utc(), level, text);
    }

    pub fn push_at(&mut self, at: OffsetDateTime, level: LogLevel, text: impl Into<String>) {
        if self.entries.len() == MAX_ENTRIES {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry { at: Some(at), level, text: text.into() });
    }

    /// Svuota il log lasciando una sola riga di cortesia.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.entries.push_back(LogEntry {
            at: None,
            level: LogLevel::Info,
            text: "Log cleared.".to_string(),
        });
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.back()
    }
}

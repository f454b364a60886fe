//! Rendering puro dello stato in markup HTML. Nessuno stato, nessun I/O.

pub mod escape;
pub mod messages;
pub mod page;

use time::UtcOffset;

pub use escape::escape_html;
pub use messages::{render_message, render_messages, EMPTY_PLACEHOLDER, LOAD_ERROR_PLACEHOLDER};
pub use page::{render_banner, render_log, render_page, render_status, PageModel};

/// Opzioni di presentazione decise dal chiamante.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Offset locale per gli orari mostrati.
    pub offset: UtcOffset,
    /// Se presente, la pagina completa si ricarica da sola ogni N secondi.
    pub refresh_secs: Option<u32>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { offset: UtcOffset::UTC, refresh_secs: None }
    }
}

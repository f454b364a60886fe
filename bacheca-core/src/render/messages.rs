use crate::models::{Message, NotificationStatus};
use crate::state::SessionState;
use crate::utils::format_local;

use super::{escape_html, RenderOptions};

/// Contenuto del contenitore quando non ci sono messaggi.
pub const EMPTY_PLACEHOLDER: &str = r#"<p class="empty-state">No messages yet. Be the first to post!</p>"#;

/// Contenuto del contenitore quando il caricamento iniziale è fallito.
pub const LOAD_ERROR_PLACEHOLDER: &str =
    r#"<p class="empty-state">Error loading messages. Check console for details.</p>"#;

/// Un singolo messaggio. `fresh` aggiunge la classe `new-message` (animazione in testa).
pub fn render_message(
    message: &Message,
    status: NotificationStatus,
    fresh: bool,
    opts: &RenderOptions,
) -> String {
    let class = if fresh { "message-item new-message" } else { "message-item" };
    let id = escape_html(message.id.as_str());
    format!(
        concat!(
            "<div class=\"{class}\" data-id=\"{id}\">\n",
            "  <div class=\"message-header\">\n",
            "    <span class=\"message-name\">{name}</span>\n",
            "    <span class=\"message-time\">{time}</span>\n",
            "  </div>\n",
            "  <div class=\"message-content\">{body}</div>\n",
            "  <div class=\"message-footer\">\n",
            "    <span class=\"telegram-status {status}\">\n",
            "      <span>{icon}</span>\n",
            "      <span>Telegram</span>\n",
            "    </span>\n",
            "    <span>ID: {id}</span>\n",
            "  </div>\n",
            "</div>\n",
        ),
        class = class,
        id = id,
        name = escape_html(&message.name),
        time = escape_html(&format_local(&message.created_at, opts.offset)),
        body = escape_html(&message.message),
        status = status.css_class(),
        icon = status.icon(),
    )
}

/// Contenuto del contenitore dei messaggi, nell'ordine della lista.
pub fn render_messages(state: &SessionState, opts: &RenderOptions) -> String {
    if state.messages().is_empty() {
        return if state.load_failed() {
            LOAD_ERROR_PLACEHOLDER.to_string()
        } else {
            EMPTY_PLACEHOLDER.to_string()
        };
    }

    state
        .messages()
        .iter()
        .map(|msg| {
            let fresh = state.highlight() == Some(&msg.id);
            render_message(msg, state.status_of(msg), fresh, opts)
        })
        .collect()
}

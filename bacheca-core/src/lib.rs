//! bacheca-core: tipi condivisi tra client e store locale (modelli, DTO REST/realtime/Telegram,
//! stato di sessione, rendering HTML, errori).
//! Niente I/O di rete o su file.

pub mod error;
pub mod models;
pub mod protocol;
pub mod render;
pub mod state;
pub mod utils;

// Re-export utili per ridurre i percorsi nei crate client/server
pub use error::{ApiError, ValidationError};
pub use models::{Draft, Message, MessageId, NotificationStatus};
pub use protocol::realtime::{ChangeKind, ChannelStatus, PhoenixMessage};
pub use protocol::rest::{NewMessageRow, NotifiedPatch};
pub use protocol::telegram::{ChatId, SendMessageRequest, TelegramResponse};
pub use render::{render_message, render_messages, render_page, PageModel, RenderOptions};
pub use state::{ActivityLog, Banner, LogLevel, Merge, SessionState};
pub use utils::{new_message_id, now_timestamp};

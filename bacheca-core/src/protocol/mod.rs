pub mod realtime;
pub mod rest;
pub mod telegram;

// Re-export comodi
pub use realtime::{
    ChangeData, ChangeFilter, ChangeKind, ChangesPayload, ChannelStatus, JoinPayload, PhoenixMessage,
    ReplyPayload, ReplyStatus,
};
pub use rest::{InsertBody, ListQuery, NewMessageRow, NotifiedPatch, Order};
pub use telegram::{ChatId, SendMessageRequest, TelegramResponse};

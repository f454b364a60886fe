use uuid::Uuid;

use crate::models::MessageId;

/// Genera un nuovo id di messaggio unico (UUIDv4); lo usano gli store, mai la UI.
pub fn new_message_id() -> MessageId {
    MessageId::new(Uuid::new_v4().to_string())
}

pub mod draft;
pub mod message;

// Re-export per comodità
pub use draft::Draft;
pub use message::{Message, MessageId, NotificationStatus};

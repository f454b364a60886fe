pub mod ids;
pub mod time;

pub use self::ids::new_message_id;
pub use self::time::{format_clock, format_local, format_timestamp, now_timestamp};

pub mod activity;
pub mod banner;
pub mod session;

pub use activity::{ActivityLog, LogEntry, LogLevel};
pub use banner::Banner;
pub use session::{Merge, SessionState};

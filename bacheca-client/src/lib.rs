//! bacheca-client: la bacheca vera e propria.
//!
//! Store esterno (REST + realtime), notifiche Telegram, stato locale e una vista HTML.
//! Il binario `bacheca` legge i comandi da stdin e riscrive la pagina ad ogni cambio.

pub mod board;
pub mod config;
pub mod error;
pub mod notifier;
pub mod prefs;
pub mod store;
pub mod view;

pub use board::{Board, Command, FlowEvent};
pub use config::BoardConfig;
pub use error::{BoardError, ConfigError, NotifierError, PrefsError, StoreError};
pub use notifier::{Notifier, NotifyReport, RecipientOutcome, TelegramNotifier};
pub use prefs::LocalStorage;
pub use store::{MemoryStore, MessageStore, RestStore, StoreEvent, Subscription};
pub use view::{HtmlFileView, View};

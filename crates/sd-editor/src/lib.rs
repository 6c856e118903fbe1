pub mod clipboard;
pub mod config;
pub mod history;
pub mod pool;
pub mod store;
pub mod theme;

pub use clipboard::Clipboard;
pub use config::{ConfigError, EditorConfig};
pub use history::{HistoryEngine, HistorySnapshot};
pub use pool::{Applied, DataChangePool, FlushReport, Intent};
pub use store::{ApplyOutcome, ScreenStore};
pub use theme::theme_patches;

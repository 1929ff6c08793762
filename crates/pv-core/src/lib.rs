//! Core paging, change monitoring and session state for the parquet viewer
//!
//! This crate owns the parts with real invariants: the windowed pager,
//! the live-file change monitor and its reload protocol, and the
//! session/recency model. Rendering is a passive consumer of the windows
//! produced here.

pub mod events;
pub mod pager;
pub mod session;
pub mod viewer;
pub mod watch;

// Re-export commonly used types
pub use events::ViewerEvent;
pub use pager::{Pager, PAGE_SIZE};
pub use session::{
    JsonFileBackend, MemoryBackend, SessionStore, SettingValue, SettingsBackend, MAX_RECENT,
};
pub use viewer::{Viewer, ViewerStatus};
pub use watch::{ChangeMonitor, MonitorEvent, WatchError};

//! Explicit message types for driving the viewer
//!
//! Navigation and file-change notifications are plain values delivered
//! through a queue, not callbacks wired into a widget toolkit. The watch
//! state machine in [`crate::watch`] is the authoritative contract for
//! the change-related variants.

use std::path::PathBuf;

use crate::watch::MonitorEvent;

/// Events the viewer accepts from its owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerEvent {
    /// Advance one page
    NextPage,
    /// Go back one page
    PrevPage,
    /// The watched file changed on disk and awaits a reload decision
    ReloadCandidate(PathBuf),
    /// The watched file vanished; watching has stopped
    WatchLost(PathBuf),
}

impl From<MonitorEvent> for ViewerEvent {
    fn from(event: MonitorEvent) -> Self {
        match event {
            MonitorEvent::ReloadCandidate(path) => ViewerEvent::ReloadCandidate(path),
            MonitorEvent::WatchLost(path) => ViewerEvent::WatchLost(path),
        }
    }
}

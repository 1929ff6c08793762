//! Live-file change monitoring
//!
//! Watches at most one filesystem path at a time and filters the
//! platform's duplicate/coalesced notifications down to genuine
//! modification-time changes. The single-target invariant is enforced
//! here by construction: switching paths always unwatches the old one
//! first, and notifications for anything but the current target are
//! dropped.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Errors from the watch layer. Never fatal: a dataset stays usable
/// without live reload.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("could not start watching {path}: {source}")]
    StartFailed {
        path: PathBuf,
        source: notify::Error,
    },

    #[error("watched file is no longer readable: {0}")]
    LostTarget(PathBuf),
}

/// Notifications surfaced to the reload coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// An external change was detected and awaits confirmation
    ReloadCandidate(PathBuf),
    /// The watched file vanished; watching has stopped
    WatchLost(PathBuf),
}

/// Watch-target state machine.
///
/// `Idle` -> `Watching` on a successful load; `Watching` ->
/// `PendingConfirmation` when the stored mtime changes; confirmation or
/// decline both land back in `Watching` with the new mtime recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
enum WatchState {
    Idle,
    Watching { path: PathBuf, mtime: SystemTime },
    PendingConfirmation { path: PathBuf, mtime: SystemTime },
}

pub struct ChangeMonitor {
    state: WatchState,
    /// Underlying notify watcher. `None` if the platform watcher could
    /// not be created; the monitor then degrades to manual reloads only.
    watcher: Option<RecommendedWatcher>,
    raw_rx: mpsc::UnboundedReceiver<PathBuf>,
}

impl ChangeMonitor {
    pub fn new() -> Self {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();

        let watcher = RecommendedWatcher::new(
            move |result: notify::Result<notify::Event>| match result {
                Ok(event) => {
                    for path in event.paths {
                        let _ = raw_tx.send(path);
                    }
                }
                Err(e) => warn!(error = %e, "filesystem watcher error"),
            },
            Config::default(),
        )
        .map_err(|e| warn!(error = %e, "filesystem watcher unavailable"))
        .ok();

        Self {
            state: WatchState::Idle,
            watcher,
            raw_rx,
        }
    }

    /// Start watching `path`, replacing any current target.
    ///
    /// The old target is always unwatched before the new one is watched,
    /// so at most one watch is active at any instant and stale
    /// notifications from a superseded file cannot be misattributed.
    pub fn watch_path(&mut self, path: &Path) -> Result<(), WatchError> {
        self.stop();

        let mtime = mtime_of(path).map_err(|e| WatchError::StartFailed {
            path: path.to_path_buf(),
            source: notify::Error::io(e),
        })?;

        let watcher = self.watcher.as_mut().ok_or_else(|| WatchError::StartFailed {
            path: path.to_path_buf(),
            source: notify::Error::generic("platform watcher unavailable"),
        })?;
        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::StartFailed {
                path: path.to_path_buf(),
                source,
            })?;

        debug!(path = %path.display(), "watching for external changes");
        self.state = WatchState::Watching {
            path: path.to_path_buf(),
            mtime,
        };
        Ok(())
    }

    /// Stop watching the current target, if any.
    pub fn stop(&mut self) {
        if let Some(path) = self.target_path().map(Path::to_path_buf) {
            if let Some(watcher) = self.watcher.as_mut() {
                // The registration may already be gone (file deleted).
                let _ = watcher.unwatch(&path);
            }
        }
        self.state = WatchState::Idle;
    }

    /// The path currently watched or pending confirmation
    pub fn target_path(&self) -> Option<&Path> {
        match &self.state {
            WatchState::Idle => None,
            WatchState::Watching { path, .. } | WatchState::PendingConfirmation { path, .. } => {
                Some(path)
            }
        }
    }

    /// Path awaiting a reload decision, if any
    pub fn pending_path(&self) -> Option<&Path> {
        match &self.state {
            WatchState::PendingConfirmation { path, .. } => Some(path),
            _ => None,
        }
    }

    pub fn is_watching(&self) -> bool {
        !matches!(self.state, WatchState::Idle)
    }

    /// Feed one raw filesystem notification through the state machine.
    ///
    /// Spurious and duplicate platform events are filtered by comparing
    /// the file's current mtime against the stored one; notifications
    /// for anything other than the current target are dropped.
    pub fn handle_fs_event(&mut self, path: &Path) -> Option<MonitorEvent> {
        let (current, known_mtime) = match &self.state {
            WatchState::Watching { path, mtime } => (path.clone(), *mtime),
            // Nothing watched, or a candidate is already pending.
            _ => return None,
        };
        if path != current {
            debug!(path = %path.display(), "dropping notification for superseded target");
            return None;
        }

        match mtime_of(&current) {
            Err(_) => {
                warn!(path = %current.display(), "watched file vanished");
                self.stop();
                Some(MonitorEvent::WatchLost(current))
            }
            Ok(mtime) if mtime == known_mtime => None,
            Ok(mtime) => {
                self.state = WatchState::PendingConfirmation {
                    path: current.clone(),
                    mtime,
                };
                Some(MonitorEvent::ReloadCandidate(current))
            }
        }
    }

    /// Drain queued raw notifications into monitor events.
    pub fn poll(&mut self) -> Vec<MonitorEvent> {
        let mut paths = Vec::new();
        while let Ok(path) = self.raw_rx.try_recv() {
            paths.push(path);
        }
        paths
            .into_iter()
            .filter_map(|path| self.handle_fs_event(&path))
            .collect()
    }

    /// Resume watching after a successful reload of the current target,
    /// recording its fresh mtime. Falls back to a full watch when the
    /// target differs (e.g. "reopen last" with nothing watched).
    pub fn resume_or_watch(&mut self, path: &Path) -> Result<(), WatchError> {
        match self.target_path() {
            Some(current) if current == path => {
                let mtime = mtime_of(path).map_err(|e| WatchError::StartFailed {
                    path: path.to_path_buf(),
                    source: notify::Error::io(e),
                })?;
                self.state = WatchState::Watching {
                    path: path.to_path_buf(),
                    mtime,
                };
                Ok(())
            }
            _ => self.watch_path(path),
        }
    }

    /// Decline a pending reload: keep the old dataset but record the new
    /// mtime so the same external change is not re-flagged.
    pub fn decline_reload(&mut self) {
        if let WatchState::PendingConfirmation { path, mtime } = &self.state {
            self.state = WatchState::Watching {
                path: path.clone(),
                mtime: *mtime,
            };
        }
    }
}

impl Default for ChangeMonitor {
    fn default() -> Self {
        Self::new()
    }
}

fn mtime_of(path: &Path) -> std::io::Result<SystemTime> {
    fs::metadata(path)?.modified()
}

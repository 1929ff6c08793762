//! Reload coordination: the single owner of the current-dataset slot
//!
//! Loads, reloads and navigation are serialized through [`Viewer`];
//! installation of a decoded dataset is one atomic slot swap observed by
//! readers. All failures are recovered here into a status value; nothing
//! propagates past this boundary.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use pv_data::{Dataset, LoadError, ValueCount, Window};

use crate::events::ViewerEvent;
use crate::pager::Pager;
use crate::session::SessionStore;
use crate::watch::ChangeMonitor;

/// Outcome surfaced to the display layer after each operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerStatus {
    /// No file loaded
    Empty,
    /// Showing `path`; `watching` is false when live reload could not be
    /// armed (non-fatal)
    Loaded { path: PathBuf, watching: bool },
    /// A load or reload failed; the message is user-visible
    LoadFailed(String),
    /// The watched file vanished; the last loaded dataset is still shown
    WatchLost(PathBuf),
    /// The decode belonged to a superseded request and was discarded
    Superseded,
}

/// What a finished decode should do with the viewer's position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    /// Fresh open: offset resets to 0, MRU and last-file are updated
    Open,
    /// Reload of the active file: the offset is reclamped, not reset
    Reload { requested_offset: usize },
}

/// Ties an in-flight decode to the load generation that issued it.
///
/// A decode finishing after a newer load began is discarded rather than
/// installed, so watch-target and recency bookkeeping never regress to
/// an old file.
#[derive(Debug)]
pub struct LoadTicket {
    generation: u64,
    path: PathBuf,
    kind: LoadKind,
}

pub struct Viewer {
    /// Current-dataset slot; swapped wholesale under the write lock
    dataset: Arc<RwLock<Option<Arc<Dataset>>>>,
    offset: usize,
    pager: Pager,
    monitor: ChangeMonitor,
    session: SessionStore,
    status: ViewerStatus,
    generation: u64,
}

impl Viewer {
    pub fn new(monitor: ChangeMonitor, session: SessionStore) -> Self {
        Self::with_pager(monitor, session, Pager::default())
    }

    pub fn with_pager(monitor: ChangeMonitor, session: SessionStore, pager: Pager) -> Self {
        Self {
            dataset: Arc::new(RwLock::new(None)),
            offset: 0,
            pager,
            monitor,
            session,
            status: ViewerStatus::Empty,
            generation: 0,
        }
    }

    /// Open a different file. On failure the previous dataset, watch
    /// target and recency list are all left untouched.
    pub async fn open_new_file(&mut self, path: impl Into<PathBuf>) -> ViewerStatus {
        let path = path.into();
        let ticket = self.begin_load(path.clone(), LoadKind::Open);
        let result = Dataset::load_async(path).await;
        self.finish_load(ticket, result)
    }

    /// Reload the active file, preserving the given offset where it is
    /// still valid. On failure the previous dataset is discarded and the
    /// watch target torn down: a reload failure means the active file is
    /// no longer trustworthy.
    pub async fn reload_current_file(&mut self, requested_offset: usize) -> ViewerStatus {
        let Some(path) = self.current_path() else {
            return ViewerStatus::Empty;
        };
        self.reload_path(path, requested_offset).await
    }

    /// Reopen the last session's file at its saved offset.
    pub async fn reopen_last(&mut self) -> ViewerStatus {
        let Some(path) = self.session.last_file().map(Path::to_path_buf) else {
            debug!("no previous session file to reopen");
            return self.status.clone();
        };
        let offset = self.session.last_offset();
        self.reload_path(path, offset).await
    }

    /// Accept a pending external change and reload at the current offset.
    pub async fn confirm_reload(&mut self) -> ViewerStatus {
        let Some(path) = self.monitor.pending_path().map(Path::to_path_buf) else {
            return self.status.clone();
        };
        let offset = self.offset;
        self.reload_path(path, offset).await
    }

    /// Keep the current dataset; the change is not re-flagged.
    pub fn decline_reload(&mut self) {
        self.monitor.decline_reload();
    }

    async fn reload_path(&mut self, path: PathBuf, requested_offset: usize) -> ViewerStatus {
        let ticket = self.begin_load(path.clone(), LoadKind::Reload { requested_offset });
        let result = Dataset::load_async(path).await;
        self.finish_load(ticket, result)
    }

    /// Start a load, superseding any decode still in flight.
    pub fn begin_load(&mut self, path: PathBuf, kind: LoadKind) -> LoadTicket {
        self.generation += 1;
        LoadTicket {
            generation: self.generation,
            path,
            kind,
        }
    }

    /// Install (or reject) a finished decode.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Dataset, LoadError>,
    ) -> ViewerStatus {
        if ticket.generation != self.generation {
            debug!(path = %ticket.path.display(), "discarding superseded decode result");
            return ViewerStatus::Superseded;
        }

        match (ticket.kind, result) {
            (LoadKind::Open, Ok(dataset)) => {
                let watching = self.arm_watch(&ticket.path);
                self.install(dataset, 0);
                self.session.record_recent(&ticket.path);
                self.session.record_last_position(&ticket.path, 0);
                self.flush_session();
                info!(path = %ticket.path.display(), "opened file");
                self.status = ViewerStatus::Loaded {
                    path: ticket.path,
                    watching,
                };
            }
            (LoadKind::Open, Err(e)) => {
                warn!(path = %ticket.path.display(), error = %e, "open failed");
                self.status = ViewerStatus::LoadFailed(e.to_string());
            }
            (LoadKind::Reload { requested_offset }, Ok(dataset)) => {
                let offset = self.pager.reclamp(requested_offset, dataset.height());
                let watching = self
                    .monitor
                    .resume_or_watch(&ticket.path)
                    .map_err(|e| warn!(error = %e, "could not resume watching"))
                    .is_ok();
                self.install(dataset, offset);
                self.session.record_last_position(&ticket.path, offset);
                self.flush_session();
                info!(path = %ticket.path.display(), offset, "reloaded file");
                self.status = ViewerStatus::Loaded {
                    path: ticket.path,
                    watching,
                };
            }
            (LoadKind::Reload { .. }, Err(e)) => {
                warn!(path = %ticket.path.display(), error = %e, "reload failed, discarding dataset");
                self.monitor.stop();
                *self.dataset.write() = None;
                self.offset = 0;
                self.status = ViewerStatus::LoadFailed(e.to_string());
            }
        }
        self.status.clone()
    }

    fn arm_watch(&mut self, path: &Path) -> bool {
        match self.monitor.watch_path(path) {
            Ok(()) => true,
            Err(e) => {
                // Non-fatal: the dataset is usable without live reload.
                warn!(error = %e, "could not start watching");
                false
            }
        }
    }

    fn install(&mut self, dataset: Dataset, offset: usize) {
        *self.dataset.write() = Some(Arc::new(dataset));
        self.offset = offset;
    }

    fn flush_session(&mut self) {
        if let Err(e) = self.session.flush() {
            warn!(error = %e, "could not persist session state");
        }
    }

    /// Handle one queued event.
    pub fn handle_event(&mut self, event: ViewerEvent) {
        match event {
            ViewerEvent::NextPage => self.next_page(),
            ViewerEvent::PrevPage => self.prev_page(),
            // The owner decides whether to confirm or decline.
            ViewerEvent::ReloadCandidate(_) => {}
            ViewerEvent::WatchLost(path) => {
                self.status = ViewerStatus::WatchLost(path);
            }
        }
    }

    /// Drain monitor notifications into viewer events.
    pub fn poll_events(&mut self) -> Vec<ViewerEvent> {
        self.monitor
            .poll()
            .into_iter()
            .map(ViewerEvent::from)
            .collect()
    }

    pub fn next_page(&mut self) {
        let Some(height) = self.height() else { return };
        if !self.pager.can_next(self.offset, height) {
            return;
        }
        self.offset = self.pager.next_offset(self.offset, height);
        self.remember_offset();
    }

    pub fn prev_page(&mut self) {
        if !self.pager.can_prev(self.offset) {
            return;
        }
        self.offset = self.pager.prev_offset(self.offset);
        self.remember_offset();
    }

    fn remember_offset(&mut self) {
        if let Some(path) = self.current_path() {
            self.session.record_last_position(&path, self.offset);
        }
    }

    pub fn can_next(&self) -> bool {
        self.height()
            .is_some_and(|h| self.pager.can_next(self.offset, h))
    }

    pub fn can_prev(&self) -> bool {
        self.dataset.read().is_some() && self.pager.can_prev(self.offset)
    }

    /// Slice the current page. Read-only and repeatable.
    pub fn window(&self) -> Option<Window> {
        self.dataset
            .read()
            .as_ref()
            .map(|ds| ds.slice(self.offset, self.pager.page_size()))
    }

    /// Shared handle to the installed dataset, for read-only consumers.
    pub fn dataset(&self) -> Option<Arc<Dataset>> {
        self.dataset.read().clone()
    }

    /// Occurrence counts for one column of the current dataset.
    pub fn value_counts(&self, column: &str) -> anyhow::Result<Vec<ValueCount>> {
        let Some(dataset) = self.dataset() else {
            anyhow::bail!("no file loaded");
        };
        Ok(dataset.value_counts(column)?)
    }

    pub fn current_path(&self) -> Option<PathBuf> {
        self.dataset.read().as_ref().map(|d| d.path().to_path_buf())
    }

    fn height(&self) -> Option<usize> {
        self.dataset.read().as_ref().map(|d| d.height())
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    pub fn status(&self) -> &ViewerStatus {
        &self.status
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionStore {
        &mut self.session
    }

    /// Persist the final position and stop watching.
    pub fn shutdown(&mut self) {
        self.remember_offset();
        self.flush_session();
        self.monitor.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::sync::Arc as StdArc;
    use std::time::Duration;

    use arrow::array::{ArrayRef, Int64Array, StringArray};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    use super::*;
    use crate::session::MemoryBackend;
    use crate::watch::MonitorEvent;

    fn write_ids(path: &Path, rows: usize) {
        let ids: Int64Array = (0..rows as i64).collect::<Vec<_>>().into();
        let batch =
            RecordBatch::try_from_iter(vec![("id", StdArc::new(ids) as ArrayRef)]).unwrap();
        write_batch(path, batch);
    }

    fn write_two_columns(path: &Path, rows: usize) {
        let ids: Int64Array = (0..rows as i64).collect::<Vec<_>>().into();
        let names: StringArray = (0..rows).map(|i| Some(format!("row{i}"))).collect();
        let batch = RecordBatch::try_from_iter(vec![
            ("id", StdArc::new(ids) as ArrayRef),
            ("name", StdArc::new(names) as ArrayRef),
        ])
        .unwrap();
        write_batch(path, batch);
    }

    fn write_batch(path: &Path, batch: RecordBatch) {
        let file = File::create(path).unwrap();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    fn bump_mtime(path: &Path) {
        let file = File::options().write(true).open(path).unwrap();
        let mtime = file.metadata().unwrap().modified().unwrap();
        file.set_modified(mtime + Duration::from_secs(5)).unwrap();
    }

    fn viewer(page_size: usize) -> Viewer {
        Viewer::with_pager(
            ChangeMonitor::new(),
            SessionStore::load(Box::new(MemoryBackend::new())),
            Pager::new(page_size),
        )
    }

    #[tokio::test]
    async fn test_change_notification_reload_flow() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.parquet");
        write_ids(&path, 3);

        let mut v = viewer(10_000);
        let status = v.open_new_file(&path).await;
        assert!(matches!(status, ViewerStatus::Loaded { watching: true, .. }));

        let window = v.window().unwrap();
        assert_eq!(window.row_count(), 3);
        assert_eq!(window.total_height(), 3);
        assert_eq!(window.width(), 1);
        assert_eq!(v.pager().display_bounds(v.offset(), 3), Some((1, 3)));

        // Rewrite the file with a different shape and a new mtime.
        write_two_columns(&path, 5);
        bump_mtime(&path);
        assert_eq!(
            v.monitor.handle_fs_event(&path),
            Some(MonitorEvent::ReloadCandidate(path.clone()))
        );

        let status = v.confirm_reload().await;
        assert!(matches!(status, ViewerStatus::Loaded { .. }));
        let window = v.window().unwrap();
        assert_eq!(window.row_count(), 5);
        assert_eq!(window.total_height(), 5);
        assert_eq!(window.width(), 2);
        assert_eq!(v.offset(), 0);
        // Monitor is re-armed: the same mtime no longer flags a change.
        assert_eq!(v.monitor.handle_fs_event(&path), None);
    }

    #[tokio::test]
    async fn test_open_b_ignores_pending_notification_for_a() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.parquet");
        let b = dir.path().join("b.parquet");
        write_ids(&a, 3);
        write_ids(&b, 4);

        let mut v = viewer(10_000);
        v.open_new_file(&a).await;
        v.open_new_file(&b).await;

        // A notification for the superseded file arriving late must not
        // trigger a reload of B.
        bump_mtime(&a);
        assert_eq!(v.monitor.handle_fs_event(&a), None);
        assert_eq!(v.current_path(), Some(b.clone()));
        assert_eq!(v.window().unwrap().total_height(), 4);
    }

    #[tokio::test]
    async fn test_reload_reclamps_shrunk_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.parquet");
        write_ids(&path, 35);

        let mut v = viewer(10);
        v.open_new_file(&path).await;
        v.next_page();
        v.next_page();
        v.next_page();
        assert_eq!(v.offset(), 30);

        write_ids(&path, 12);
        bump_mtime(&path);
        v.monitor.handle_fs_event(&path);
        let status = v.confirm_reload().await;

        assert!(matches!(status, ViewerStatus::Loaded { .. }));
        // Last valid page start, not 0.
        assert_eq!(v.offset(), 10);
        assert_eq!(v.window().unwrap().row_count(), 2);
    }

    #[tokio::test]
    async fn test_open_failure_keeps_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.parquet");
        write_ids(&a, 3);

        let mut v = viewer(10_000);
        v.open_new_file(&a).await;
        let status = v.open_new_file(dir.path().join("missing.parquet")).await;

        assert!(matches!(status, ViewerStatus::LoadFailed(_)));
        assert_eq!(v.current_path(), Some(a.clone()));
        assert_eq!(v.window().unwrap().total_height(), 3);
        // Watch target and MRU untouched by the failed open.
        assert!(v.monitor.is_watching());
        assert_eq!(v.session().recent_files(), vec![a]);
    }

    #[tokio::test]
    async fn test_reload_failure_discards_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.parquet");
        write_ids(&path, 3);

        let mut v = viewer(10_000);
        v.open_new_file(&path).await;
        std::fs::remove_file(&path).unwrap();

        let status = v.reload_current_file(0).await;
        assert!(matches!(status, ViewerStatus::LoadFailed(_)));
        assert!(v.window().is_none());
        assert!(!v.monitor.is_watching());
    }

    #[tokio::test]
    async fn test_stale_decode_result_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.parquet");
        let b = dir.path().join("b.parquet");
        write_ids(&a, 3);
        write_ids(&b, 4);

        let mut v = viewer(10_000);
        let ticket_a = v.begin_load(a.clone(), LoadKind::Open);
        let ticket_b = v.begin_load(b.clone(), LoadKind::Open);

        let decoded_b = Dataset::load(&b).unwrap();
        assert!(matches!(
            v.finish_load(ticket_b, Ok(decoded_b)),
            ViewerStatus::Loaded { .. }
        ));

        // The earlier decode completes late; its result must be dropped.
        let decoded_a = Dataset::load(&a).unwrap();
        assert_eq!(
            v.finish_load(ticket_a, Ok(decoded_a)),
            ViewerStatus::Superseded
        );
        assert_eq!(v.current_path(), Some(b.clone()));
        assert_eq!(v.session().recent_files(), vec![b]);
    }

    #[tokio::test]
    async fn test_reopen_last_restores_position() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.parquet");
        write_ids(&path, 25);

        let mut v = viewer(10);
        v.open_new_file(&path).await;
        v.next_page();
        assert_eq!(v.offset(), 10);
        v.shutdown();

        // Fresh viewer over the same (memory) session state.
        let session = SessionStore::load(Box::new(MemoryBackend::new()));
        let mut v2 = Viewer::with_pager(ChangeMonitor::new(), session, Pager::new(10));
        v2.session_mut().record_last_position(&path, 10);
        let status = v2.reopen_last().await;

        assert!(matches!(status, ViewerStatus::Loaded { .. }));
        assert_eq!(v2.current_path(), Some(path));
        assert_eq!(v2.offset(), 10);
    }

    #[tokio::test]
    async fn test_decline_keeps_dataset_and_rearms() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.parquet");
        write_ids(&path, 3);

        let mut v = viewer(10_000);
        v.open_new_file(&path).await;
        write_ids(&path, 7);
        bump_mtime(&path);
        v.monitor.handle_fs_event(&path);

        v.decline_reload();
        // Old dataset still shown, and the declined change is not
        // re-flagged.
        assert_eq!(v.window().unwrap().total_height(), 3);
        assert_eq!(v.monitor.handle_fs_event(&path), None);
    }

    #[tokio::test]
    async fn test_watch_lost_event_updates_status() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.parquet");
        write_ids(&path, 3);

        let mut v = viewer(10_000);
        v.open_new_file(&path).await;
        std::fs::remove_file(&path).unwrap();

        let event = v.monitor.handle_fs_event(&path).unwrap();
        v.handle_event(event.into());
        assert_eq!(v.status(), &ViewerStatus::WatchLost(path));
        // Dataset remains viewable in its last loaded form.
        assert_eq!(v.window().unwrap().total_height(), 3);
    }

    #[tokio::test]
    async fn test_navigation_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.parquet");
        write_ids(&path, 25);

        let mut v = viewer(10);
        v.open_new_file(&path).await;
        assert!(v.can_next());
        assert!(!v.can_prev());

        v.handle_event(ViewerEvent::NextPage);
        assert_eq!(v.offset(), 10);
        v.handle_event(ViewerEvent::PrevPage);
        assert_eq!(v.offset(), 0);
        // Clamped at the start.
        v.handle_event(ViewerEvent::PrevPage);
        assert_eq!(v.offset(), 0);
        // Never wraps past the end.
        v.handle_event(ViewerEvent::NextPage);
        v.handle_event(ViewerEvent::NextPage);
        v.handle_event(ViewerEvent::NextPage);
        assert_eq!(v.offset(), 20);
    }
}

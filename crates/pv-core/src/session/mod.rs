//! Session and recency persistence
//!
//! A small value model over an opaque get/set substrate. The store is an
//! explicit value injected into the viewer at construction: read once at
//! startup, flushed on every successful load and at shutdown. There is
//! no ambient global.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Bounded length of the recent-files list
pub const MAX_RECENT: usize = 10;

const KEY_LAST_FILE: &str = "last_file";
const KEY_LAST_OFFSET: &str = "last_offset";
const KEY_RECENT_FILES: &str = "recent_files";

/// Values the persistence substrate can hold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SettingValue {
    String(String),
    Integer(i64),
    StringList(Vec<String>),
    /// Opaque UI geometry blobs pass through unexamined
    Blob(Vec<u8>),
}

/// Opaque get/set persistence substrate
pub trait SettingsBackend: Send {
    fn get(&self, key: &str) -> Option<SettingValue>;
    fn set(&mut self, key: &str, value: SettingValue);

    /// Flush buffered writes to durable storage.
    fn flush(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// In-memory backend for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryBackend {
    values: BTreeMap<String, SettingValue>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsBackend for MemoryBackend {
    fn get(&self, key: &str) -> Option<SettingValue> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: SettingValue) {
        self.values.insert(key.to_string(), value);
    }
}

/// Settings persisted as a JSON map on disk
pub struct JsonFileBackend {
    path: PathBuf,
    values: BTreeMap<String, SettingValue>,
}

impl JsonFileBackend {
    /// Open a settings file. A missing or malformed file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = std::fs::read_to_string(&path)
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default();
        Self { path, values }
    }
}

impl SettingsBackend for JsonFileBackend {
    fn get(&self, key: &str) -> Option<SettingValue> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: SettingValue) {
        self.values.insert(key.to_string(), value);
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

/// Session state: last file, last offset and the MRU list.
///
/// Mutations write through to the backend's key space immediately;
/// durable persistence happens on [`SessionStore::flush`].
pub struct SessionStore {
    backend: Box<dyn SettingsBackend>,
    last_file: Option<PathBuf>,
    last_offset: usize,
    recent: Vec<PathBuf>,
}

impl SessionStore {
    /// Read persisted state once at startup.
    pub fn load(backend: Box<dyn SettingsBackend>) -> Self {
        let last_file = match backend.get(KEY_LAST_FILE) {
            Some(SettingValue::String(s)) if !s.is_empty() => Some(PathBuf::from(s)),
            _ => None,
        };
        let last_offset = match backend.get(KEY_LAST_OFFSET) {
            Some(SettingValue::Integer(n)) if n >= 0 => n as usize,
            _ => 0,
        };
        let recent: Vec<PathBuf> = match backend.get(KEY_RECENT_FILES) {
            Some(SettingValue::StringList(list)) => list
                .into_iter()
                .map(PathBuf::from)
                .take(MAX_RECENT)
                .collect(),
            _ => Vec::new(),
        };
        debug!(
            last_file = ?last_file,
            last_offset,
            recent = recent.len(),
            "session state restored"
        );
        Self {
            backend,
            last_file,
            last_offset,
            recent,
        }
    }

    /// Move `path` to the front of the MRU list, deduplicated by exact
    /// path equality and truncated to [`MAX_RECENT`]. Idempotent;
    /// unrelated entries keep their relative order.
    pub fn record_recent(&mut self, path: &Path) {
        self.recent.retain(|p| p != path);
        self.recent.insert(0, path.to_path_buf());
        self.recent.truncate(MAX_RECENT);
        let list = self
            .recent
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        self.backend.set(KEY_RECENT_FILES, SettingValue::StringList(list));
    }

    /// Unconditionally overwrite the last-position record.
    pub fn record_last_position(&mut self, path: &Path, offset: usize) {
        self.last_file = Some(path.to_path_buf());
        self.last_offset = offset;
        self.backend.set(
            KEY_LAST_FILE,
            SettingValue::String(path.to_string_lossy().into_owned()),
        );
        self.backend
            .set(KEY_LAST_OFFSET, SettingValue::Integer(offset as i64));
    }

    /// Empty the MRU list. The last-position record is independent and
    /// untouched.
    pub fn clear_recent(&mut self) {
        self.recent.clear();
        self.backend
            .set(KEY_RECENT_FILES, SettingValue::StringList(Vec::new()));
    }

    pub fn last_file(&self) -> Option<&Path> {
        self.last_file.as_deref()
    }

    /// Offset saved for [`Self::last_file`]; meaningless without it.
    pub fn last_offset(&self) -> usize {
        self.last_offset
    }

    /// Owned snapshot of the MRU list, most recent first. Each entry is
    /// an independent value, so per-entry handlers cannot alias a shared
    /// loop variable.
    pub fn recent_files(&self) -> Vec<PathBuf> {
        self.recent.clone()
    }

    /// Pass-through access for opaque blobs (window geometry and the like).
    pub fn blob(&self, key: &str) -> Option<Vec<u8>> {
        match self.backend.get(key) {
            Some(SettingValue::Blob(bytes)) => Some(bytes),
            _ => None,
        }
    }

    pub fn set_blob(&mut self, key: &str, bytes: Vec<u8>) {
        self.backend.set(key, SettingValue::Blob(bytes));
    }

    /// Write state to durable storage.
    pub fn flush(&mut self) -> anyhow::Result<()> {
        self.backend.flush()
    }
}

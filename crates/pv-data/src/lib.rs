//! Parquet dataset loading and windowed slicing

pub mod counts;
pub mod dataset;
pub mod window;

use std::path::{Path, PathBuf};

use thiserror::Error;

// Re-exports
pub use counts::ValueCount;
pub use dataset::Dataset;
pub use window::{DisplayValue, Window};

/// Errors that can occur while loading a dataset from disk
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("corrupt parquet data: {0}")]
    Corrupt(String),
}

impl LoadError {
    pub(crate) fn from_io(error: std::io::Error, path: &Path) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => LoadError::PermissionDenied(path.to_path_buf()),
            _ => LoadError::Corrupt(error.to_string()),
        }
    }
}

/// Errors from auxiliary column queries (e.g. value counts)
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("no such column: {0}")]
    NoSuchColumn(String),

    #[error("unsupported column type for '{column}': {detail}")]
    Unsupported { column: String, detail: String },
}

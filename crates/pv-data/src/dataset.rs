use std::fs::File;
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tracing::info;

use crate::window::Window;
use crate::LoadError;

/// A fully decoded columnar dataset.
///
/// Immutable once loaded. A reload produces a fresh `Dataset` that the
/// owner swaps in wholesale; nothing is ever mutated in place.
pub struct Dataset {
    /// Path the dataset was decoded from
    path: PathBuf,
    /// Schema shared by all batches
    schema: SchemaRef,
    /// Decoded row data in reader order
    batches: Vec<RecordBatch>,
    /// Total row count across batches
    height: usize,
    /// Column name -> ordinal. First occurrence wins on duplicate names.
    column_index: AHashMap<String, usize>,
}

impl Dataset {
    /// Decode an entire Parquet file into memory.
    ///
    /// On failure no partial state exists; the caller decides what to do
    /// with any previously loaded dataset.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| LoadError::from_io(e, path))?;

        let builder = ParquetRecordBatchReaderBuilder::try_new(file)
            .map_err(|e| LoadError::Corrupt(e.to_string()))?;
        let schema = builder.schema().clone();
        let reader = builder
            .build()
            .map_err(|e| LoadError::Corrupt(e.to_string()))?;

        let batches: Vec<RecordBatch> = reader
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| LoadError::Corrupt(e.to_string()))?;

        let dataset = Self::from_parts(path.to_path_buf(), schema, batches);
        info!(
            path = %dataset.path.display(),
            rows = dataset.height,
            columns = dataset.width(),
            "loaded parquet dataset"
        );
        Ok(dataset)
    }

    /// Decode on the blocking pool so an interactive loop is not stalled.
    pub async fn load_async(path: PathBuf) -> Result<Self, LoadError> {
        tokio::task::spawn_blocking(move || Self::load(&path))
            .await
            .map_err(|e| LoadError::Corrupt(format!("decode task failed: {e}")))?
    }

    pub(crate) fn from_parts(path: PathBuf, schema: SchemaRef, batches: Vec<RecordBatch>) -> Self {
        let height = batches.iter().map(RecordBatch::num_rows).sum();
        let mut column_index = AHashMap::with_capacity(schema.fields().len());
        for (ordinal, field) in schema.fields().iter().enumerate() {
            column_index.entry(field.name().clone()).or_insert(ordinal);
        }
        Self {
            path,
            schema,
            batches,
            height,
            column_index,
        }
    }

    /// Total row count
    pub fn height(&self) -> usize {
        self.height
    }

    /// Column count
    pub fn width(&self) -> usize {
        self.schema.fields().len()
    }

    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name for status display
    pub fn source_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown.parquet")
    }

    /// Column names in schema order
    pub fn column_names(&self) -> Vec<&str> {
        self.schema
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect()
    }

    /// Ordinal of a column by name, for "jump to column" lookups
    pub fn column_ordinal(&self, name: &str) -> Option<usize> {
        self.column_index.get(name).copied()
    }

    pub(crate) fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    /// Produce a bounded window over `[offset, offset + max_rows)`.
    ///
    /// The offset is clamped to `[0, height]` and the row count to
    /// `min(max_rows, height - offset)`; an offset at or past the end
    /// yields a zero-row window. Underlying column storage is shared,
    /// not copied (`RecordBatch::slice` is zero-copy).
    pub fn slice(&self, offset: usize, max_rows: usize) -> Window {
        let offset = offset.min(self.height);
        let rows = max_rows.min(self.height - offset);

        let mut parts = Vec::new();
        let mut skip = offset;
        let mut remaining = rows;
        for batch in &self.batches {
            if remaining == 0 {
                break;
            }
            let batch_rows = batch.num_rows();
            if skip >= batch_rows {
                skip -= batch_rows;
                continue;
            }
            let take = (batch_rows - skip).min(remaining);
            parts.push(batch.slice(skip, take));
            skip = 0;
            remaining -= take;
        }

        Window::new(offset, rows, self.height, self.schema.clone(), parts)
    }
}

impl std::fmt::Debug for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("path", &self.path)
            .field("height", &self.height)
            .field("width", &self.width())
            .finish()
    }
}

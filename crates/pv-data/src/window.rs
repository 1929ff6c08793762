//! Bounded, offset-addressed views handed to the display layer

use arrow::array::Array;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};

/// A cell value ready for display.
///
/// Null is an explicit marker, never conflated with an empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayValue {
    Null,
    Value(String),
}

impl DisplayValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DisplayValue::Null)
    }
}

impl std::fmt::Display for DisplayValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisplayValue::Null => f.write_str("<null>"),
            DisplayValue::Value(s) => f.write_str(s),
        }
    }
}

/// A view over at most one page of a dataset.
///
/// Holds zero-copy slices of the dataset's record batches covering the
/// half-open range `[offset, offset + row_count)`, plus the dataset's
/// total height at load time for "rows X-Y of Z" display.
pub struct Window {
    offset: usize,
    rows: usize,
    total_height: usize,
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl Window {
    pub(crate) fn new(
        offset: usize,
        rows: usize,
        total_height: usize,
        schema: SchemaRef,
        batches: Vec<RecordBatch>,
    ) -> Self {
        debug_assert!(offset + rows <= total_height);
        Self {
            offset,
            rows,
            total_height,
            schema,
            batches,
        }
    }

    /// Absolute row offset of the first row in this window
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of rows in this window
    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Dataset height at the time this window was sliced
    pub fn total_height(&self) -> usize {
        self.total_height
    }

    /// Column count
    pub fn width(&self) -> usize {
        self.schema.fields().len()
    }

    /// Column names in schema order
    pub fn column_names(&self) -> Vec<&str> {
        self.schema
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect()
    }

    /// The window's record batches, for consumers that render whole tables
    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    /// Displayable value at (row, col), row-relative to this window.
    ///
    /// Returns `None` only when the coordinates fall outside the window.
    /// A non-null value arrow cannot render (e.g. a temporal value past
    /// the representable range) comes back as an `<error>` placeholder
    /// rather than being conflated with out-of-bounds.
    pub fn value(&self, row: usize, col: usize) -> Option<DisplayValue> {
        if row >= self.rows || col >= self.width() {
            return None;
        }

        let mut row = row;
        for batch in &self.batches {
            if row >= batch.num_rows() {
                row -= batch.num_rows();
                continue;
            }
            let array = batch.column(col);
            if array.is_null(row) {
                return Some(DisplayValue::Null);
            }
            let options = FormatOptions::default();
            let rendered = ArrayFormatter::try_new(array.as_ref(), &options)
                .and_then(|formatter| formatter.value(row).try_to_string());
            return Some(match rendered {
                Ok(text) => DisplayValue::Value(text),
                Err(_) => DisplayValue::Value("<error>".into()),
            });
        }
        None
    }
}

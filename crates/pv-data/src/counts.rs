//! Per-column value occurrence counts

use std::cmp::Ordering;

use ahash::AHashMap;
use arrow::array::Array;
use arrow::util::display::{ArrayFormatter, FormatOptions};

use crate::{Dataset, QueryError};

/// One row of a value-counts result. `value` is `None` for the null group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueCount {
    pub value: Option<String>,
    pub count: usize,
}

impl Dataset {
    /// Count occurrences of each distinct value in a column.
    ///
    /// Nulls are counted under the `None` key. Results are ordered by
    /// count descending, then value ascending, with the null group last
    /// among ties. Fails with [`QueryError`] on a missing column or a
    /// type arrow cannot render; the dataset itself is untouched either
    /// way.
    pub fn value_counts(&self, column: &str) -> Result<Vec<ValueCount>, QueryError> {
        let ordinal = self
            .column_ordinal(column)
            .ok_or_else(|| QueryError::NoSuchColumn(column.to_string()))?;

        let options = FormatOptions::default();
        let mut counts: AHashMap<String, usize> = AHashMap::new();
        let mut nulls = 0usize;

        for batch in self.batches() {
            let array = batch.column(ordinal);
            let formatter =
                ArrayFormatter::try_new(array.as_ref(), &options).map_err(|e| {
                    QueryError::Unsupported {
                        column: column.to_string(),
                        detail: e.to_string(),
                    }
                })?;
            for row in 0..array.len() {
                if array.is_null(row) {
                    nulls += 1;
                    continue;
                }
                let rendered = formatter.value(row).try_to_string().map_err(|e| {
                    QueryError::Unsupported {
                        column: column.to_string(),
                        detail: e.to_string(),
                    }
                })?;
                *counts.entry(rendered).or_insert(0) += 1;
            }
        }

        let mut out: Vec<ValueCount> = counts
            .into_iter()
            .map(|(value, count)| ValueCount {
                value: Some(value),
                count,
            })
            .collect();
        if nulls > 0 {
            out.push(ValueCount {
                value: None,
                count: nulls,
            });
        }

        out.sort_by(|a, b| {
            b.count.cmp(&a.count).then_with(|| match (&a.value, &b.value) {
                (Some(x), Some(y)) => x.cmp(y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
        });
        Ok(out)
    }
}

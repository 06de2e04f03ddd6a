use tracing::debug;

use crate::error::StoreError;
use crate::store::{CellRange, TabularStore, WriteMode};

/// Labels expected on the header row, starting at `anchor_column`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderSchema {
    pub labels: Vec<String>,
    pub anchor_column: u32,
    pub header_row: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderStatus {
    Unchanged,
    Installed,
}

impl HeaderSchema {
    pub fn new(labels: Vec<String>, anchor_column: u32, header_row: u32) -> Self {
        Self {
            labels,
            anchor_column,
            header_row,
        }
    }

    pub fn range(&self, sheet: &str) -> CellRange {
        CellRange::row_span(
            sheet,
            self.header_row,
            self.anchor_column,
            self.labels.len() as u32,
        )
    }

    /// True when the header row already carries these labels at the anchor.
    /// Cells beyond the row's end count as empty.
    pub fn matches(&self, row: &[String]) -> bool {
        let offset = self.anchor_column as usize - 1;
        self.labels.iter().enumerate().all(|(i, label)| {
            let cell = row.get(offset + i).map(String::as_str).unwrap_or("");
            cell == label
        })
    }
}

/// Makes the header row match `schema`, writing it in a single call when any
/// label differs. Reads once and writes at most once.
pub async fn ensure_header(
    store: &dyn TabularStore,
    sheet: &str,
    schema: &HeaderSchema,
) -> Result<HeaderStatus, StoreError> {
    let current = store.read_row(sheet, schema.header_row).await?;
    if schema.matches(&current) {
        debug!(row = schema.header_row, "header already in place");
        return Ok(HeaderStatus::Unchanged);
    }

    let range = schema.range(sheet);
    debug!(range = %range, "writing header");
    store
        .write_range(&range, vec![schema.labels.clone()], WriteMode::Raw)
        .await?;
    Ok(HeaderStatus::Installed)
}

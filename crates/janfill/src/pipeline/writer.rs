use tracing::debug;

use crate::error::StoreError;
use crate::provider::EnrichmentRecord;
use crate::store::{CellRange, TabularStore, ValueRange, WriteMode};

use super::scanner::Row;

/// Result of a flush that reached the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushSummary {
    pub rows: Vec<u32>,
    pub cells_updated: u64,
}

/// Collects resolved rows for one window and writes them in one request.
#[derive(Debug)]
pub struct BatchWriter {
    sheet: String,
    output_start_column: u32,
    mode: WriteMode,
    staged: Vec<(u32, ValueRange)>,
}

impl BatchWriter {
    pub fn new(sheet: impl Into<String>, output_start_column: u32, mode: WriteMode) -> Self {
        Self {
            sheet: sheet.into(),
            output_start_column,
            mode,
            staged: Vec::new(),
        }
    }

    /// Stages `record` for `row`, laid out in the record's field order from
    /// the output column.
    pub fn add(&mut self, row: &Row, record: &EnrichmentRecord) {
        let values = record.to_row();
        let range = CellRange::row_span(
            self.sheet.clone(),
            row.row_index,
            self.output_start_column,
            values.len() as u32,
        );
        self.staged.push((
            row.row_index,
            ValueRange {
                range,
                values: vec![values],
            },
        ));
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Staged row numbers, in the order they were added.
    pub fn staged_rows(&self) -> Vec<u32> {
        self.staged.iter().map(|(row, _)| *row).collect()
    }

    /// Writes everything staged in one `batch_write`. Nothing staged means no
    /// store call and `Ok(None)`. The staged set is cleared either way; rows
    /// from a failed write keep empty output and come back on the next run.
    pub async fn flush(
        &mut self,
        store: &dyn TabularStore,
    ) -> Result<Option<FlushSummary>, StoreError> {
        if self.staged.is_empty() {
            return Ok(None);
        }

        let (rows, updates): (Vec<u32>, Vec<ValueRange>) = self.staged.drain(..).unzip();
        debug!(rows = rows.len(), "flushing staged rows");

        let cells_updated = store.batch_write(updates, self.mode).await?;
        Ok(Some(FlushSummary {
            rows,
            cells_updated,
        }))
    }
}

//! In-process store. Mirrors how the Sheets API trims blank cells so code
//! tested against it behaves the same against a real spreadsheet.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{CellRange, Grid, TabularStore, ValueRange, WriteMode};
use crate::error::StoreError;

/// A call made against a [`MemoryStore`], recorded in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    ReadRange(CellRange),
    WriteRange(CellRange),
    BatchWrite(Vec<CellRange>),
    ReadRow { sheet: String, row: u32 },
}

#[derive(Default)]
struct Faults {
    /// Range reads that still succeed before every further one fails.
    range_reads_left: Option<usize>,
    fail_row_reads: bool,
    fail_writes: bool,
}

#[derive(Default)]
struct Inner {
    sheets: HashMap<String, Vec<Vec<String>>>,
    calls: Vec<StoreCall>,
    faults: Faults,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store whose sheet holds `rows`, the first one at row 1.
    pub fn with_rows<R, C>(sheet: &str, rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let store = Self::new();
        {
            let mut inner = store.lock();
            let grid = rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect();
            inner.sheets.insert(sheet.to_string(), grid);
        }
        store
    }

    pub fn set_cell(&self, sheet: &str, row: u32, column: u32, value: impl Into<String>) {
        let mut inner = self.lock();
        let grid = inner.sheets.entry(sheet.to_string()).or_default();
        put_cell(grid, row, column, value.into());
    }

    /// Cell value, or an empty string for cells never written.
    pub fn cell(&self, sheet: &str, row: u32, column: u32) -> String {
        let inner = self.lock();
        inner
            .sheets
            .get(sheet)
            .and_then(|grid| grid.get(row as usize - 1))
            .and_then(|cells| cells.get(column as usize - 1))
            .cloned()
            .unwrap_or_default()
    }

    pub fn row(&self, sheet: &str, row: u32) -> Vec<String> {
        let inner = self.lock();
        let mut cells = inner
            .sheets
            .get(sheet)
            .and_then(|grid| grid.get(row as usize - 1))
            .cloned()
            .unwrap_or_default();
        trim_trailing_blanks(&mut cells);
        cells
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn batch_write_count(&self) -> usize {
        self.count_calls(|c| matches!(c, StoreCall::BatchWrite(_)))
    }

    pub fn write_range_count(&self) -> usize {
        self.count_calls(|c| matches!(c, StoreCall::WriteRange(_)))
    }

    /// Ranges passed to `read_range`, in call order.
    pub fn ranges_read(&self) -> Vec<CellRange> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                StoreCall::ReadRange(range) => Some(range.clone()),
                _ => None,
            })
            .collect()
    }

    /// Lets `n` more range reads succeed, then fails every later one.
    pub fn fail_range_reads_after(&self, n: usize) {
        self.lock().faults.range_reads_left = Some(n);
    }

    pub fn fail_row_reads(&self, fail: bool) {
        self.lock().faults.fail_row_reads = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.lock().faults.fail_writes = fail;
    }

    fn count_calls(&self, pred: impl Fn(&StoreCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| pred(c)).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A panic while holding the lock cannot leave the grid half-written in
        // a way later readers care about, so poisoning is ignored.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl TabularStore for MemoryStore {
    async fn read_range(&self, range: &CellRange) -> Result<Grid, StoreError> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::ReadRange(range.clone()));

        if let Some(left) = inner.faults.range_reads_left.as_mut() {
            if *left == 0 {
                return Err(StoreError::Unavailable(format!("read of {} refused", range)));
            }
            *left -= 1;
        }
        check_range(range)?;

        let grid = inner.sheets.get(&range.sheet);
        let mut out: Grid = (range.first_row..=range.last_row)
            .map(|row| {
                let mut cells: Vec<String> = (range.first_column..=range.last_column)
                    .map(|col| {
                        grid.and_then(|g| g.get(row as usize - 1))
                            .and_then(|cells| cells.get(col as usize - 1))
                            .cloned()
                            .unwrap_or_default()
                    })
                    .collect();
                trim_trailing_blanks(&mut cells);
                cells
            })
            .collect();

        while out.last().is_some_and(|row| row.is_empty()) {
            out.pop();
        }
        Ok(out)
    }

    async fn write_range(
        &self,
        range: &CellRange,
        values: Grid,
        _mode: WriteMode,
    ) -> Result<u64, StoreError> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::WriteRange(range.clone()));

        if inner.faults.fail_writes {
            return Err(StoreError::Unavailable(format!("write to {} refused", range)));
        }
        check_values_fit(range, &values)?;

        let grid = inner.sheets.entry(range.sheet.clone()).or_default();
        Ok(apply(grid, range, values))
    }

    async fn batch_write(
        &self,
        updates: Vec<ValueRange>,
        _mode: WriteMode,
    ) -> Result<u64, StoreError> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::BatchWrite(
            updates.iter().map(|u| u.range.clone()).collect(),
        ));

        if inner.faults.fail_writes {
            return Err(StoreError::Unavailable(format!(
                "batch write of {} ranges refused",
                updates.len()
            )));
        }
        // All-or-nothing: validate every entry before touching the grid.
        for update in &updates {
            check_values_fit(&update.range, &update.values)?;
        }

        let mut total = 0;
        for update in updates {
            let grid = inner.sheets.entry(update.range.sheet.clone()).or_default();
            total += apply(grid, &update.range, update.values);
        }
        Ok(total)
    }

    async fn read_row(&self, sheet: &str, row: u32) -> Result<Vec<String>, StoreError> {
        {
            let mut inner = self.lock();
            inner.calls.push(StoreCall::ReadRow {
                sheet: sheet.to_string(),
                row,
            });
            if inner.faults.fail_row_reads {
                return Err(StoreError::Unavailable(format!("read of row {} refused", row)));
            }
        }
        if row == 0 {
            return Err(StoreError::InvalidRange("row 0".to_string()));
        }
        Ok(self.row(sheet, row))
    }
}

fn check_range(range: &CellRange) -> Result<(), StoreError> {
    if range.is_well_formed() {
        Ok(())
    } else {
        Err(StoreError::InvalidRange(format!("{:?}", range)))
    }
}

fn check_values_fit(range: &CellRange, values: &Grid) -> Result<(), StoreError> {
    check_range(range)?;
    let too_tall = values.len() > range.height() as usize;
    let too_wide = values.iter().any(|row| row.len() > range.width() as usize);
    if too_tall || too_wide {
        return Err(StoreError::InvalidRange(format!(
            "values do not fit in {}",
            range
        )));
    }
    Ok(())
}

fn apply(grid: &mut Vec<Vec<String>>, range: &CellRange, values: Grid) -> u64 {
    let mut written = 0;
    for (r, row_values) in values.into_iter().enumerate() {
        for (c, value) in row_values.into_iter().enumerate() {
            put_cell(
                grid,
                range.first_row + r as u32,
                range.first_column + c as u32,
                value,
            );
            written += 1;
        }
    }
    written
}

fn put_cell(grid: &mut Vec<Vec<String>>, row: u32, column: u32, value: String) {
    let (r, c) = (row as usize - 1, column as usize - 1);
    if grid.len() <= r {
        grid.resize_with(r + 1, Vec::new);
    }
    let cells = &mut grid[r];
    if cells.len() <= c {
        cells.resize(c + 1, String::new());
    }
    cells[c] = value;
}

fn trim_trailing_blanks(cells: &mut Vec<String>) {
    while cells.last().is_some_and(|c| c.is_empty()) {
        cells.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        MemoryStore::with_rows(
            "S",
            vec![
                vec!["JAN", "Name"],
                vec!["111", ""],
                vec!["", ""],
                vec!["333", "done"],
            ],
        )
    }

    #[tokio::test]
    async fn test_read_range_trims_like_sheets() {
        let store = store();
        let grid = store
            .read_range(&CellRange::new("S", 1, 2, 3, 6))
            .await
            .unwrap();
        assert_eq!(
            grid,
            vec![
                vec!["111".to_string()],
                vec![],
                vec!["333".to_string(), "done".to_string()],
            ]
        );
    }

    #[tokio::test]
    async fn test_read_unknown_sheet_is_empty() {
        let store = MemoryStore::new();
        let grid = store
            .read_range(&CellRange::new("Nope", 1, 1, 2, 2))
            .await
            .unwrap();
        assert!(grid.is_empty());
    }

    #[tokio::test]
    async fn test_batch_write_applies_all_ranges() {
        let store = store();
        let cells = store
            .batch_write(
                vec![
                    ValueRange {
                        range: CellRange::row_span("S", 2, 2, 2),
                        values: vec![vec!["a".into(), "b".into()]],
                    },
                    ValueRange {
                        range: CellRange::row_span("S", 5, 2, 2),
                        values: vec![vec!["c".into(), "d".into()]],
                    },
                ],
                WriteMode::UserEntered,
            )
            .await
            .unwrap();

        assert_eq!(cells, 4);
        assert_eq!(store.row("S", 2), vec!["111", "a", "b"]);
        assert_eq!(store.row("S", 5), vec!["", "c", "d"]);
        assert_eq!(store.batch_write_count(), 1);
    }

    #[tokio::test]
    async fn test_batch_write_rejects_oversized_values_without_partial_apply() {
        let store = store();
        let result = store
            .batch_write(
                vec![
                    ValueRange {
                        range: CellRange::row_span("S", 2, 2, 1),
                        values: vec![vec!["ok".into()]],
                    },
                    ValueRange {
                        range: CellRange::row_span("S", 3, 2, 1),
                        values: vec![vec!["x".into(), "too wide".into()]],
                    },
                ],
                WriteMode::Raw,
            )
            .await;

        assert!(matches!(result, Err(StoreError::InvalidRange(_))));
        assert_eq!(store.cell("S", 2, 2), "");
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let store = store();
        store.fail_range_reads_after(1);
        let range = CellRange::new("S", 1, 1, 1, 1);
        assert!(store.read_range(&range).await.is_ok());
        assert!(store.read_range(&range).await.is_err());

        store.fail_writes(true);
        assert!(store
            .write_range(&range, vec![vec!["x".into()]], WriteMode::Raw)
            .await
            .is_err());
        assert_eq!(store.cell("S", 1, 1), "JAN");

        store.fail_row_reads(true);
        assert!(store.read_row("S", 1).await.is_err());
        assert_eq!(store.calls().len(), 4);
    }
}

use crate::error::StoreError;
use crate::store::{CellRange, TabularStore};

/// A row whose key still needs enriching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// 1-based sheet row.
    pub row_index: u32,
    pub key: String,
}

/// A contiguous block of rows scanned and written together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchWindow {
    pub start_row: u32,
    pub size: u32,
}

impl BatchWindow {
    pub fn new(start_row: u32, size: u32) -> Self {
        Self { start_row, size }
    }

    pub fn end_row(&self) -> u32 {
        self.start_row.saturating_add(self.size.saturating_sub(1))
    }

    pub fn next(&self) -> Self {
        Self::new(self.start_row.saturating_add(self.size), self.size)
    }
}

/// Reads windows of rows and picks out the candidates.
#[derive(Debug, Clone)]
pub struct RowScanner {
    sheet: String,
    key_column: u32,
    output_column: u32,
}

impl RowScanner {
    pub fn new(sheet: impl Into<String>, key_column: u32, output_column: u32) -> Self {
        Self {
            sheet: sheet.into(),
            key_column,
            output_column,
        }
    }

    /// The block covering both the key and the output anchor for `window`.
    pub fn range_for(&self, window: &BatchWindow) -> CellRange {
        CellRange::new(
            self.sheet.clone(),
            self.key_column.min(self.output_column),
            window.start_row,
            self.key_column.max(self.output_column),
            window.end_row(),
        )
    }

    /// Rows in `window` with a non-empty key and an empty output cell,
    /// ascending. Rows that already carry output are skipped, which is what
    /// makes a rerun from the same start row safe.
    pub async fn fetch_candidates(
        &self,
        store: &dyn TabularStore,
        window: &BatchWindow,
    ) -> Result<Vec<Row>, StoreError> {
        let range = self.range_for(window);
        let grid = store.read_range(&range).await?;

        let key_offset = (self.key_column - range.first_column) as usize;
        let output_offset = (self.output_column - range.first_column) as usize;

        let rows = grid
            .iter()
            .take(window.size as usize)
            .enumerate()
            .filter_map(|(i, cells)| {
                let key = cells.get(key_offset).map(|s| s.trim()).unwrap_or("");
                let output = cells.get(output_offset).map(|s| s.trim()).unwrap_or("");
                if key.is_empty() || !output.is_empty() {
                    return None;
                }
                Some(Row {
                    row_index: window.start_row + i as u32,
                    key: key.to_string(),
                })
            })
            .collect();

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn sheet() -> MemoryStore {
        MemoryStore::with_rows(
            "Sheet1",
            vec![
                vec!["JAN", "名称"],
                vec!["111", "done"],
                vec!["222", ""],
                vec!["", ""],
                vec!["  333  "],
                vec!["444", "   "],
            ],
        )
    }

    #[test]
    fn test_window_arithmetic() {
        let window = BatchWindow::new(2, 50);
        assert_eq!(window.end_row(), 51);
        assert_eq!(window.next(), BatchWindow::new(52, 50));
    }

    #[tokio::test]
    async fn test_filters_done_and_blank_rows() {
        let store = sheet();
        let scanner = RowScanner::new("Sheet1", 1, 2);
        let rows = scanner
            .fetch_candidates(&store, &BatchWindow::new(2, 5))
            .await
            .unwrap();

        assert_eq!(
            rows,
            vec![
                Row { row_index: 3, key: "222".to_string() },
                Row { row_index: 5, key: "333".to_string() },
                Row { row_index: 6, key: "444".to_string() },
            ]
        );
    }

    #[tokio::test]
    async fn test_reads_one_rectangle_per_window() {
        let store = sheet();
        let scanner = RowScanner::new("Sheet1", 1, 2);
        scanner
            .fetch_candidates(&store, &BatchWindow::new(2, 5))
            .await
            .unwrap();

        let ranges = store.ranges_read();
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].to_string(), "'Sheet1'!A2:B6");
    }

    #[tokio::test]
    async fn test_output_left_of_key() {
        let store = MemoryStore::with_rows(
            "Sheet1",
            vec![vec!["", "", "", "k1"], vec!["x", "", "", "k2"]],
        );
        let scanner = RowScanner::new("Sheet1", 4, 1);
        let rows = scanner
            .fetch_candidates(&store, &BatchWindow::new(1, 2))
            .await
            .unwrap();

        assert_eq!(rows, vec![Row { row_index: 1, key: "k1".to_string() }]);
    }

    #[tokio::test]
    async fn test_window_past_data_is_empty() {
        let store = sheet();
        let scanner = RowScanner::new("Sheet1", 1, 2);
        let rows = scanner
            .fetch_candidates(&store, &BatchWindow::new(100, 10))
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_read_failure_propagates() {
        let store = sheet();
        store.fail_range_reads_after(0);
        let scanner = RowScanner::new("Sheet1", 1, 2);

        assert!(scanner
            .fetch_candidates(&store, &BatchWindow::new(2, 5))
            .await
            .is_err());
    }
}

//! Tabular store: read and write rectangular regions of a sheet.

pub mod memory;
pub mod sheets;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::column::index_to_letter;
use crate::error::StoreError;

pub use memory::{MemoryStore, StoreCall};
pub use sheets::SheetsStore;

/// Row-major cell values. Rows may be shorter than the requested width when
/// trailing cells are blank, and trailing blank rows may be missing entirely.
pub type Grid = Vec<Vec<String>>;

/// A rectangular block of cells on one sheet. Columns and rows are 1-based
/// and inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub sheet: String,
    pub first_column: u32,
    pub first_row: u32,
    pub last_column: u32,
    pub last_row: u32,
}

impl CellRange {
    pub fn new(
        sheet: impl Into<String>,
        first_column: u32,
        first_row: u32,
        last_column: u32,
        last_row: u32,
    ) -> Self {
        Self {
            sheet: sheet.into(),
            first_column,
            first_row,
            last_column,
            last_row,
        }
    }

    /// A single row starting at `first_column`, `width` cells wide.
    pub fn row_span(sheet: impl Into<String>, row: u32, first_column: u32, width: u32) -> Self {
        Self::new(
            sheet,
            first_column,
            row,
            first_column + width.saturating_sub(1),
            row,
        )
    }

    pub fn width(&self) -> u32 {
        self.last_column.saturating_sub(self.first_column) + 1
    }

    pub fn height(&self) -> u32 {
        self.last_row.saturating_sub(self.first_row) + 1
    }

    pub fn is_well_formed(&self) -> bool {
        self.first_column >= 1
            && self.first_row >= 1
            && self.first_column <= self.last_column
            && self.first_row <= self.last_row
    }
}

/// Renders as A1 notation with a quoted sheet name, e.g. `'Sheet 1'!B2:I5`.
impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!", quote_sheet(&self.sheet))?;
        write!(
            f,
            "{}{}",
            index_to_letter(self.first_column),
            self.first_row
        )?;
        if self.first_column != self.last_column || self.first_row != self.last_row {
            write!(f, ":{}{}", index_to_letter(self.last_column), self.last_row)?;
        }
        Ok(())
    }
}

pub(crate) fn quote_sheet(sheet: &str) -> String {
    format!("'{}'", sheet.replace('\'', "''"))
}

/// One entry of a batched write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueRange {
    pub range: CellRange,
    pub values: Grid,
}

/// How the store interprets written strings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Stored verbatim.
    Raw,
    /// Parsed as if typed into the UI, so numbers and URLs keep their type.
    #[default]
    UserEntered,
}

impl WriteMode {
    pub fn as_value_input_option(&self) -> &'static str {
        match self {
            WriteMode::Raw => "RAW",
            WriteMode::UserEntered => "USER_ENTERED",
        }
    }
}

#[async_trait]
pub trait TabularStore: Send + Sync {
    async fn read_range(&self, range: &CellRange) -> Result<Grid, StoreError>;

    /// Overwrites `range` with `values`. Returns the number of cells updated.
    async fn write_range(
        &self,
        range: &CellRange,
        values: Grid,
        mode: WriteMode,
    ) -> Result<u64, StoreError>;

    /// Writes every entry in a single request. Returns the number of cells updated.
    async fn batch_write(&self, updates: Vec<ValueRange>, mode: WriteMode)
        -> Result<u64, StoreError>;

    /// Reads a whole row, without trailing blank cells.
    async fn read_row(&self, sheet: &str, row: u32) -> Result<Vec<String>, StoreError>;
}

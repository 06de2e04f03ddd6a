use std::time::Duration;

use crate::column::letter_to_index;
use crate::config::Config;
use crate::error::ConfigError;
use crate::provider::RecordFamily;
use crate::store::WriteMode;

use super::header::HeaderSchema;

/// Upper bound on rows per window.
pub const MAX_BATCH_SIZE: u32 = 100;

/// Consecutive empty windows tolerated before the run concludes.
pub const DEFAULT_EMPTY_WINDOW_THRESHOLD: u32 = 3;

/// Settings for one run. Fixed once the run starts.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub sheet: String,
    /// 1-based column holding the product codes.
    pub key_column: u32,
    /// 1-based column where the record's first field is written.
    pub output_start_column: u32,
    pub header_row: u32,
    pub start_row: u32,
    pub batch_size: u32,
    pub inter_call_delay: Duration,
    pub inter_window_delay: Duration,
    pub empty_window_threshold: u32,
    pub family: RecordFamily,
    pub header_labels: Option<Vec<String>>,
    pub write_mode: WriteMode,
}

impl PipelineConfig {
    /// Defaults: keys in A, output from B, header on row 1, data from row 2.
    pub fn new(sheet: impl Into<String>, family: RecordFamily) -> Self {
        Self {
            sheet: sheet.into(),
            key_column: 1,
            output_start_column: 2,
            header_row: 1,
            start_row: 2,
            batch_size: 50,
            inter_call_delay: Duration::from_secs(1),
            inter_window_delay: Duration::from_secs(3),
            empty_window_threshold: DEFAULT_EMPTY_WINDOW_THRESHOLD,
            family,
            header_labels: None,
            write_mode: WriteMode::default(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let key_column =
            letter_to_index(&config.columns.key).map_err(|source| ConfigError::InvalidColumn {
                field: "columns.key",
                source,
            })?;
        let output_start_column = letter_to_index(&config.columns.output_start).map_err(
            |source| ConfigError::InvalidColumn {
                field: "columns.output_start",
                source,
            },
        )?;

        Ok(Self {
            sheet: config.sheet.sheet_name.clone(),
            key_column,
            output_start_column,
            header_row: config.columns.header_row,
            start_row: config.batch.start_row,
            batch_size: config.batch.size,
            inter_call_delay: Duration::from_millis(config.batch.call_delay_ms),
            inter_window_delay: Duration::from_millis(config.batch.window_delay_ms),
            empty_window_threshold: config.batch.empty_window_threshold,
            family: config.family,
            header_labels: config.header_labels.clone(),
            write_mode: config.sheet.write_mode,
        })
    }

    /// Number of cells each enriched row occupies.
    pub fn output_width(&self) -> u32 {
        self.family.width() as u32
    }

    /// Last column written for an enriched row.
    pub fn output_end_column(&self) -> u32 {
        self.output_start_column + self.output_width() - 1
    }

    pub fn header_schema(&self) -> HeaderSchema {
        let labels = match &self.header_labels {
            Some(labels) => labels.clone(),
            None => self
                .family
                .default_headers()
                .iter()
                .map(|label| label.to_string())
                .collect(),
        };
        HeaderSchema::new(labels, self.output_start_column, self.header_row)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sheet.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: "Sheet name must not be empty".to_string(),
            });
        }

        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::BatchSize {
                size: self.batch_size,
                max: MAX_BATCH_SIZE,
            });
        }

        if self.empty_window_threshold == 0 {
            return Err(ConfigError::Validation {
                message: "Empty window threshold must be at least 1".to_string(),
            });
        }

        if self.key_column == 0 || self.output_start_column == 0 {
            return Err(ConfigError::Validation {
                message: "Columns are 1-based".to_string(),
            });
        }

        if self.header_row == 0 || self.start_row <= self.header_row {
            return Err(ConfigError::Validation {
                message: format!(
                    "Start row {} must come after header row {}",
                    self.start_row, self.header_row
                ),
            });
        }

        if self
            .output_start_column
            .checked_add(self.output_width() - 1)
            .is_none()
        {
            return Err(ConfigError::Validation {
                message: "Output columns run past the last addressable column".to_string(),
            });
        }

        if (self.output_start_column..=self.output_end_column()).contains(&self.key_column) {
            return Err(ConfigError::Validation {
                message: format!(
                    "Key column {} lies inside the output columns {}..={}",
                    self.key_column,
                    self.output_start_column,
                    self.output_end_column()
                ),
            });
        }

        if let Some(labels) = &self.header_labels {
            if labels.len() != self.family.width() {
                return Err(ConfigError::Validation {
                    message: format!(
                        "Expected {} header labels for the {} layout, got {}",
                        self.family.width(),
                        self.family,
                        labels.len()
                    ),
                });
            }
        }

        Ok(())
    }
}

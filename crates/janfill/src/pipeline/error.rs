use thiserror::Error;

use crate::error::StoreError;

/// Errors that end a run. Everything else is absorbed per key or per window.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Header provisioning failed: {0}")]
    Provisioning(#[source] StoreError),

    #[error("Failed to read rows starting at {start_row}: {source}")]
    StoreRead {
        start_row: u32,
        #[source]
        source: StoreError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineWarning {
    /// The window's rows stay empty and will be picked up again next run.
    BatchWriteFailed {
        start_row: u32,
        rows: Vec<u32>,
        error: String,
    },
}

impl std::fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineWarning::BatchWriteFailed {
                start_row,
                rows,
                error,
            } => write!(
                f,
                "write of {} rows in window starting at {} failed: {}",
                rows.len(),
                start_row,
                error
            ),
        }
    }
}

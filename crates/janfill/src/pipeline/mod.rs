//! Batch enrichment: provision the header, walk the key column window by
//! window, resolve candidates through the provider chain and write each
//! window back in one request.

pub mod chain;
pub mod config;
pub mod error;
pub mod header;
pub mod progress;
pub mod runner;
pub mod scanner;
pub mod writer;

pub use chain::{ProviderChain, Resolution};
pub use config::{PipelineConfig, DEFAULT_EMPTY_WINDOW_THRESHOLD, MAX_BATCH_SIZE};
pub use error::{PipelineError, PipelineWarning};
pub use header::{ensure_header, HeaderSchema, HeaderStatus};
pub use progress::{
    BroadcastProgress, LogProgress, MissReason, NoopProgress, ProgressEvent, ProgressMessage,
    ProgressReporter, RecordingProgress,
};
pub use runner::{Pipeline, RunOutcome, RunResult};
pub use scanner::{BatchWindow, Row, RowScanner};
pub use writer::{BatchWriter, FlushSummary};

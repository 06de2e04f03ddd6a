pub mod column;
pub mod config;
pub mod error;
mod http;
pub mod pipeline;
pub mod provider;
pub mod secrets;
pub mod store;

pub use column::{index_to_letter, letter_to_index};
pub use config::{load_config, Config};
pub use error::{ConfigError, InvalidColumnLabel, JanfillError, ProviderError, Result, StoreError};
pub use pipeline::{
    LogProgress, Pipeline, PipelineConfig, PipelineError, ProgressEvent, ProgressReporter,
    RunOutcome, RunResult,
};
pub use provider::{EnrichmentRecord, Lookup, LookupProvider, RecordFamily, RegisteredProvider};
pub use secrets::{resolve_secret, SecretError, SecretSource};
pub use store::{CellRange, MemoryStore, SheetsStore, TabularStore, WriteMode};

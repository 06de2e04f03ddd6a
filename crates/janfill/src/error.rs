use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JanfillError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] crate::pipeline::PipelineError),

    #[error("Secret error: {0}")]
    Secret(#[from] crate::secrets::SecretError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Invalid column '{field}': {source}")]
    InvalidColumn {
        field: &'static str,
        #[source]
        source: InvalidColumnLabel,
    },

    #[error("Batch size {size} is outside 1..={max}")]
    BatchSize { size: u32, max: u32 },

    #[error("Invalid provider chain: {reason}")]
    InvalidChain { reason: String },

    #[error("Failed to resolve secret for '{field}': {source}")]
    Secret {
        field: &'static str,
        #[source]
        source: crate::secrets::SecretError,
    },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// A column label that is empty, contains characters outside `A-Z`, or
/// addresses a column beyond `u32::MAX`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid column label '{label}'")]
pub struct InvalidColumnLabel {
    pub label: String,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Store returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Failed to decode store response: {0}")]
    Decode(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Lookup request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Failed to decode provider response: {0}")]
    Decode(String),

    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, JanfillError>;

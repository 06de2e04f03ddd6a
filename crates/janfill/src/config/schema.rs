use serde::{Deserialize, Serialize};

use crate::provider::RecordFamily;
use crate::secrets::SecretSource;
use crate::store::WriteMode;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    pub sheet: SheetConfig,
    #[serde(default)]
    pub columns: ColumnsConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default = "default_family")]
    pub family: RecordFamily,
    /// Replaces the family's built-in header labels. Must have the same length.
    #[serde(default)]
    pub header_labels: Option<Vec<String>>,
    pub providers: Vec<ProviderConfig>,
    #[serde(default)]
    pub rakuten: Option<RakutenConfig>,
}

fn default_family() -> RecordFamily {
    RecordFamily::Catalog
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetConfig {
    pub spreadsheet_id: String,
    pub sheet_name: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_sheet_token")]
    pub access_token: SecretSource,
    #[serde(default = "default_sheet_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub write_mode: WriteMode,
}

fn default_sheet_token() -> SecretSource {
    SecretSource::from_env("GOOGLE_SHEETS_ACCESS_TOKEN")
}

fn default_sheet_timeout() -> u64 {
    120
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnsConfig {
    #[serde(default = "default_key_column")]
    pub key: String,
    #[serde(default = "default_output_start")]
    pub output_start: String,
    #[serde(default = "default_header_row")]
    pub header_row: u32,
}

fn default_key_column() -> String {
    "A".to_string()
}

fn default_output_start() -> String {
    "B".to_string()
}

fn default_header_row() -> u32 {
    1
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            key: default_key_column(),
            output_start: default_output_start(),
            header_row: default_header_row(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_start_row")]
    pub start_row: u32,
    #[serde(default = "default_batch_size")]
    pub size: u32,
    /// Pause after every provider call.
    #[serde(default = "default_call_delay_ms")]
    pub call_delay_ms: u64,
    /// Pause after every window that had candidates.
    #[serde(default = "default_window_delay_ms")]
    pub window_delay_ms: u64,
    #[serde(default = "default_empty_window_threshold")]
    pub empty_window_threshold: u32,
}

fn default_start_row() -> u32 {
    2
}

fn default_batch_size() -> u32 {
    50
}

fn default_call_delay_ms() -> u64 {
    1000
}

fn default_window_delay_ms() -> u64 {
    3000
}

fn default_empty_window_threshold() -> u32 {
    3
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            start_row: default_start_row(),
            size: default_batch_size(),
            call_delay_ms: default_call_delay_ms(),
            window_delay_ms: default_window_delay_ms(),
            empty_window_threshold: default_empty_window_threshold(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    RakutenBooks,
    RakutenIchiba,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    /// Position in the chain; lower ordinals are tried first.
    pub ordinal: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RakutenConfig {
    #[serde(default = "default_rakuten_app_id")]
    pub application_id: SecretSource,
    #[serde(default)]
    pub affiliate_id: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_rakuten_timeout")]
    pub timeout_secs: u64,
}

fn default_rakuten_app_id() -> SecretSource {
    SecretSource::from_env("RAKUTEN_APP_ID")
}

fn default_rakuten_timeout() -> u64 {
    30
}

impl Default for RakutenConfig {
    fn default() -> Self {
        Self {
            application_id: default_rakuten_app_id(),
            affiliate_id: None,
            base_url: None,
            timeout_secs: default_rakuten_timeout(),
        }
    }
}

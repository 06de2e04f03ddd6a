//! Google Sheets v4 `values` API backend.
//!
//! Authentication is out of scope here: the store is handed an OAuth access
//! token and sends it as a bearer token.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Client, Response, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{quote_sheet, CellRange, Grid, TabularStore, ValueRange, WriteMode};
use crate::config::SheetConfig;
use crate::error::{ConfigError, StoreError};
use crate::http::truncate_body;

pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct SheetsStore {
    client: Client,
    base_url: String,
    spreadsheet_id: String,
    access_token: SecretString,
}

#[derive(Debug, Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRangeBody<'a> {
    range: String,
    major_dimension: &'static str,
    values: &'a Grid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateBody<'a> {
    value_input_option: &'static str,
    data: Vec<ValueRangeBody<'a>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateResponse {
    #[serde(default)]
    updated_cells: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateResponse {
    #[serde(default)]
    total_updated_cells: u64,
}

impl SheetsStore {
    /// `timeout` bounds every request made by this store.
    pub fn new(
        spreadsheet_id: impl Into<String>,
        access_token: SecretString,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        Self::with_base_url(DEFAULT_BASE_URL, spreadsheet_id, access_token, timeout)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        spreadsheet_id: impl Into<String>,
        access_token: SecretString,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(timeout))
            .timeout(timeout)
            .build()
            .map_err(StoreError::Transport)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            access_token,
        })
    }

    /// Resolves the access token and builds the client described by `config`.
    pub fn from_config(config: &SheetConfig) -> Result<Self, ConfigError> {
        let token = config
            .access_token
            .resolve()
            .map_err(|source| ConfigError::Secret {
                field: "sheet.access_token",
                source,
            })?;
        let base_url = config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        Self::with_base_url(
            base_url,
            config.spreadsheet_id.clone(),
            token,
            Duration::from_secs(config.timeout_secs),
        )
        .map_err(|e| ConfigError::HttpClient(e.to_string()))
    }

    /// `{base}/{spreadsheet_id}/{segments...}` with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| StoreError::InvalidRange(format!("bad base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidRange("base URL cannot take a path".to_string()))?
            .push(&self.spreadsheet_id)
            .extend(segments);
        Ok(url)
    }

    async fn get_values(&self, a1: &str) -> Result<Grid, StoreError> {
        let url = self.endpoint(&["values", a1])?;
        debug!("GET values {}", a1);

        let response = self
            .client
            .get(url)
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await
            .map_err(StoreError::Transport)?;

        let body: ValuesResponse = decode(response).await?;
        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }
}

#[async_trait]
impl TabularStore for SheetsStore {
    async fn read_range(&self, range: &CellRange) -> Result<Grid, StoreError> {
        if !range.is_well_formed() {
            return Err(StoreError::InvalidRange(format!("{:?}", range)));
        }
        self.get_values(&range.to_string()).await
    }

    async fn write_range(
        &self,
        range: &CellRange,
        values: Grid,
        mode: WriteMode,
    ) -> Result<u64, StoreError> {
        let a1 = range.to_string();
        let mut url = self.endpoint(&["values", &a1])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", mode.as_value_input_option());
        debug!("PUT values {}", a1);

        let body = ValueRangeBody {
            range: a1.clone(),
            major_dimension: "ROWS",
            values: &values,
        };
        let response = self
            .client
            .put(url)
            .bearer_auth(self.access_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(StoreError::Transport)?;

        let result: UpdateResponse = decode(response).await?;
        Ok(result.updated_cells)
    }

    async fn batch_write(
        &self,
        updates: Vec<ValueRange>,
        mode: WriteMode,
    ) -> Result<u64, StoreError> {
        let url = self.endpoint(&["values:batchUpdate"])?;
        let body = BatchUpdateBody {
            value_input_option: mode.as_value_input_option(),
            data: updates
                .iter()
                .map(|u| ValueRangeBody {
                    range: u.range.to_string(),
                    major_dimension: "ROWS",
                    values: &u.values,
                })
                .collect(),
        };
        debug!("POST values:batchUpdate with {} ranges", body.data.len());

        let response = self
            .client
            .post(url)
            .bearer_auth(self.access_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(StoreError::Transport)?;

        let result: BatchUpdateResponse = decode(response).await?;
        info!("Batch update wrote {} cells", result.total_updated_cells);
        Ok(result.total_updated_cells)
    }

    async fn read_row(&self, sheet: &str, row: u32) -> Result<Vec<String>, StoreError> {
        if row == 0 {
            return Err(StoreError::InvalidRange("row 0".to_string()));
        }
        let a1 = format!("{}!{}:{}", quote_sheet(sheet), row, row);
        let grid = self.get_values(&a1).await?;
        Ok(grid.into_iter().next().unwrap_or_default())
    }
}

async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, StoreError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(StoreError::Http {
            status: status.as_u16(),
            body: truncate_body(&body),
        });
    }
    response
        .json()
        .await
        .map_err(|e| StoreError::Decode(e.to_string()))
}

/// Formatted values come back as strings; other renderings may use numbers
/// or booleans, which are written out as their JSON text.
fn cell_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

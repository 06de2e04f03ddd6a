//! Builders for test data: config JSON, records and scripted providers.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use janfill::provider::{
    CatalogRecord, EnrichmentRecord, ItemKind, Lookup, LookupProvider, MarketRecord, RecordFamily,
};
use janfill::ProviderError;

/// Every lookup made through scripted providers sharing one log, as
/// `(provider id, key)` in call order.
pub type CallLog = Arc<Mutex<Vec<(String, String)>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// What a scripted provider answers for a key.
#[derive(Clone)]
pub enum Reply {
    Found(EnrichmentRecord),
    NotFound,
    Error,
}

/// A provider that answers from a fixed script and records its calls.
pub struct ScriptedProvider {
    id: String,
    family: RecordFamily,
    verifies_identity: bool,
    replies: HashMap<String, Reply>,
    fallback: Reply,
    log: CallLog,
}

impl ScriptedProvider {
    /// Answers `NotFound` for every key until told otherwise.
    pub fn new(id: &str, family: RecordFamily, log: &CallLog) -> Self {
        Self {
            id: id.to_string(),
            family,
            verifies_identity: false,
            replies: HashMap::new(),
            fallback: Reply::NotFound,
            log: Arc::clone(log),
        }
    }

    pub fn reply(mut self, key: &str, reply: Reply) -> Self {
        self.replies.insert(key.to_string(), reply);
        self
    }

    /// Answer for keys without a specific reply.
    pub fn otherwise(mut self, reply: Reply) -> Self {
        self.fallback = reply;
        self
    }

    pub fn verifying_identity(mut self) -> Self {
        self.verifies_identity = true;
        self
    }
}

#[async_trait]
impl LookupProvider for ScriptedProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn family(&self) -> RecordFamily {
        self.family
    }

    fn verifies_identity(&self) -> bool {
        self.verifies_identity
    }

    async fn lookup(&self, key: &str) -> Result<Lookup, ProviderError> {
        self.log
            .lock()
            .unwrap()
            .push((self.id.clone(), key.to_string()));

        match self.replies.get(key).unwrap_or(&self.fallback) {
            Reply::Found(record) => Ok(Lookup::Found(record.clone())),
            Reply::NotFound => Ok(Lookup::NotFound),
            Reply::Error => Err(ProviderError::Unavailable(format!(
                "{} is down",
                self.id
            ))),
        }
    }
}

pub fn market_record(name: &str) -> EnrichmentRecord {
    EnrichmentRecord::market(MarketRecord {
        name: name.to_string(),
        price: "1200".to_string(),
        url: format!("https://item.example.com/{}", name.to_lowercase()),
        shop: "Example Shop".to_string(),
        caption: String::new(),
        rating: "4.2".to_string(),
        image_urls: vec!["https://img.example.com/1.jpg".to_string()],
    })
}

pub fn book_record(name: &str, isbn: &str) -> EnrichmentRecord {
    EnrichmentRecord::catalog(CatalogRecord {
        kind: ItemKind::Book,
        name: name.to_string(),
        price: "1980".to_string(),
        url: "https://books.example.com/item".to_string(),
        detail: "Author Name".to_string(),
        caption: String::new(),
        rating: "3.9".to_string(),
        image_urls: vec![],
    })
    .with_identity(isbn)
}

/// Builder for config JSON documents.
pub struct ConfigBuilder {
    value: serde_json::Value,
}

impl ConfigBuilder {
    /// A valid config using direct secret values.
    pub fn new() -> Self {
        Self {
            value: json!({
                "version": "1.0",
                "sheet": {
                    "spreadsheet_id": "test-sheet",
                    "sheet_name": "Sheet1",
                    "access_token": { "value": "token" }
                },
                "providers": [
                    { "kind": "rakuten_books", "ordinal": 1 },
                    { "kind": "rakuten_ichiba", "ordinal": 2 }
                ],
                "rakuten": {
                    "application_id": { "value": "app-id" }
                }
            }),
        }
    }

    pub fn version(mut self, version: &str) -> Self {
        self.value["version"] = json!(version);
        self
    }

    pub fn family(mut self, family: &str) -> Self {
        self.value["family"] = json!(family);
        self
    }

    pub fn columns(mut self, key: &str, output_start: &str) -> Self {
        self.value["columns"] = json!({ "key": key, "output_start": output_start });
        self
    }

    pub fn batch(mut self, start_row: u32, size: u32) -> Self {
        self.value["batch"] = json!({ "start_row": start_row, "size": size });
        self
    }

    pub fn providers(mut self, providers: &[(&str, u32)]) -> Self {
        self.value["providers"] = providers
            .iter()
            .map(|(kind, ordinal)| json!({ "kind": kind, "ordinal": ordinal }))
            .collect();
        self
    }

    pub fn rakuten_app_id_env(mut self, name: &str) -> Self {
        self.value["rakuten"]["application_id"] = json!({ "env": name });
        self
    }

    pub fn sheet_token_file(mut self, path: &str) -> Self {
        self.value["sheet"]["access_token"] = json!({ "file": path });
        self
    }

    /// Sets a top-level field.
    pub fn field(mut self, name: &str, value: serde_json::Value) -> Self {
        self.value[name] = value;
        self
    }

    pub fn build(self) -> String {
        serde_json::to_string_pretty(&self.value).unwrap()
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

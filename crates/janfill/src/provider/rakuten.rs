//! Rakuten Web Service lookups: Books (exact ISBN/JAN) and Ichiba (keyword).

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::record::{
    normalize_images, strip_thumbnail_suffix, CatalogRecord, EnrichmentRecord, ImageRef, ItemKind,
    MarketRecord, RecordFamily,
};
use super::{Lookup, LookupProvider};
use crate::error::ProviderError;
use crate::http::truncate_body;

pub const DEFAULT_BASE_URL: &str = "https://app.rakuten.co.jp/services/api";

const BOOKS_SEARCH_PATH: &str = "BooksBook/Search/20170404";
const ICHIBA_SEARCH_PATH: &str = "IchibaItem/Search/20220601";

/// HTTP client and credentials shared by the Rakuten providers.
#[derive(Clone)]
pub struct RakutenClient {
    client: Client,
    base_url: String,
    application_id: SecretString,
    affiliate_id: Option<String>,
}

impl RakutenClient {
    /// `timeout` bounds each request; there is no process-wide default.
    pub fn new(
        application_id: SecretString,
        affiliate_id: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        Self::with_base_url(DEFAULT_BASE_URL, application_id, affiliate_id, timeout)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        application_id: SecretString,
        affiliate_id: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ProviderError::Transport)?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            application_id,
            affiliate_id: affiliate_id.filter(|id| !id.is_empty()),
        })
    }

    /// Runs a one-hit search. `None` means the service reported no match.
    async fn search<T: DeserializeOwned>(
        &self,
        path: &str,
        query: (&str, &str),
    ) -> Result<Option<T>, ProviderError> {
        let url = format!("{}/{}", self.base_url, path);
        let mut params: Vec<(&str, &str)> = vec![
            ("applicationId", self.application_id.expose_secret()),
            ("formatVersion", "2"),
            ("hits", "1"),
            query,
        ];
        if let Some(affiliate) = &self.affiliate_id {
            params.push(("affiliateId", affiliate.as_str()));
        }

        debug!("GET {} {}={}", path, query.0, query.1);
        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(ProviderError::Transport)?;

        let status = response.status();
        // The API answers an unmatched search with 404 rather than an empty list.
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let body: SearchResponse<T> = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        Ok(body.first())
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse<T> {
    #[serde(default)]
    count: u64,
    #[serde(rename = "Items", default = "Vec::new")]
    items: Vec<T>,
}

impl<T> SearchResponse<T> {
    fn first(self) -> Option<T> {
        if self.count == 0 {
            return None;
        }
        self.items.into_iter().next()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct BooksItem {
    title: Option<String>,
    author: Option<String>,
    isbn: Option<String>,
    item_price: Option<serde_json::Value>,
    item_url: Option<String>,
    item_caption: Option<String>,
    review_average: Option<serde_json::Value>,
    large_image_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct IchibaItem {
    item_name: Option<String>,
    item_price: Option<serde_json::Value>,
    item_url: Option<String>,
    shop_name: Option<String>,
    item_caption: Option<String>,
    review_average: Option<serde_json::Value>,
    medium_image_urls: Vec<ImageRef>,
}

/// Prices and ratings arrive as numbers or strings depending on the API.
fn scalar_text(value: Option<serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn books_record(item: BooksItem) -> EnrichmentRecord {
    let image_urls = item
        .large_image_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(strip_thumbnail_suffix)
        .into_iter()
        .collect();

    let record = EnrichmentRecord::catalog(CatalogRecord {
        kind: ItemKind::Book,
        name: item.title.unwrap_or_default(),
        price: scalar_text(item.item_price),
        url: item.item_url.unwrap_or_default(),
        detail: item.author.unwrap_or_default(),
        caption: item.item_caption.unwrap_or_default(),
        rating: scalar_text(item.review_average),
        image_urls,
    });

    match item.isbn {
        Some(isbn) if !isbn.is_empty() => record.with_identity(isbn),
        _ => record,
    }
}

fn ichiba_record(item: IchibaItem, family: RecordFamily) -> EnrichmentRecord {
    let image_urls = normalize_images(&item.medium_image_urls);
    let name = item.item_name.unwrap_or_default();
    let price = scalar_text(item.item_price);
    let url = item.item_url.unwrap_or_default();
    let shop = item.shop_name.unwrap_or_default();
    let caption = item.item_caption.unwrap_or_default();
    let rating = scalar_text(item.review_average);

    match family {
        RecordFamily::Catalog => EnrichmentRecord::catalog(CatalogRecord {
            kind: ItemKind::Merchandise,
            name,
            price,
            url,
            detail: shop,
            caption,
            rating,
            image_urls,
        }),
        RecordFamily::Market => EnrichmentRecord::market(MarketRecord {
            name,
            price,
            url,
            shop,
            caption,
            rating,
            image_urls,
        }),
    }
}

/// Exact ISBN/JAN search against the Books catalogue. Returned records carry
/// the ISBN the service matched so loose matches can be rejected.
pub struct RakutenBooksProvider {
    client: RakutenClient,
}

impl RakutenBooksProvider {
    pub fn new(client: RakutenClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LookupProvider for RakutenBooksProvider {
    fn id(&self) -> &str {
        "rakuten_books"
    }

    fn family(&self) -> RecordFamily {
        RecordFamily::Catalog
    }

    fn verifies_identity(&self) -> bool {
        true
    }

    async fn lookup(&self, key: &str) -> Result<Lookup, ProviderError> {
        let item: Option<BooksItem> = self
            .client
            .search(BOOKS_SEARCH_PATH, ("isbnJan", key))
            .await?;
        Ok(match item {
            Some(item) => Lookup::Found(books_record(item)),
            None => Lookup::NotFound,
        })
    }
}

/// Keyword search against the Ichiba marketplace. Broad: the code is matched
/// as free text, so this belongs after exact-match providers in a chain.
pub struct RakutenIchibaProvider {
    client: RakutenClient,
    family: RecordFamily,
}

impl RakutenIchibaProvider {
    pub fn new(client: RakutenClient, family: RecordFamily) -> Self {
        Self { client, family }
    }
}

#[async_trait]
impl LookupProvider for RakutenIchibaProvider {
    fn id(&self) -> &str {
        "rakuten_ichiba"
    }

    fn family(&self) -> RecordFamily {
        self.family
    }

    async fn lookup(&self, key: &str) -> Result<Lookup, ProviderError> {
        let item: Option<IchibaItem> = self
            .client
            .search(ICHIBA_SEARCH_PATH, ("keyword", key))
            .await?;
        Ok(match item {
            Some(item) => Lookup::Found(ichiba_record(item, self.family)),
            None => Lookup::NotFound,
        })
    }
}

//! Enrichment records and the fixed column layouts they are written in.

use serde::{Deserialize, Serialize};

/// Written in place of any field the upstream source did not supply.
pub const NOT_AVAILABLE: &str = "情報なし";

/// Output layout shared by every provider in one chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordFamily {
    /// Books and general merchandise in one layout, with a type column
    /// telling them apart.
    Catalog,
    /// Marketplace listings only.
    Market,
}

impl RecordFamily {
    pub fn field_names(&self) -> &'static [&'static str] {
        match self {
            RecordFamily::Catalog => &[
                "type",
                "name",
                "price",
                "url",
                "detail",
                "caption",
                "rating",
                "image_urls",
            ],
            RecordFamily::Market => &[
                "name",
                "price",
                "url",
                "shop",
                "caption",
                "rating",
                "image_urls",
            ],
        }
    }

    /// Header labels written above the output columns unless overridden.
    pub fn default_headers(&self) -> &'static [&'static str] {
        match self {
            RecordFamily::Catalog => &[
                "種別",
                "名称",
                "価格",
                "URL",
                "詳細(著者/店舗)",
                "商品説明",
                "レビュー平均",
                "画像URL",
            ],
            RecordFamily::Market => &[
                "商品名",
                "価格",
                "URL",
                "店舗名",
                "商品説明文",
                "レビュー平均点",
                "画像URL",
            ],
        }
    }

    pub fn width(&self) -> usize {
        self.field_names().len()
    }
}

impl std::fmt::Display for RecordFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordFamily::Catalog => f.write_str("catalog"),
            RecordFamily::Market => f.write_str("market"),
        }
    }
}

/// What kind of item a catalog record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Book,
    Merchandise,
}

impl ItemKind {
    pub fn label(&self) -> &'static str {
        match self {
            ItemKind::Book => "書籍",
            ItemKind::Merchandise => "商品",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRecord {
    pub kind: ItemKind,
    pub name: String,
    pub price: String,
    pub url: String,
    /// Author for books, shop name for merchandise.
    pub detail: String,
    pub caption: String,
    pub rating: String,
    pub image_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketRecord {
    pub name: String,
    pub price: String,
    pub url: String,
    pub shop: String,
    pub caption: String,
    pub rating: String,
    pub image_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordBody {
    Catalog(CatalogRecord),
    Market(MarketRecord),
}

/// A resolved lookup, ready to be written as one output row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentRecord {
    pub body: RecordBody,
    /// Code the provider says it matched (e.g. the returned ISBN). Used to
    /// reject fuzzy matches; never written.
    pub identity: Option<String>,
}

impl EnrichmentRecord {
    pub fn catalog(record: CatalogRecord) -> Self {
        Self {
            body: RecordBody::Catalog(record),
            identity: None,
        }
    }

    pub fn market(record: MarketRecord) -> Self {
        Self {
            body: RecordBody::Market(record),
            identity: None,
        }
    }

    pub fn with_identity(mut self, code: impl Into<String>) -> Self {
        self.identity = Some(code.into());
        self
    }

    pub fn family(&self) -> RecordFamily {
        match self.body {
            RecordBody::Catalog(_) => RecordFamily::Catalog,
            RecordBody::Market(_) => RecordFamily::Market,
        }
    }

    pub fn name(&self) -> &str {
        match &self.body {
            RecordBody::Catalog(r) => &r.name,
            RecordBody::Market(r) => &r.name,
        }
    }

    /// Cell values in the family's declared field order. Empty fields become
    /// [`NOT_AVAILABLE`].
    pub fn to_row(&self) -> Vec<String> {
        let cells = match &self.body {
            RecordBody::Catalog(r) => vec![
                r.kind.label().to_string(),
                r.name.clone(),
                r.price.clone(),
                r.url.clone(),
                r.detail.clone(),
                r.caption.clone(),
                r.rating.clone(),
                join_images(&r.image_urls),
            ],
            RecordBody::Market(r) => vec![
                r.name.clone(),
                r.price.clone(),
                r.url.clone(),
                r.shop.clone(),
                r.caption.clone(),
                r.rating.clone(),
                join_images(&r.image_urls),
            ],
        };
        cells.into_iter().map(or_not_available).collect()
    }
}

fn or_not_available(value: String) -> String {
    if value.trim().is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        value
    }
}

fn join_images(urls: &[String]) -> String {
    urls.join("\n")
}

/// An image reference as providers return it: a bare URL or an object
/// wrapping one.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ImageRef {
    Url(String),
    Object {
        #[serde(rename = "imageUrl", default)]
        image_url: Option<String>,
    },
}

impl ImageRef {
    pub fn url(&self) -> Option<&str> {
        match self {
            ImageRef::Url(url) => Some(url.as_str()),
            ImageRef::Object { image_url } => image_url.as_deref(),
        }
    }
}

/// Flattens image references into full-size URLs, dropping empties.
pub fn normalize_images<'a, I>(refs: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a ImageRef>,
{
    refs.into_iter()
        .filter_map(ImageRef::url)
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(strip_thumbnail_suffix)
        .collect()
}

/// Removes a thumbnail size query (`?_ex=128x128`) so the URL points at the
/// full-size image.
pub fn strip_thumbnail_suffix(url: &str) -> String {
    match url.find("?_ex=") {
        Some(pos) => url[..pos].to_string(),
        None => url.to_string(),
    }
}

/// Uppercased ASCII alphanumerics only, so `978-4-06-...` and `978406...`
/// compare equal.
pub fn normalize_code(code: &str) -> String {
    code.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

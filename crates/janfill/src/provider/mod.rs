//! Lookup providers: resolve one product code to an enrichment record.

pub mod rakuten;
pub mod record;
pub mod registry;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ProviderError;

pub use rakuten::{RakutenBooksProvider, RakutenClient, RakutenIchibaProvider};
pub use registry::build_providers;
pub use record::{
    CatalogRecord, EnrichmentRecord, ImageRef, ItemKind, MarketRecord, RecordBody, RecordFamily,
    NOT_AVAILABLE,
};

/// Outcome of a lookup that reached the upstream service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(EnrichmentRecord),
    NotFound,
}

#[async_trait]
pub trait LookupProvider: Send + Sync {
    /// Stable name used in logs and progress events.
    fn id(&self) -> &str;

    /// Layout of the records this provider returns.
    fn family(&self) -> RecordFamily;

    /// Whether returned records carry an identity code that must match the
    /// key. Providers that search by free text leave this off.
    fn verifies_identity(&self) -> bool {
        false
    }

    /// Not finding the key is `Ok(Lookup::NotFound)`; `Err` is reserved for
    /// transport and decoding failures.
    async fn lookup(&self, key: &str) -> Result<Lookup, ProviderError>;
}

/// A provider together with its fixed position in a chain.
#[derive(Clone)]
pub struct RegisteredProvider {
    pub ordinal: u32,
    pub provider: Arc<dyn LookupProvider>,
}

impl RegisteredProvider {
    pub fn new(ordinal: u32, provider: Arc<dyn LookupProvider>) -> Self {
        Self { ordinal, provider }
    }
}

impl std::fmt::Debug for RegisteredProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredProvider")
            .field("ordinal", &self.ordinal)
            .field("id", &self.provider.id())
            .finish()
    }
}

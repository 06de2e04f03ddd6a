use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::provider::record::normalize_code;
use crate::provider::{EnrichmentRecord, Lookup, RecordFamily, RegisteredProvider};

use super::progress::{MissReason, ProgressEvent, ProgressReporter};
use super::scanner::Row;

/// A record accepted for a row, with the provider that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub provider_id: String,
    pub record: EnrichmentRecord,
}

/// Ordered fallback over lookup providers. Narrow, exact providers come
/// first; broader search providers catch what they miss.
#[derive(Debug)]
pub struct ProviderChain {
    providers: Vec<RegisteredProvider>,
    family: RecordFamily,
    call_delay: Duration,
}

impl ProviderChain {
    pub fn new(
        mut providers: Vec<RegisteredProvider>,
        call_delay: Duration,
    ) -> Result<Self, ConfigError> {
        let family = match providers.first() {
            Some(first) => first.provider.family(),
            None => {
                return Err(ConfigError::InvalidChain {
                    reason: "At least one provider is required".to_string(),
                })
            }
        };

        let mut ordinals = HashSet::new();
        for registered in &providers {
            if !ordinals.insert(registered.ordinal) {
                return Err(ConfigError::InvalidChain {
                    reason: format!("Duplicate provider ordinal {}", registered.ordinal),
                });
            }
            if registered.provider.family() != family {
                return Err(ConfigError::InvalidChain {
                    reason: format!(
                        "Provider '{}' returns {} records but the chain writes {} records",
                        registered.provider.id(),
                        registered.provider.family(),
                        family
                    ),
                });
            }
        }

        providers.sort_by_key(|p| p.ordinal);
        Ok(Self {
            providers,
            family,
            call_delay,
        })
    }

    pub fn family(&self) -> RecordFamily {
        self.family
    }

    /// Provider ids in the order they are tried.
    pub fn provider_ids(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.provider.id()).collect()
    }

    /// Tries each provider in order and returns the first accepted record.
    /// Misses and provider errors move on to the next provider; `None` leaves
    /// the row for a later run. Every call is followed by `call_delay`.
    pub async fn resolve(&self, row: &Row, progress: &dyn ProgressReporter) -> Option<Resolution> {
        for registered in &self.providers {
            let provider = registered.provider.as_ref();
            let provider_id = provider.id().to_string();

            progress.report(ProgressEvent::ProviderAttempt {
                row: row.row_index,
                key: row.key.clone(),
                provider: provider_id.clone(),
            });

            let outcome = provider.lookup(&row.key).await;
            self.pace().await;

            let miss = match outcome {
                Ok(Lookup::Found(record)) => {
                    match check_identity(provider.verifies_identity(), &row.key, &record) {
                        Ok(()) => {
                            debug!(row = row.row_index, provider = %provider_id, "resolved");
                            progress.report(ProgressEvent::KeyResolved {
                                row: row.row_index,
                                key: row.key.clone(),
                                provider: provider_id.clone(),
                                name: record.name().to_string(),
                            });
                            return Some(Resolution {
                                provider_id,
                                record,
                            });
                        }
                        Err(reason) => reason,
                    }
                }
                Ok(Lookup::NotFound) => MissReason::NotFound,
                Err(e) => {
                    warn!(row = row.row_index, provider = %provider_id, error = %e, "lookup failed");
                    MissReason::TransportError {
                        error: e.to_string(),
                    }
                }
            };

            progress.report(ProgressEvent::ProviderMiss {
                row: row.row_index,
                key: row.key.clone(),
                provider: provider_id,
                reason: miss,
            });
        }

        progress.report(ProgressEvent::KeyUnresolved {
            row: row.row_index,
            key: row.key.clone(),
        });
        None
    }

    async fn pace(&self) {
        if !self.call_delay.is_zero() {
            tokio::time::sleep(self.call_delay).await;
        }
    }
}

fn check_identity(
    required: bool,
    key: &str,
    record: &EnrichmentRecord,
) -> Result<(), MissReason> {
    if !required {
        return Ok(());
    }
    match &record.identity {
        Some(code) if normalize_code(code) == normalize_code(key) => Ok(()),
        other => Err(MissReason::IdentityMismatch {
            returned: other.clone(),
        }),
    }
}

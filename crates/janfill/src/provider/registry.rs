use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, ProviderKind};
use crate::error::ConfigError;

use super::{
    LookupProvider, RakutenBooksProvider, RakutenClient, RakutenIchibaProvider, RecordFamily,
    RegisteredProvider,
};

/// Instantiates the providers listed in `config`, each at its ordinal.
/// Credentials are resolved once and shared between providers.
pub fn build_providers(config: &Config) -> Result<Vec<RegisteredProvider>, ConfigError> {
    let mut rakuten: Option<RakutenClient> = None;
    let mut providers = Vec::with_capacity(config.providers.len());

    for entry in &config.providers {
        let client = match &rakuten {
            Some(client) => client.clone(),
            None => {
                let client = rakuten_client(config)?;
                rakuten = Some(client.clone());
                client
            }
        };

        let provider: Arc<dyn LookupProvider> = match entry.kind {
            ProviderKind::RakutenBooks => {
                if config.family != RecordFamily::Catalog {
                    return Err(ConfigError::InvalidChain {
                        reason: format!(
                            "rakuten_books only produces catalog records, not {}",
                            config.family
                        ),
                    });
                }
                Arc::new(RakutenBooksProvider::new(client))
            }
            ProviderKind::RakutenIchiba => {
                Arc::new(RakutenIchibaProvider::new(client, config.family))
            }
        };
        providers.push(RegisteredProvider::new(entry.ordinal, provider));
    }

    Ok(providers)
}

fn rakuten_client(config: &Config) -> Result<RakutenClient, ConfigError> {
    let settings = config.rakuten.clone().unwrap_or_default();
    let application_id =
        settings
            .application_id
            .resolve()
            .map_err(|source| ConfigError::Secret {
                field: "rakuten.application_id",
                source,
            })?;
    let timeout = Duration::from_secs(settings.timeout_secs);

    let client = match settings.base_url.as_deref() {
        Some(base_url) => RakutenClient::with_base_url(
            base_url,
            application_id,
            settings.affiliate_id.clone(),
            timeout,
        ),
        None => RakutenClient::new(application_id, settings.affiliate_id.clone(), timeout),
    };
    client.map_err(|e| ConfigError::HttpClient(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;

    fn config(family: &str, providers: &str) -> Config {
        load_config_from_str(&format!(
            r#"{{
                "version": "1.0",
                "sheet": {{
                    "spreadsheet_id": "abc",
                    "sheet_name": "Sheet1",
                    "access_token": {{ "value": "token" }}
                }},
                "family": "{}",
                "providers": {},
                "rakuten": {{ "application_id": {{ "value": "app" }} }}
            }}"#,
            family, providers
        ))
        .unwrap()
    }

    #[test]
    fn test_builds_catalog_chain() {
        let config = config(
            "catalog",
            r#"[{"kind": "rakuten_ichiba", "ordinal": 2}, {"kind": "rakuten_books", "ordinal": 1}]"#,
        );
        let providers = build_providers(&config).unwrap();

        assert_eq!(providers.len(), 2);
        assert_eq!(providers[0].provider.id(), "rakuten_ichiba");
        assert_eq!(providers[0].ordinal, 2);
        assert_eq!(providers[1].provider.id(), "rakuten_books");
        assert!(providers[1].provider.verifies_identity());
    }

    #[test]
    fn test_market_family_flows_into_ichiba() {
        let config = config("market", r#"[{"kind": "rakuten_ichiba", "ordinal": 1}]"#);
        let providers = build_providers(&config).unwrap();

        assert_eq!(providers[0].provider.family(), RecordFamily::Market);
    }

    #[test]
    fn test_missing_application_id_is_config_error() {
        let mut config = config("market", r#"[{"kind": "rakuten_ichiba", "ordinal": 1}]"#);
        config.rakuten = Some(crate::config::RakutenConfig {
            application_id: Default::default(),
            ..Default::default()
        });

        assert!(matches!(
            build_providers(&config),
            Err(ConfigError::Secret {
                field: "rakuten.application_id",
                ..
            })
        ));
    }
}

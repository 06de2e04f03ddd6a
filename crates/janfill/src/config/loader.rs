use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::schema::{Config, ProviderKind};
use crate::error::ConfigError;
use crate::pipeline::PipelineConfig;
use crate::provider::RecordFamily;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

/// `<config dir>/janfill/config.json`, e.g. `~/.config/janfill/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("janfill").join("config.json"))
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

/// Checks the rules the schema cannot express.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    // Column labels, batch bounds, row order and header arity.
    PipelineConfig::from_config(config)?.validate()?;

    if config.providers.is_empty() {
        return Err(ConfigError::InvalidChain {
            reason: "At least one provider is required".to_string(),
        });
    }

    let mut ordinals = HashSet::new();
    for provider in &config.providers {
        if !ordinals.insert(provider.ordinal) {
            return Err(ConfigError::InvalidChain {
                reason: format!("Duplicate provider ordinal {}", provider.ordinal),
            });
        }

        if provider.kind == ProviderKind::RakutenBooks && config.family != RecordFamily::Catalog {
            return Err(ConfigError::InvalidChain {
                reason: format!(
                    "rakuten_books only produces catalog records, not {}",
                    config.family
                ),
            });
        }
    }

    Ok(())
}

/// Resolves every credential the config names, so a missing env var or
/// unreadable token file is reported before any request is made.
pub fn check_secrets(config: &Config) -> Result<(), ConfigError> {
    config
        .sheet
        .access_token
        .resolve()
        .map_err(|source| ConfigError::Secret {
            field: "sheet.access_token",
            source,
        })?;

    let rakuten = config.rakuten.clone().unwrap_or_default();
    rakuten
        .application_id
        .resolve()
        .map_err(|source| ConfigError::Secret {
            field: "rakuten.application_id",
            source,
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::WriteMode;

    const MINIMAL: &str = r#"
    {
        "version": "1.0",
        "sheet": {
            "spreadsheet_id": "1AbC",
            "sheet_name": "Sheet1"
        },
        "providers": [
            { "kind": "rakuten_books", "ordinal": 1 },
            { "kind": "rakuten_ichiba", "ordinal": 2 }
        ]
    }
    "#;

    #[test]
    fn test_load_minimal_config_with_defaults() {
        let config = load_config_from_str(MINIMAL).unwrap();

        assert_eq!(config.version, "1.0");
        assert_eq!(config.columns.key, "A");
        assert_eq!(config.columns.output_start, "B");
        assert_eq!(config.columns.header_row, 1);
        assert_eq!(config.batch.start_row, 2);
        assert_eq!(config.batch.size, 50);
        assert_eq!(config.batch.call_delay_ms, 1000);
        assert_eq!(config.batch.window_delay_ms, 3000);
        assert_eq!(config.batch.empty_window_threshold, 3);
        assert_eq!(config.family, RecordFamily::Catalog);
        assert_eq!(config.sheet.timeout_secs, 120);
        assert_eq!(config.sheet.write_mode, WriteMode::UserEntered);
        assert_eq!(
            config.sheet.access_token.env.as_deref(),
            Some("GOOGLE_SHEETS_ACCESS_TOKEN")
        );
        assert!(config.rakuten.is_none());
    }

    #[test]
    fn test_load_full_config() {
        let config_json = r#"
        {
            "version": "1.0",
            "sheet": {
                "spreadsheet_id": "1AbC",
                "sheet_name": "在庫",
                "base_url": "http://localhost:8080/v4/spreadsheets",
                "access_token": { "file": "~/.config/janfill/token" },
                "timeout_secs": 60,
                "write_mode": "raw"
            },
            "columns": { "key": "c", "output_start": "D", "header_row": 2 },
            "batch": {
                "start_row": 3,
                "size": 100,
                "call_delay_ms": 0,
                "window_delay_ms": 500,
                "empty_window_threshold": 5
            },
            "family": "market",
            "header_labels": ["a", "b", "c", "d", "e", "f", "g"],
            "providers": [{ "kind": "rakuten_ichiba", "ordinal": 1 }],
            "rakuten": {
                "application_id": { "env": "MY_APP_ID" },
                "affiliate_id": "aff",
                "timeout_secs": 10
            }
        }
        "#;

        let config = load_config_from_str(config_json).unwrap();
        assert_eq!(config.sheet.write_mode, WriteMode::Raw);
        assert_eq!(config.family, RecordFamily::Market);
        assert_eq!(config.batch.size, 100);

        let rakuten = config.rakuten.unwrap();
        assert_eq!(rakuten.affiliate_id.as_deref(), Some("aff"));
        assert_eq!(rakuten.application_id.env.as_deref(), Some("MY_APP_ID"));
    }

    #[test]
    fn test_invalid_version() {
        let config_json = MINIMAL.replace("\"1.0\"", "\"2.0\"");
        assert!(matches!(
            load_config_from_str(&config_json),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn test_batch_size_above_cap_fails_schema() {
        let config_json = MINIMAL.replace(
            "\"providers\"",
            "\"batch\": { \"size\": 101 },\n\"providers\"",
        );
        assert!(matches!(
            load_config_from_str(&config_json),
            Err(ConfigError::SchemaValidation { .. })
        ));
    }

    #[test]
    fn test_unknown_field_fails_schema() {
        let config_json = MINIMAL.replace("\"providers\"", "\"workers\": 4,\n\"providers\"");
        assert!(load_config_from_str(&config_json).is_err());
    }

    #[test]
    fn test_duplicate_ordinals() {
        let config_json = MINIMAL.replace("\"ordinal\": 2", "\"ordinal\": 1");
        assert!(matches!(
            load_config_from_str(&config_json),
            Err(ConfigError::InvalidChain { .. })
        ));
    }

    #[test]
    fn test_books_requires_catalog_family() {
        let config_json = MINIMAL.replace("\"providers\"", "\"family\": \"market\",\n\"providers\"");
        assert!(matches!(
            load_config_from_str(&config_json),
            Err(ConfigError::InvalidChain { .. })
        ));
    }

    #[test]
    fn test_start_row_must_follow_header_row() {
        let config_json = MINIMAL.replace(
            "\"providers\"",
            "\"columns\": { \"header_row\": 2 },\n\"batch\": { \"start_row\": 2 },\n\"providers\"",
        );
        assert!(matches!(
            load_config_from_str(&config_json),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn test_key_inside_output_columns() {
        let config_json = MINIMAL.replace(
            "\"providers\"",
            "\"columns\": { \"key\": \"C\", \"output_start\": \"B\" },\n\"providers\"",
        );
        assert!(load_config_from_str(&config_json).is_err());
    }

    #[test]
    fn test_header_label_count_must_match_family() {
        let config_json =
            MINIMAL.replace("\"providers\"", "\"header_labels\": [\"only one\"],\n\"providers\"");
        assert!(matches!(
            load_config_from_str(&config_json),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), MINIMAL).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.sheet.sheet_name, "Sheet1");
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_config("/nonexistent/janfill.json"),
            Err(ConfigError::ReadFile { .. })
        ));
    }

    #[test]
    fn test_default_config_path_ends_with_janfill() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("janfill/config.json"));
        }
    }
}

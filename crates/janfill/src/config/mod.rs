pub mod loader;
pub mod schema;

pub use loader::{check_secrets, default_config_path, load_config, load_config_from_str};
pub use schema::{
    BatchConfig, ColumnsConfig, Config, ProviderConfig, ProviderKind, RakutenConfig, SheetConfig,
};

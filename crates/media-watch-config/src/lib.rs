pub mod config;
pub mod credentials;
pub mod paths;

pub use config::{AdapterConfig, AutomationConfig, CatalogConfig, Config, DatabaseConfig, LoggingConfig, NotifyConfig, SweepConfig};
pub use credentials::CredentialStore;
pub use paths::{PathManager, container_base_path};

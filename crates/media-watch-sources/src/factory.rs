//! Builds the configured availability sources.
//!
//! Each factory inspects its own config section and secret(s); a missing or
//! disabled section simply yields no source.

use anyhow::Result;
use media_watch_config::{Config, CredentialStore};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use crate::http::ApiClient;
use crate::retry::RetryPolicy;
use crate::set::{SourceKind, SourceSet};
use crate::AvailabilitySource;

pub trait SourceFactory: Send + Sync {
    fn kind(&self) -> SourceKind;

    fn source_name(&self) -> &str {
        self.kind().as_str()
    }

    /// Returns None if the source is not enabled or not configured.
    fn create_source(&self, config: &Config, credentials: &CredentialStore) -> Result<Option<Arc<dyn AvailabilitySource>>>;

    fn validate_config(&self, config: &Config, credentials: &CredentialStore) -> Result<()>;
}

pub struct SourceFactoryRegistry {
    factories: HashMap<SourceKind, Box<dyn SourceFactory>>,
}

impl SourceFactoryRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };

        registry.register(Box::new(database::DatabaseSourceFactory));
        registry.register(Box::new(automation::AutomationSourceFactory));
        registry.register(Box::new(catalog::CatalogSourceFactory));

        registry
    }

    pub fn register(&mut self, factory: Box<dyn SourceFactory>) {
        self.factories.insert(factory.kind(), factory);
    }

    /// Every enabled source, keyed by kind.
    pub fn create_all_sources(&self, config: &Config, credentials: &CredentialStore) -> Result<SourceSet> {
        let mut set = SourceSet::new();
        for kind in SourceKind::PRECEDENCE {
            let Some(factory) = self.factories.get(&kind) else {
                continue;
            };
            match factory.create_source(config, credentials)? {
                Some(source) => {
                    debug!(source = factory.source_name(), "Availability source enabled");
                    set.insert(kind, source);
                }
                None => debug!(source = factory.source_name(), "Availability source not configured"),
            }
        }

        if set.is_empty() {
            warn!("No availability sources configured; every verdict will be UNKNOWN");
        }
        Ok(set)
    }

    pub fn validate_all_configs(&self, config: &Config, credentials: &CredentialStore) -> Result<()> {
        for kind in SourceKind::PRECEDENCE {
            if let Some(factory) = self.factories.get(&kind) {
                factory.validate_config(config, credentials)?;
            }
        }
        Ok(())
    }

    pub fn registered_sources(&self) -> Vec<&str> {
        SourceKind::PRECEDENCE
            .iter()
            .filter_map(|kind| self.factories.get(kind).map(|f| f.source_name()))
            .collect()
    }
}

impl Default for SourceFactoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn api_client(config: &Config, url: &str, api_key: String) -> Result<ApiClient> {
    let timeout = Duration::from_secs(config.adapters.timeout_secs);
    let retry = RetryPolicy::from_config(&config.adapters);
    Ok(ApiClient::new(url, api_key, timeout, retry)?)
}

mod database {
    use super::*;
    use crate::database::ArrDatabaseSource;

    pub struct DatabaseSourceFactory;

    impl SourceFactory for DatabaseSourceFactory {
        fn kind(&self) -> SourceKind {
            SourceKind::Db
        }

        fn create_source(&self, config: &Config, credentials: &CredentialStore) -> Result<Option<Arc<dyn AvailabilitySource>>> {
            match &config.database {
                Some(db) if db.enabled => {
                    let password = credentials.get_database_password().map(String::as_str);
                    let retry = RetryPolicy::from_config(&config.adapters);
                    Ok(Some(Arc::new(ArrDatabaseSource::new(db, password, retry))))
                }
                _ => Ok(None),
            }
        }

        fn validate_config(&self, config: &Config, credentials: &CredentialStore) -> Result<()> {
            if let Some(db) = config.database.as_ref().filter(|db| db.enabled) {
                if db.database.is_empty() {
                    return Err(anyhow::anyhow!("Database source is enabled but database is not configured"));
                }
                if credentials.get_database_password().is_none() {
                    warn!("No database_password secret stored; connecting without a password");
                }
            }
            Ok(())
        }
    }
}

mod automation {
    use super::*;
    use crate::automation::ArrApiSource;

    pub struct AutomationSourceFactory;

    impl SourceFactory for AutomationSourceFactory {
        fn kind(&self) -> SourceKind {
            SourceKind::Api
        }

        fn create_source(&self, config: &Config, credentials: &CredentialStore) -> Result<Option<Arc<dyn AvailabilitySource>>> {
            let Some(automation) = config.automation.as_ref().filter(|a| a.enabled) else {
                return Ok(None);
            };

            let radarr = match (&automation.radarr_url, credentials.get_radarr_api_key()) {
                (Some(url), Some(key)) => Some(api_client(config, url, key.clone())?),
                _ => None,
            };
            let sonarr = match (&automation.sonarr_url, credentials.get_sonarr_api_key()) {
                (Some(url), Some(key)) => Some(api_client(config, url, key.clone())?),
                _ => None,
            };

            if radarr.is_none() && sonarr.is_none() {
                return Ok(None);
            }
            Ok(Some(Arc::new(ArrApiSource::new(radarr, sonarr))))
        }

        fn validate_config(&self, config: &Config, credentials: &CredentialStore) -> Result<()> {
            if let Some(automation) = config.automation.as_ref().filter(|a| a.enabled) {
                if automation.radarr_url.is_some() && credentials.get_radarr_api_key().is_none() {
                    return Err(anyhow::anyhow!(
                        "Radarr URL is set but radarr_api_key is missing. Run 'readyarr config secret radarr_api_key' first"
                    ));
                }
                if automation.sonarr_url.is_some() && credentials.get_sonarr_api_key().is_none() {
                    return Err(anyhow::anyhow!(
                        "Sonarr URL is set but sonarr_api_key is missing. Run 'readyarr config secret sonarr_api_key' first"
                    ));
                }
            }
            Ok(())
        }
    }
}

mod catalog {
    use super::*;
    use crate::catalog::CatalogSource;

    pub struct CatalogSourceFactory;

    impl SourceFactory for CatalogSourceFactory {
        fn kind(&self) -> SourceKind {
            SourceKind::Catalog
        }

        fn create_source(&self, config: &Config, credentials: &CredentialStore) -> Result<Option<Arc<dyn AvailabilitySource>>> {
            let Some(catalog) = config.catalog.as_ref().filter(|c| c.enabled) else {
                return Ok(None);
            };
            let Some(key) = credentials.get_catalog_api_key() else {
                warn!("Catalog is configured but catalog_api_key is missing; catalog source disabled");
                return Ok(None);
            };
            let client = api_client(config, &catalog.api_url, key.clone())?;
            Ok(Some(Arc::new(CatalogSource::new(client))))
        }

        fn validate_config(&self, config: &Config, credentials: &CredentialStore) -> Result<()> {
            if config.catalog.as_ref().map(|c| c.enabled).unwrap_or(false) && credentials.get_catalog_api_key().is_none() {
                return Err(anyhow::anyhow!(
                    "Catalog is enabled but catalog_api_key is missing. Run 'readyarr config secret catalog_api_key' first"
                ));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_watch_config::{AutomationConfig, CatalogConfig};
    use std::path::PathBuf;

    fn credentials() -> CredentialStore {
        CredentialStore::new(PathBuf::from("/nonexistent/credentials.toml"))
    }

    #[test]
    fn test_nothing_configured_gives_empty_set() {
        let set = SourceFactoryRegistry::new()
            .create_all_sources(&Config::default(), &credentials())
            .unwrap();
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn test_catalog_and_api_sources_created() {
        let config = Config {
            automation: Some(AutomationConfig {
                enabled: true,
                radarr_url: Some("http://radarr:7878".to_string()),
                sonarr_url: None,
            }),
            catalog: Some(CatalogConfig {
                enabled: true,
                api_url: "http://overseerr:5055/api/v1".to_string(),
            }),
            ..Config::default()
        };
        let mut creds = credentials();
        creds.set("radarr_api_key".to_string(), "r".to_string());
        creds.set("catalog_api_key".to_string(), "c".to_string());

        let registry = SourceFactoryRegistry::new();
        registry.validate_all_configs(&config, &creds).unwrap();
        let set = registry.create_all_sources(&config, &creds).unwrap();
        assert_eq!(set.names(), vec!["api", "catalog"]);
        assert!(set.retractor().is_some());
    }

    #[test]
    fn test_missing_secret_fails_validation() {
        let config = Config {
            catalog: Some(CatalogConfig {
                enabled: true,
                api_url: "http://overseerr:5055/api/v1".to_string(),
            }),
            ..Config::default()
        };
        assert!(SourceFactoryRegistry::new().validate_all_configs(&config, &credentials()).is_err());
    }

    #[test]
    fn test_registered_in_precedence_order() {
        assert_eq!(SourceFactoryRegistry::new().registered_sources(), vec!["db", "api", "catalog"]);
    }
}

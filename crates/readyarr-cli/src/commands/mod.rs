pub mod check;
pub mod config;
pub mod daemon;
pub mod resolve;
pub mod watch;

use color_eyre::eyre::eyre;
use color_eyre::Result;
use media_watch_config::{Config, CredentialStore, PathManager};
use media_watch_core::{notifier_from_config, Resolver, Sweeper, WatchRegistry};
use media_watch_sources::{SourceFactoryRegistry, SourceSet};
use std::sync::Arc;
use std::time::Duration;

/// Load `config.toml`, falling back to defaults when it does not exist yet.
pub fn load_config(paths: &PathManager) -> anyhow::Result<Config> {
    let config_file = paths.config_file();
    if !config_file.exists() {
        return Ok(Config::default());
    }
    let config = Config::load_from_file(&config_file)
        .map_err(|e| anyhow::anyhow!("Failed to load config from {}: {}", config_file.display(), e))?;
    config.validate()?;
    Ok(config)
}

/// Everything a command needs: paths, validated config and stored secrets.
pub struct AppContext {
    pub paths: PathManager,
    pub config: Config,
    pub credentials: CredentialStore,
}

impl AppContext {
    pub fn new(paths: PathManager, config: Config) -> Result<Self> {
        let credentials_file = paths.credentials_file();
        let mut credentials = CredentialStore::new(credentials_file.clone());
        credentials
            .load()
            .map_err(|e| eyre!("Failed to load credentials from {}: {}", credentials_file.display(), e))?;

        Ok(Self {
            paths,
            config,
            credentials,
        })
    }

    pub fn sources(&self) -> Result<SourceSet> {
        let factories = SourceFactoryRegistry::new();
        factories
            .validate_all_configs(&self.config, &self.credentials)
            .map_err(|e| eyre!("Configuration validation failed: {}", e))?;
        factories
            .create_all_sources(&self.config, &self.credentials)
            .map_err(|e| eyre!("Failed to create availability sources: {}", e))
    }

    pub fn resolver(&self) -> Result<Arc<Resolver>> {
        Ok(Arc::new(Resolver::new(self.sources()?)))
    }

    pub fn registry(&self) -> Result<WatchRegistry> {
        self.paths
            .ensure_directories()
            .map_err(|e| eyre!("Failed to create data directories: {}", e))?;
        let path = self.paths.registry_file();
        WatchRegistry::open_file(&path).map_err(|e| eyre!("{}", e))
    }

    pub fn sweeper(&self, registry: WatchRegistry, resolver: Arc<Resolver>) -> Result<Sweeper> {
        let timeout = Duration::from_secs(self.config.adapters.timeout_secs);
        let notifier = notifier_from_config(&self.config.notify, timeout)
            .map_err(|e| eyre!("Failed to create notifier: {}", e))?;
        Ok(Sweeper::new(resolver, registry, notifier)
            .with_entry_timeout(Duration::from_secs(self.config.sweep.entry_timeout_secs)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let paths = PathManager::with_base(dir.path().to_path_buf());
        let config = load_config(&paths).unwrap();
        assert!(config.configured_sources().is_empty());
        assert_eq!(config.sweep.interval_minutes, 15);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let paths = PathManager::with_base(dir.path().to_path_buf());
        std::fs::write(paths.config_file(), "[sweep]\ninterval_minutes = 0\n").unwrap();
        assert!(load_config(&paths).is_err());
    }

    #[test]
    fn test_context_opens_registry_under_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let paths = PathManager::with_base(dir.path().to_path_buf());
        let context = AppContext::new(paths, Config::default()).unwrap();
        assert!(context.registry().is_ok());
        assert!(context.paths.data_dir().exists());
    }
}

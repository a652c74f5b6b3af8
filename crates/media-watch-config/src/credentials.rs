use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

pub const DATABASE_PASSWORD: &str = "database_password";
pub const RADARR_API_KEY: &str = "radarr_api_key";
pub const SONARR_API_KEY: &str = "sonarr_api_key";
pub const CATALOG_API_KEY: &str = "catalog_api_key";

/// Every secret name the store understands.
pub const KNOWN_SECRETS: &[&str] = &[DATABASE_PASSWORD, RADARR_API_KEY, SONARR_API_KEY, CATALOG_API_KEY];

#[derive(Debug, Serialize, Deserialize, Default)]
struct CredentialsData {
    #[serde(flatten)]
    data: HashMap<String, String>,
}

pub struct CredentialStore {
    path: PathBuf,
    credentials: HashMap<String, String>,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            credentials: HashMap::new(),
        }
    }

    pub fn load(&mut self) -> Result<()> {
        if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)?;
            let creds_data: CredentialsData = toml::from_str(&content)?;
            self.credentials = creds_data.data;
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let creds_data = CredentialsData {
            data: self.credentials.clone(),
        };
        let content = toml::to_string_pretty(&creds_data)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.credentials.get(key)
    }

    pub fn set(&mut self, key: String, value: String) {
        self.credentials.insert(key, value);
    }

    pub fn remove(&mut self, key: &str) {
        self.credentials.remove(key);
    }

    pub fn get_database_password(&self) -> Option<&String> {
        self.get(DATABASE_PASSWORD)
    }

    pub fn get_radarr_api_key(&self) -> Option<&String> {
        self.get(RADARR_API_KEY)
    }

    pub fn get_sonarr_api_key(&self) -> Option<&String> {
        self.get(SONARR_API_KEY)
    }

    pub fn get_catalog_api_key(&self) -> Option<&String> {
        self.get(CATALOG_API_KEY)
    }

    pub fn get_all_keys(&self) -> Vec<String> {
        self.credentials.keys().cloned().collect()
    }
}

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Direct read access to the automation services' Postgres mirror.
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    /// Live Radarr/Sonarr HTTP APIs.
    #[serde(default)]
    pub automation: Option<AutomationConfig>,
    /// Umbrella catalog service (request manager).
    #[serde(default)]
    pub catalog: Option<CatalogConfig>,
    #[serde(default)]
    pub sweep: SweepConfig,
    #[serde(default)]
    pub adapters: AdapterConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_db_host")]
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    pub database: String,
    pub user: String,
    #[serde(default = "default_db_schema")]
    pub schema: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub radarr_url: Option<String>,
    #[serde(default)]
    pub sonarr_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Base URL including the API prefix, e.g. `https://requests.example.com/api/v1`.
    pub api_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,
    #[serde(default = "default_first_run_delay_secs")]
    pub first_run_delay_secs: u64,
    #[serde(default = "default_true")]
    pub run_on_startup: bool,
    /// Upper bound on resolving a single entry, retries included.
    #[serde(default = "default_entry_timeout_secs")]
    pub entry_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    #[serde(default = "default_adapter_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Where notification events are POSTed. Unset means they are only logged.
    #[serde(default)]
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: Option<bool>,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    5432
}

fn default_db_schema() -> String {
    "serverstats".to_string()
}

fn default_interval_minutes() -> u64 {
    15
}

fn default_first_run_delay_secs() -> u64 {
    60
}

fn default_entry_timeout_secs() -> u64 {
    60
}

fn default_adapter_timeout_secs() -> u64 {
    5
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
            first_run_delay_secs: default_first_run_delay_secs(),
            run_on_startup: default_true(),
            entry_timeout_secs: default_entry_timeout_secs(),
        }
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_adapter_timeout_secs(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: None,
            file: None,
        }
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Plain SQL identifier: the schema name is interpolated into queries.
fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Config {
    pub fn load_from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &PathBuf) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(db) = self.database.as_ref().filter(|db| db.enabled) {
            if db.host.is_empty() {
                return Err(anyhow::anyhow!("database.host cannot be empty"));
            }
            if db.database.is_empty() || db.user.is_empty() {
                return Err(anyhow::anyhow!("database.database and database.user are required"));
            }
            if !is_sql_identifier(&db.schema) {
                return Err(anyhow::anyhow!("database.schema '{}' is not a valid identifier", db.schema));
            }
        }

        if let Some(automation) = self.automation.as_ref().filter(|a| a.enabled) {
            if automation.radarr_url.is_none() && automation.sonarr_url.is_none() {
                return Err(anyhow::anyhow!("automation is enabled but neither radarr_url nor sonarr_url is set"));
            }
            for (name, url) in [("radarr_url", &automation.radarr_url), ("sonarr_url", &automation.sonarr_url)] {
                if let Some(url) = url {
                    if !is_http_url(url) {
                        return Err(anyhow::anyhow!("automation.{} must start with http:// or https://", name));
                    }
                }
            }
        }

        if let Some(catalog) = self.catalog.as_ref().filter(|c| c.enabled) {
            if !is_http_url(&catalog.api_url) {
                return Err(anyhow::anyhow!("catalog.api_url must start with http:// or https://"));
            }
        }

        if let Some(url) = &self.notify.webhook_url {
            if !is_http_url(url) {
                return Err(anyhow::anyhow!("notify.webhook_url must start with http:// or https://"));
            }
        }

        if self.sweep.interval_minutes == 0 {
            return Err(anyhow::anyhow!("sweep.interval_minutes must be greater than zero"));
        }
        if self.sweep.entry_timeout_secs == 0 {
            return Err(anyhow::anyhow!("sweep.entry_timeout_secs must be greater than zero"));
        }
        if self.adapters.max_attempts == 0 {
            return Err(anyhow::anyhow!("adapters.max_attempts must be at least 1"));
        }
        if self.adapters.timeout_secs == 0 {
            return Err(anyhow::anyhow!("adapters.timeout_secs must be greater than zero"));
        }

        Ok(())
    }

    /// Names of the availability sources that are configured and enabled,
    /// in resolution precedence order.
    pub fn configured_sources(&self) -> Vec<String> {
        let mut sources = Vec::new();

        if self.database.as_ref().map(|db| db.enabled).unwrap_or(false) {
            sources.push("db".to_string());
        }
        if let Some(automation) = &self.automation {
            if automation.enabled && (automation.radarr_url.is_some() || automation.sonarr_url.is_some()) {
                sources.push("api".to_string());
            }
        }
        if let Some(catalog) = &self.catalog {
            if catalog.enabled && !catalog.api_url.is_empty() {
                sources.push("catalog".to_string());
            }
        }

        sources
    }
}

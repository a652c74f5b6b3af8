use super::{load_config, AppContext};
use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use comfy_table::{Cell, Table};
use media_watch_config::credentials::{
    CATALOG_API_KEY, DATABASE_PASSWORD, KNOWN_SECRETS, RADARR_API_KEY, SONARR_API_KEY,
};
use media_watch_config::{Config, CredentialStore, PathManager};
use owo_colors::OwoColorize;
use serde_json::json;

/// Written by `config init`. Every source is commented out until filled in.
pub const CONFIG_TEMPLATE: &str = r#"# readyarr configuration

# Read-only access to the Radarr/Sonarr Postgres mirror. Fastest source.
# Password: readyarr config secret database_password
#[database]
#host = "localhost"
#port = 5432
#database = "thearchive"
#user = "readyarr"
#schema = "serverstats"

# Live Radarr/Sonarr APIs.
# Keys: readyarr config secret radarr_api_key / sonarr_api_key
#[automation]
#radarr_url = "http://radarr:7878"
#sonarr_url = "http://sonarr:8989"

# Request manager catalog. Also used to withdraw requests on cancel.
# Key: readyarr config secret catalog_api_key
#[catalog]
#api_url = "http://overseerr:5055/api/v1"

[sweep]
interval_minutes = 15
first_run_delay_secs = 60
run_on_startup = true
entry_timeout_secs = 60

[adapters]
timeout_secs = 5
max_attempts = 3
backoff_base_ms = 1000

[notify]
# Notifications are POSTed here as JSON. Unset means log only.
#webhook_url = "http://bot:8080/notify"

[logging]
level = "info"
"#;

pub async fn run_config(cmd: crate::ConfigCommands, paths: PathManager, output: &Output) -> Result<()> {
    match cmd {
        crate::ConfigCommands::Show { full } => show_config(&paths, full, output),
        crate::ConfigCommands::Init { force } => init_config(&paths, force, output),
        crate::ConfigCommands::Secret { name, value } => set_secret(&paths, &name, value, output),
        crate::ConfigCommands::Check => check_config(paths, output).await,
    }
}

fn mask_string(s: &str) -> String {
    if s.is_empty() {
        return "<not set>".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}***{}", head, tail)
}

fn secret_display(credentials: &CredentialStore, name: &str, full: bool) -> String {
    match credentials.get(name) {
        Some(value) if full => value.clone(),
        Some(value) => mask_string(value),
        None => "<not set>".to_string(),
    }
}

fn enabled_cell(enabled: bool) -> Cell {
    Cell::new(if enabled { "✓".green().to_string() } else { "✗".red().to_string() })
}

fn section_table(title: &str, rows: Vec<(&str, Cell)>) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        Cell::new(title).fg(comfy_table::Color::Cyan).add_attribute(comfy_table::Attribute::Bold),
    ]);
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), value]);
    }
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    table
}

fn load_credentials(paths: &PathManager) -> Result<CredentialStore> {
    let file = paths.credentials_file();
    let mut credentials = CredentialStore::new(file.clone());
    credentials
        .load()
        .map_err(|e| eyre!("Failed to load credentials from {}: {}", file.display(), e))?;
    Ok(credentials)
}

fn show_config(paths: &PathManager, full: bool, output: &Output) -> Result<()> {
    let config_file = paths.config_file();
    if !config_file.exists() {
        output.warn(format!("Configuration file not found at: {}", config_file.display()));
        output.info("Run 'readyarr config init' to create one.");
        return Ok(());
    }

    let config = load_config(paths).map_err(|e| eyre!("{}", e))?;
    let credentials = load_credentials(paths)?;

    output.data(&json!({
        "config_file": config_file,
        "sources": config.configured_sources(),
        "secrets": KNOWN_SECRETS
            .iter()
            .map(|name| (name.to_string(), secret_display(&credentials, name, full)))
            .collect::<std::collections::BTreeMap<_, _>>(),
        "sweep": config.sweep,
        "adapters": config.adapters,
        "notify": config.notify,
    }));

    if !output.is_human() || output.is_quiet() {
        return Ok(());
    }

    println!("{}", section_table("Files", vec![
        ("Config File", Cell::new(config_file.display().to_string())),
        ("Credentials File", Cell::new(paths.credentials_file().display().to_string())),
        ("Watch Registry", Cell::new(paths.registry_file().display().to_string())),
    ]));

    if let Some(db) = &config.database {
        println!("{}", section_table("Database Source", vec![
            ("Enabled", enabled_cell(db.enabled)),
            ("Host", Cell::new(format!("{}:{}", db.host, db.port))),
            ("Database", Cell::new(&db.database)),
            ("User", Cell::new(&db.user)),
            ("Schema", Cell::new(&db.schema)),
            ("Password", Cell::new(secret_display(&credentials, DATABASE_PASSWORD, full))),
        ]));
    }

    if let Some(automation) = &config.automation {
        println!("{}", section_table("Automation API Source", vec![
            ("Enabled", enabled_cell(automation.enabled)),
            ("Radarr URL", Cell::new(automation.radarr_url.as_deref().unwrap_or("<not set>"))),
            ("Radarr API Key", Cell::new(secret_display(&credentials, RADARR_API_KEY, full))),
            ("Sonarr URL", Cell::new(automation.sonarr_url.as_deref().unwrap_or("<not set>"))),
            ("Sonarr API Key", Cell::new(secret_display(&credentials, SONARR_API_KEY, full))),
        ]));
    }

    if let Some(catalog) = &config.catalog {
        println!("{}", section_table("Catalog Source", vec![
            ("Enabled", enabled_cell(catalog.enabled)),
            ("API URL", Cell::new(&catalog.api_url)),
            ("API Key", Cell::new(secret_display(&credentials, CATALOG_API_KEY, full))),
        ]));
    }

    println!("{}", section_table("Sweep", vec![
        ("Interval", Cell::new(format!("{} minutes", config.sweep.interval_minutes))),
        ("Run On Startup", enabled_cell(config.sweep.run_on_startup)),
        ("First Run Delay", Cell::new(format!("{} seconds", config.sweep.first_run_delay_secs))),
        ("Entry Timeout", Cell::new(format!("{} seconds", config.sweep.entry_timeout_secs))),
        ("Adapter Timeout", Cell::new(format!("{} seconds", config.adapters.timeout_secs))),
        ("Attempts", Cell::new(config.adapters.max_attempts.to_string())),
        ("Webhook", Cell::new(config.notify.webhook_url.as_deref().unwrap_or("<log only>"))),
    ]));

    if config.configured_sources().is_empty() {
        output.warn("No availability sources are configured.");
    }
    Ok(())
}

fn init_config(paths: &PathManager, force: bool, output: &Output) -> Result<()> {
    let config_file = paths.config_file();
    if config_file.exists() && !force {
        return Err(eyre!(
            "{} already exists; pass --force to overwrite it",
            config_file.display()
        ));
    }

    paths
        .ensure_directories()
        .map_err(|e| eyre!("Failed to create directories: {}", e))?;
    std::fs::write(&config_file, CONFIG_TEMPLATE)
        .map_err(|e| eyre!("Failed to write {}: {}", config_file.display(), e))?;

    output.success(format!("Wrote {}", config_file.display()));
    output.info("Uncomment at least one source, then store its secret with 'readyarr config secret <name>'.");
    Ok(())
}

fn set_secret(paths: &PathManager, name: &str, value: Option<String>, output: &Output) -> Result<()> {
    if !KNOWN_SECRETS.contains(&name) {
        return Err(eyre!(
            "Unknown secret '{}'. Known secrets: {}",
            name,
            KNOWN_SECRETS.join(", ")
        ));
    }

    let value = match value {
        Some(value) => value,
        None => rpassword::prompt_password(format!("{}: ", name))
            .map_err(|e| eyre!("Failed to read {}: {}", name, e))?,
    };
    let value = value.trim().to_string();

    let mut credentials = load_credentials(paths)?;
    if value.is_empty() {
        credentials.remove(name);
        credentials.save().map_err(|e| eyre!("Failed to save credentials: {}", e))?;
        output.success(format!("Removed {}", name));
        return Ok(());
    }

    credentials.set(name.to_string(), value);
    credentials.save().map_err(|e| eyre!("Failed to save credentials: {}", e))?;
    output.success(format!("Saved {}", name));
    Ok(())
}

async fn check_config(paths: PathManager, output: &Output) -> Result<()> {
    let config: Config = load_config(&paths).map_err(|e| eyre!("{}", e))?;
    let context = AppContext::new(paths, config)?;
    let sources = context.sources()?;
    output.success("Configuration is valid");

    if sources.is_empty() {
        output.warn("No availability sources are configured; every verdict will be UNKNOWN.");
        return Ok(());
    }

    let mut results = Vec::new();
    let mut failures = 0;
    for (kind, source) in sources.in_precedence() {
        match source.probe().await {
            Ok(()) => {
                output.success(format!("{} reachable", kind));
                results.push(json!({ "source": kind.as_str(), "ok": true }));
            }
            Err(e) => {
                failures += 1;
                output.error(format!("{} unreachable: {}", kind, e));
                results.push(json!({ "source": kind.as_str(), "ok": false, "error": e.to_string() }));
            }
        }
    }
    output.data(&json!({ "sources": results }));

    if failures > 0 {
        return Err(eyre!("{} source(s) failed the connectivity check", failures));
    }
    Ok(())
}

use clap::{ArgAction, Parser, Subcommand};
use color_eyre::eyre::eyre;
use commands::{check, config, daemon, resolve, watch, AppContext};
use media_watch_config::{Config, LoggingConfig, PathManager};
use std::path::PathBuf;

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "readyarr")]
#[command(about = "Readyarr - Tell requesters when their movies and shows are ready to watch")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the availability watcher in the foreground
    #[command(long_about = "Sweep the watch registry on a fixed interval and notify requesters when their items become available. A first sweep runs shortly after startup unless --no-startup-check is given. Stops on Ctrl-C.")]
    Daemon {
        /// Minutes between sweeps (overrides sweep.interval_minutes)
        #[arg(long, value_name = "N")]
        interval_minutes: Option<u64>,

        /// Skip the sweep shortly after startup
        #[arg(long, action = ArgAction::SetTrue)]
        no_startup_check: bool,

        /// Also write logs to this file, rotated daily
        #[arg(long, value_name = "PATH")]
        log_file: Option<PathBuf>,
    },
    /// Run one sweep now and print the report
    Check,
    /// Manage watched items
    Watch {
        #[command(subcommand)]
        cmd: WatchCommands,
    },
    /// Resolve one item's availability and show which source decided it
    Resolve {
        /// Catalog id (TMDB id)
        #[arg(long)]
        id: u64,

        /// movie or tv
        #[arg(long = "type", value_name = "TYPE")]
        media_type: String,

        /// Season number (TV only)
        #[arg(long)]
        season: Option<u32>,

        /// TVDB id, needed by the database and automation sources for TV
        #[arg(long)]
        tvdb_id: Option<u32>,
    },
    /// Manage configuration and secrets
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum WatchCommands {
    /// Start watching an item for a requester
    Add {
        #[arg(long)]
        id: u64,

        #[arg(long = "type", value_name = "TYPE")]
        media_type: String,

        #[arg(long)]
        season: Option<u32>,

        #[arg(long)]
        tvdb_id: Option<u32>,

        /// Requester's notification channel
        #[arg(long)]
        channel: String,

        /// Title shown in the notification
        #[arg(long)]
        title: Option<String>,

        /// Library name shown in the notification
        #[arg(long)]
        library: Option<String>,

        /// Upstream request id, withdrawn if the watch is cancelled
        #[arg(long)]
        request_id: Option<u64>,

        /// Acknowledgement message handle to retire on notification
        #[arg(long)]
        confirmation: Option<String>,
    },
    /// Stop watching an item for a requester
    Cancel {
        #[arg(long)]
        id: u64,

        #[arg(long = "type", value_name = "TYPE")]
        media_type: String,

        #[arg(long)]
        season: Option<u32>,

        #[arg(long)]
        channel: String,
    },
    /// List watched items
    List,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration (masks secrets)
    Show {
        /// Show secrets unmasked
        #[arg(long, action = ArgAction::SetTrue)]
        full: bool,
    },
    /// Write a starter config.toml
    Init {
        /// Overwrite an existing file
        #[arg(long, action = ArgAction::SetTrue)]
        force: bool,
    },
    /// Store a secret (prompts when --value is omitted; empty removes it)
    Secret {
        /// database_password, radarr_api_key, sonarr_api_key or catalog_api_key
        name: String,

        #[arg(long)]
        value: Option<String>,
    },
    /// Validate configuration and test connectivity to each source
    Check,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let paths = PathManager::default();

    // A broken config must not stop `config init --force` from repairing it
    let loaded = commands::load_config(&paths);
    let logging_config = loaded
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_else(|_| LoggingConfig::default());
    let log_file = match &cli.command {
        Commands::Daemon { log_file, .. } => log_file.clone(),
        _ => None,
    };
    logging::init_logging(cli.verbose, cli.quiet, &logging_config, log_file).map_err(|e| eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);

    match cli.command {
        Commands::Daemon {
            interval_minutes,
            no_startup_check,
            ..
        } => daemon::run_daemon(app_context(paths, loaded)?, interval_minutes, no_startup_check, &output).await,
        Commands::Check => check::run_check(app_context(paths, loaded)?, &output).await,
        Commands::Watch { cmd } => watch::run_watch(cmd, app_context(paths, loaded)?, &output).await,
        Commands::Resolve {
            id,
            media_type,
            season,
            tvdb_id,
        } => resolve::run_resolve(app_context(paths, loaded)?, id, media_type, season, tvdb_id, &output).await,
        Commands::Config { cmd } => config::run_config(cmd, paths, &output).await,
    }
}

fn app_context(paths: PathManager, loaded: anyhow::Result<Config>) -> color_eyre::Result<AppContext> {
    let config = loaded.map_err(|e| eyre!("{}", e))?;
    AppContext::new(paths, config)
}

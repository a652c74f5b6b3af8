use anyhow::Result;
use media_watch_config::LoggingConfig;
use std::io;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::{self, time::ChronoUtc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Filter from `-q`/`-v` flags, then `RUST_LOG`, then the configured level.
fn build_filter(verbose_level: u8, quiet: bool, configured_level: &str) -> EnvFilter {
    if quiet {
        return EnvFilter::new("error");
    }

    let fallback = match verbose_level {
        0 => configured_level,
        // Connection pool and HTTP internals are noisy at debug
        1 => "debug,hyper=warn,sqlx::pool=warn,reqwest::connect=warn",
        _ => "trace",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

fn use_json(configured: Option<bool>) -> bool {
    match std::env::var("RUST_LOG_JSON") {
        Ok(v) => v == "true",
        Err(_) => configured.unwrap_or_else(|| !io::stdout().is_terminal()),
    }
}

/// Split `logs/readyarr.log` into the directory and the rotation prefix `readyarr`.
fn rotation_target(log_path: &Path) -> Result<(PathBuf, String)> {
    let log_dir = log_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let filename = log_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid log filename: {}", log_path.display()))?;
    let prefix = filename.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(filename);
    Ok((log_dir, prefix.to_string()))
}

pub fn init_logging(verbose_level: u8, quiet: bool, config: &LoggingConfig, log_file: Option<PathBuf>) -> Result<()> {
    let filter = build_filter(verbose_level, quiet, &config.level);
    let json = use_json(config.json);
    let registry = Registry::default().with(filter);

    match log_file.or_else(|| config.file.clone()) {
        Some(log_path) => {
            let (log_dir, prefix) = rotation_target(&log_path)?;
            std::fs::create_dir_all(&log_dir)?;
            // readyarr.2026-10-19, readyarr.2026-10-20, ...
            let appender = RollingFileAppender::new(Rotation::DAILY, log_dir, prefix);

            if json {
                registry
                    .with(fmt::layer().json().with_timer(ChronoUtc::rfc_3339()).with_writer(appender))
                    .init();
            } else {
                registry
                    .with(fmt::layer().with_timer(ChronoUtc::rfc_3339()).with_ansi(false).with_writer(appender))
                    .init();
            }
        }
        None => {
            if json {
                registry
                    .with(fmt::layer().json().with_timer(ChronoUtc::rfc_3339()).with_writer(io::stderr))
                    .init();
            } else {
                registry
                    .with(fmt::layer().with_timer(ChronoUtc::rfc_3339()).with_writer(io::stderr))
                    .init();
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_target() {
        let (dir, prefix) = rotation_target(Path::new("/app/logs/readyarr.log")).unwrap();
        assert_eq!(dir, PathBuf::from("/app/logs"));
        assert_eq!(prefix, "readyarr");

        let (dir, prefix) = rotation_target(Path::new("sweeps")).unwrap();
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(prefix, "sweeps");
    }
}

use super::resolve::{media_from_args, with_catalog_tvdb_id};
use crate::commands::AppContext;
use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use comfy_table::{Cell, Table};
use media_watch_core::{SubmitOutcome, WatchRegistry};
use media_watch_models::{WatchEntry, WatchMarker, WatchRequest};
use media_watch_sources::SourceSet;
use owo_colors::OwoColorize;
use serde_json::json;
use tracing::warn;

pub async fn run_watch(cmd: crate::WatchCommands, context: AppContext, output: &Output) -> Result<()> {
    match cmd {
        crate::WatchCommands::Add {
            id,
            media_type,
            season,
            tvdb_id,
            channel,
            title,
            library,
            request_id,
            confirmation,
        } => {
            let media = media_from_args(id, &media_type, season, tvdb_id)?;
            let media = if media.is_movie() || media.tvdb_id.is_some() {
                media
            } else {
                with_catalog_tvdb_id(&context.sources()?, media, output).await
            };
            let request = WatchRequest {
                display_title: title.unwrap_or_else(|| media.to_string()),
                library_label: library.unwrap_or_else(|| default_library(media.is_movie()).to_string()),
                requester_channel: channel,
                request_id,
                media,
            };
            add_watch(&context.registry()?, request, confirmation, output).await
        }
        crate::WatchCommands::Cancel {
            id,
            media_type,
            season,
            channel,
        } => {
            let media = media_from_args(id, &media_type, season, None)?;
            let registry = context.registry()?;
            let Some(removed) = registry
                .cancel(&media.key(), &channel)
                .await
                .map_err(|e| eyre!("{}", e))?
            else {
                output.info(format!("{} was not being watched for channel {}", media, channel));
                return Ok(());
            };
            output.success(format!("Stopped watching \"{}\"", removed.display_title));

            if let Some(request_id) = removed.request_id {
                let sources = context.sources()?;
                retract_upstream(&sources, request_id, output).await;
            }
            Ok(())
        }
        crate::WatchCommands::List => list_watches(&context.registry()?, output).await,
    }
}

fn default_library(is_movie: bool) -> &'static str {
    if is_movie {
        "Movies"
    } else {
        "TV Shows"
    }
}

async fn add_watch(
    registry: &WatchRegistry,
    request: WatchRequest,
    confirmation: Option<String>,
    output: &Output,
) -> Result<()> {
    let key = request.media.key();
    let channel = request.requester_channel.clone();
    let title = request.display_title.clone();

    match registry.submit(request).await.map_err(|e| eyre!("{}", e))? {
        SubmitOutcome::Added => output.success(format!("Watching \"{}\" for channel {}", title, channel)),
        SubmitOutcome::AlreadyTracked => output.info(format!("\"{}\" is already watched for channel {}", title, channel)),
    }

    if let Some(handle) = confirmation {
        registry
            .attach_confirmation(&key, &channel, handle)
            .await
            .map_err(|e| eyre!("{}", e))?;
    }
    Ok(())
}

/// Withdraw the upstream request. Failures are reported, never fatal: the
/// local entry is already gone.
async fn retract_upstream(sources: &SourceSet, request_id: u64, output: &Output) {
    let Some(retractor) = sources.retractor() else {
        output.warn(format!(
            "Request {} was not withdrawn upstream: no catalog source configured",
            request_id
        ));
        return;
    };

    match retractor.retract_request(request_id).await {
        Ok(()) => output.info(format!("Withdrew upstream request {}", request_id)),
        Err(e) => {
            warn!(operation = "retract_request", request_id, error = %e, "Upstream retraction failed");
            output.warn(format!("Could not withdraw upstream request {}: {}", request_id, e));
        }
    }
}

async fn list_watches(registry: &WatchRegistry, output: &Output) -> Result<()> {
    let entries = registry.entries().await.map_err(|e| eyre!("{}", e))?;
    output.data(&json!({ "entries": entries }));

    if entries.is_empty() {
        output.info("Nothing is being watched.");
        return Ok(());
    }
    if !output.is_human() || output.is_quiet() {
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(
        ["Media", "Title", "Channel", "Status", "Last Verdict", "Added"]
            .into_iter()
            .map(|h| Cell::new(h).fg(comfy_table::Color::Cyan).add_attribute(comfy_table::Attribute::Bold)),
    );
    for entry in &entries {
        table.add_row(entry_row(entry));
    }
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    println!("{}", table);
    println!("{} item(s) watched", entries.len());
    Ok(())
}

fn entry_row(entry: &WatchEntry) -> Vec<Cell> {
    let marker = match entry.last_known_status {
        WatchMarker::Pending => "pending".dimmed().to_string(),
        WatchMarker::Checking => "checking".yellow().to_string(),
        WatchMarker::Notified => "notified".green().to_string(),
    };
    let verdict = entry
        .last_verdict
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string());

    vec![
        Cell::new(entry.media.to_string()),
        Cell::new(&entry.display_title),
        Cell::new(&entry.requester_channel),
        Cell::new(marker),
        Cell::new(verdict),
        Cell::new(entry.added_at.format("%Y-%m-%d %H:%M").to_string()),
    ]
}

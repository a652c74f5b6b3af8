use crate::commands::AppContext;
use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use media_watch_core::SweepReport;
use owo_colors::OwoColorize;
use tracing::info;

/// One sweep right now, outside the daemon's timer.
pub async fn run_check(context: AppContext, output: &Output) -> Result<()> {
    let resolver = context.resolver()?;
    let registry = context.registry()?;
    let sweeper = context.sweeper(registry, resolver)?;

    info!(operation = "manual_check", "Running manual sweep");
    let report = sweeper
        .run()
        .await
        .map_err(|e| eyre!("Sweep failed; previous snapshot kept: {}", e))?;

    print_report(&report, output);
    Ok(())
}

fn print_report(report: &SweepReport, output: &Output) {
    output.data(report);
    if report.checked == 0 && report.pruned == 0 {
        output.info("Nothing is being watched.");
        return;
    }

    output.success(format!(
        "Checked {} item(s) in {:.1}s",
        report.checked,
        report.duration.as_secs_f64()
    ));
    output.println(format!("  {} notified", report.notified.to_string().green()));
    output.println(format!("  {} still waiting", report.retained));
    if report.failed > 0 {
        output.warn(format!("{} item(s) could not be checked and were kept", report.failed));
    }
    if report.pruned > 0 {
        output.println(format!("  {} stale entries removed", report.pruned));
    }
}

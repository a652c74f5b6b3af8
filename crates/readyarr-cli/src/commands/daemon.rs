use crate::commands::AppContext;
use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use media_watch_core::Sweeper;
use std::time::Duration;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

/// Timer-driven sweeps over the watch registry.
pub struct Scheduler {
    scheduler: JobScheduler,
    sweeper: Sweeper,
    interval: Duration,
    first_run_delay: Option<Duration>,
}

impl Scheduler {
    pub async fn new(sweeper: Sweeper, interval: Duration, first_run_delay: Option<Duration>) -> Result<Self> {
        let scheduler = JobScheduler::new().await?;
        Ok(Self {
            scheduler,
            sweeper,
            interval,
            first_run_delay,
        })
    }

    /// One timer tick. Ticks that find a sweep in progress are skipped.
    async fn tick(sweeper: Sweeper, trigger: &'static str) {
        info!(operation = "scheduled_sweep_start", trigger, "Starting scheduled sweep");
        match sweeper.try_run().await {
            Some(Ok(report)) => info!(
                operation = "scheduled_sweep_complete",
                trigger,
                checked = report.checked,
                notified = report.notified,
                retained = report.retained,
                failed = report.failed,
                duration_ms = report.duration.as_millis() as u64,
                "Scheduled sweep completed"
            ),
            Some(Err(e)) => error!(
                operation = "scheduled_sweep_error",
                trigger,
                error = %e,
                "Scheduled sweep failed; previous snapshot kept"
            ),
            None => {}
        }
    }

    pub async fn start(&mut self) -> Result<()> {
        let sweeper = self.sweeper.clone();
        let repeated = Job::new_repeated_async(self.interval, move |_id, _scheduler| {
            let sweeper = sweeper.clone();
            Box::pin(Self::tick(sweeper, "interval"))
        })?;
        self.scheduler.add(repeated).await?;

        if let Some(delay) = self.first_run_delay {
            info!(
                operation = "scheduler_startup",
                delay_secs = delay.as_secs(),
                "Startup sweep scheduled"
            );
            let sweeper = self.sweeper.clone();
            let startup = Job::new_one_shot_async(delay, move |_id, _scheduler| {
                let sweeper = sweeper.clone();
                Box::pin(Self::tick(sweeper, "startup"))
            })?;
            self.scheduler.add(startup).await?;
        }

        self.scheduler.start().await?;
        info!(
            operation = "scheduler_started",
            interval_secs = self.interval.as_secs(),
            "Scheduler started"
        );
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.scheduler.shutdown().await?;
        info!(operation = "scheduler_stopped", "Scheduler stopped");
        Ok(())
    }
}

pub async fn run_daemon(
    context: AppContext,
    interval_override: Option<u64>,
    no_startup_check: bool,
    output: &Output,
) -> Result<()> {
    let interval_minutes = interval_override.unwrap_or(context.config.sweep.interval_minutes);
    if interval_minutes == 0 {
        return Err(eyre!("--interval-minutes must be greater than zero"));
    }

    let resolver = context.resolver()?;
    let registry = context.registry()?;
    let tracked = registry.entries().await.map_err(|e| eyre!("{}", e))?.len();
    let sources = resolver.sources().names().join(", ");
    let sweeper = context.sweeper(registry, resolver)?;

    let first_run_delay = (context.config.sweep.run_on_startup && !no_startup_check)
        .then(|| Duration::from_secs(context.config.sweep.first_run_delay_secs));

    let mut scheduler = Scheduler::new(sweeper, Duration::from_secs(interval_minutes * 60), first_run_delay)
        .await
        .map_err(|e| eyre!("Failed to create scheduler: {}", e))?;
    scheduler
        .start()
        .await
        .map_err(|e| eyre!("Failed to start scheduler: {}", e))?;

    output.success(format!(
        "Watching {} item(s) every {} minute(s) using sources: {}",
        tracked,
        interval_minutes,
        if sources.is_empty() { "none" } else { &sources }
    ));
    output.info("Press Ctrl-C to stop.");

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| eyre!("Failed to listen for shutdown signal: {}", e))?;

    info!(operation = "daemon_shutdown", "Shutdown requested");
    scheduler.shutdown().await?;
    output.info("Daemon stopped.");
    Ok(())
}

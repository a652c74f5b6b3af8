use chrono::Utc;
use futures::FutureExt;
use media_watch_models::{MediaRef, NotificationEvent, Verdict, WatchMarker};
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use crate::notify::Notifier;
use crate::registry::{RegistryError, RegistryGuard, WatchRegistry};
use crate::resolver::Resolver;

/// Outcome of one pass over the registry.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    /// Entries resolved this sweep.
    pub checked: usize,
    pub notified: usize,
    /// Not yet available; kept for the next sweep.
    pub retained: usize,
    /// Resolution timed out or panicked; kept unchanged.
    pub failed: usize,
    /// Left over from an interrupted sweep that had already notified them.
    pub pruned: usize,
    pub duration: Duration,
}

/// Re-evaluates every tracked entry and delivers notifications.
#[derive(Clone)]
pub struct Sweeper {
    resolver: Arc<Resolver>,
    registry: WatchRegistry,
    notifier: Arc<dyn Notifier>,
    entry_timeout: Duration,
}

impl Sweeper {
    pub fn new(resolver: Arc<Resolver>, registry: WatchRegistry, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            resolver,
            registry,
            notifier,
            entry_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_entry_timeout(mut self, timeout: Duration) -> Self {
        self.entry_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &WatchRegistry {
        &self.registry
    }

    /// Manual "check now": waits for any running sweep, then runs one.
    pub async fn run(&self) -> Result<SweepReport, RegistryError> {
        let mut guard = self.registry.lock().await?;
        self.sweep(&mut guard).await
    }

    /// Timer tick: returns None without doing anything if a sweep is running,
    /// here or in another process sharing the registry.
    pub async fn try_run(&self) -> Option<Result<SweepReport, RegistryError>> {
        let mut guard = match self.registry.try_lock() {
            Ok(Some(guard)) => guard,
            Ok(None) => {
                info!(operation = "sweep", "Registry busy, skipping this tick");
                return None;
            }
            Err(e) => return Some(Err(e)),
        };
        Some(self.sweep(&mut guard).await)
    }

    async fn sweep(&self, guard: &mut RegistryGuard<'_>) -> Result<SweepReport, RegistryError> {
        let started = Instant::now();
        let mut working = guard.entries().to_vec();
        let mut report = SweepReport::default();

        info!(operation = "sweep", entries = working.len(), "Starting availability sweep");

        for index in 0..working.len() {
            if working[index].already_notified() {
                debug!(media = %working[index].media, "Dropping entry notified by an earlier sweep");
                report.pruned += 1;
                continue;
            }
            report.checked += 1;

            let media = working[index].media.clone();
            let verdict = match self.resolve_entry(&media).await {
                Ok(verdict) => verdict,
                Err(reason) => {
                    warn!(
                        operation = "sweep",
                        media = %media,
                        channel = %working[index].requester_channel,
                        reason = %reason,
                        "Resolution failed, keeping entry for next sweep"
                    );
                    report.failed += 1;
                    continue;
                }
            };

            let entry = &mut working[index];
            entry.last_checked_at = Some(Utc::now());
            entry.last_verdict = Some(verdict.clone());

            if !verdict.is_notify_worthy() {
                entry.last_known_status = WatchMarker::Checking;
                report.retained += 1;
                continue;
            }

            // The marker must be durable before anything is sent
            entry.last_known_status = WatchMarker::Notified;
            let event = NotificationEvent::from_entry(entry, verdict.status);
            if let Err(e) = guard.commit(working.clone()) {
                error!(
                    operation = "sweep",
                    media = %media,
                    error = %e,
                    "Could not persist notified marker; aborting sweep without notifying"
                );
                return Err(e);
            }

            match self.notifier.notify(&event).await {
                Ok(()) => info!(
                    operation = "notify",
                    media = %media,
                    channel = %event.requester_channel,
                    status = %verdict.status,
                    source = %verdict.source,
                    notifier = self.notifier.name(),
                    "Availability notification sent"
                ),
                Err(e) => warn!(
                    operation = "notify",
                    media = %media,
                    channel = %event.requester_channel,
                    error = %e,
                    "Notification delivery failed; entry is retired regardless"
                ),
            }
            report.notified += 1;
        }

        let remaining: Vec<_> = working.into_iter().filter(|e| !e.already_notified()).collect();
        if remaining.as_slice() == guard.entries() {
            debug!(operation = "sweep", "Nothing changed, snapshot left as is");
        } else if let Err(e) = guard.commit(remaining) {
            error!(operation = "sweep", error = %e, "Could not persist sweep result; previous snapshot stays");
            return Err(e);
        }

        report.duration = started.elapsed();
        info!(
            operation = "sweep",
            checked = report.checked,
            notified = report.notified,
            retained = report.retained,
            failed = report.failed,
            pruned = report.pruned,
            duration_ms = report.duration.as_millis() as u64,
            "Availability sweep complete"
        );
        Ok(report)
    }

    /// Resolve one entry, bounding it in time and containing any panic.
    async fn resolve_entry(&self, media: &MediaRef) -> Result<Verdict, String> {
        let resolution = AssertUnwindSafe(self.resolver.resolve(media)).catch_unwind();
        match tokio::time::timeout(self.entry_timeout, resolution).await {
            Ok(Ok(verdict)) => Ok(verdict),
            Ok(Err(_)) => Err("resolution panicked".to_string()),
            Err(_) => Err(format!("timed out after {}s", self.entry_timeout.as_secs_f64())),
        }
    }
}

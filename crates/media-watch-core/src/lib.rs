pub mod notify;
pub mod registry;
pub mod resolver;
pub mod sweep;

#[cfg(test)]
mod testing;

pub use notify::{notifier_from_config, LogNotifier, Notifier, NotifyError, WebhookNotifier};
pub use registry::{JsonSnapshotStore, RegistryError, RegistryGuard, SnapshotStore, StoreLock, SubmitOutcome, WatchRegistry};
pub use resolver::Resolver;
pub use sweep::{SweepReport, Sweeper};

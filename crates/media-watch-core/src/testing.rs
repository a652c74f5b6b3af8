use async_trait::async_trait;
use media_watch_models::{MediaRef, NotificationEvent};
use media_watch_sources::{AvailabilitySource, SourceCheck, SourceError};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use media_watch_models::WatchEntry;
use crate::notify::{Notifier, NotifyError};
use crate::registry::{RegistryError, SnapshotStore};

pub enum Behavior {
    Answer(SourceCheck),
    Fail,
    Panic,
    Hang,
}

/// Scripted source that counts how often it is asked.
pub struct FakeSource {
    name: &'static str,
    behavior: Mutex<Behavior>,
    calls: AtomicUsize,
}

impl FakeSource {
    pub fn new(name: &'static str, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            name,
            behavior: Mutex::new(behavior),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn found(name: &'static str, available: bool, record: Value) -> Arc<Self> {
        Self::new(name, Behavior::Answer(SourceCheck::found(available, record)))
    }

    pub fn unknown(name: &'static str) -> Arc<Self> {
        Self::new(name, Behavior::Answer(SourceCheck::unknown()))
    }

    pub fn set(&self, behavior: Behavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AvailabilitySource for FakeSource {
    fn source_name(&self) -> &str {
        self.name
    }

    async fn lookup(&self, _media: &MediaRef) -> Result<SourceCheck, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let behavior = match &*self.behavior.lock().unwrap() {
            Behavior::Answer(check) => Behavior::Answer(check.clone()),
            Behavior::Fail => Behavior::Fail,
            Behavior::Panic => Behavior::Panic,
            Behavior::Hang => Behavior::Hang,
        };
        match behavior {
            Behavior::Answer(check) => Ok(check),
            Behavior::Fail => Err(SourceError::SourceUnavailable("connection refused".to_string())),
            Behavior::Panic => panic!("source blew up"),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(SourceCheck::unknown())
            }
        }
    }
}

/// Keeps every delivered event; can be told to fail delivery.
#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<NotificationEvent>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    pub fn delivered(&self) -> Vec<NotificationEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn notify(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
        self.events.lock().unwrap().push(event.clone());
        if self.fail {
            return Err(NotifyError::Delivery("chat transport down".to_string()));
        }
        Ok(())
    }
}

/// In-memory snapshot store whose writes can be switched off.
#[derive(Default)]
pub struct FlakyStore {
    broken: AtomicBool,
    saved: Mutex<Vec<WatchEntry>>,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn break_writes(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }

    pub fn repair(&self) {
        self.broken.store(false, Ordering::SeqCst);
    }

    pub fn saved(&self) -> Vec<WatchEntry> {
        self.saved.lock().unwrap().clone()
    }
}

impl SnapshotStore for Arc<FlakyStore> {
    fn load(&self) -> Result<Vec<WatchEntry>, RegistryError> {
        Ok(self.saved())
    }

    fn save(&self, entries: &[WatchEntry]) -> Result<(), RegistryError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(RegistryError::PersistenceFailure {
                path: PathBuf::from("memory"),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            });
        }
        *self.saved.lock().unwrap() = entries.to_vec();
        Ok(())
    }
}

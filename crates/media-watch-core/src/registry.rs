use chrono::Utc;
use media_watch_models::{MediaKey, WatchEntry, WatchRequest};
#[cfg(unix)]
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Failed to persist watch registry to {path}: {source}")]
    PersistenceFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Watch registry snapshot {path} is corrupt: {reason}")]
    CorruptSnapshot { path: PathBuf, reason: String },

    #[error("Failed to lock watch registry: {0}")]
    LockFailure(String),
}

/// Held for as long as a registry guard lives. Dropping it releases the lock.
pub type StoreLock = Box<dyn Send + Sync>;

/// Durable home of the registry snapshot.
pub trait SnapshotStore: Send + Sync {
    /// A store with nothing saved yet loads as empty.
    fn load(&self) -> Result<Vec<WatchEntry>, RegistryError>;

    /// Replace the stored snapshot in full, atomically.
    fn save(&self, entries: &[WatchEntry]) -> Result<(), RegistryError>;

    /// Exclusive lock shared with every other process using the same store.
    /// Blocks until it is free.
    fn lock(&self) -> Result<StoreLock, RegistryError> {
        Ok(Box::new(()))
    }

    /// `None` when another holder has the lock.
    fn try_lock(&self) -> Result<Option<StoreLock>, RegistryError> {
        Ok(Some(Box::new(())))
    }
}

/// Pretty-printed JSON file, written to a temp file and renamed over the old one.
///
/// Writers serialize on an advisory `flock` of `<snapshot>.lock`, so the
/// daemon and one-shot commands never overwrite each other's changes.
pub struct JsonSnapshotStore {
    path: PathBuf,
}

impl JsonSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persistence_failure(&self, source: std::io::Error) -> RegistryError {
        RegistryError::PersistenceFailure {
            path: self.path.clone(),
            source,
        }
    }

    #[cfg(unix)]
    fn lock_file(&self) -> Result<File, RegistryError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.persistence_failure(e))?;
        }
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.path.with_extension("json.lock"))
            .map_err(|e| self.persistence_failure(e))
    }
}

impl SnapshotStore for JsonSnapshotStore {
    fn load(&self) -> Result<Vec<WatchEntry>, RegistryError> {
        if !self.path.exists() {
            debug!(path = ?self.path, "No registry snapshot yet, starting empty");
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| RegistryError::CorruptSnapshot {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).map_err(|e| RegistryError::CorruptSnapshot {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    fn save(&self, entries: &[WatchEntry]) -> Result<(), RegistryError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.persistence_failure(e))?;
        }

        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| self.persistence_failure(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, json).map_err(|e| self.persistence_failure(e))?;
        std::fs::rename(&temp_path, &self.path).map_err(|e| self.persistence_failure(e))?;

        debug!(path = ?self.path, entries = entries.len(), "Saved watch registry");
        Ok(())
    }

    #[cfg(unix)]
    fn lock(&self) -> Result<StoreLock, RegistryError> {
        use nix::fcntl::{Flock, FlockArg};

        let lock = Flock::lock(self.lock_file()?, FlockArg::LockExclusive)
            .map_err(|(_, errno)| self.persistence_failure(errno.into()))?;
        Ok(Box::new(lock))
    }

    #[cfg(unix)]
    fn try_lock(&self) -> Result<Option<StoreLock>, RegistryError> {
        use nix::errno::Errno;
        use nix::fcntl::{Flock, FlockArg};

        match Flock::lock(self.lock_file()?, FlockArg::LockExclusiveNonblock) {
            Ok(lock) => Ok(Some(Box::new(lock))),
            Err((_, errno)) if errno == Errno::EWOULDBLOCK => Ok(None),
            Err((_, errno)) => Err(self.persistence_failure(errno.into())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Added,
    AlreadyTracked,
}

struct RegistryState {
    entries: Vec<WatchEntry>,
    store: Arc<dyn SnapshotStore>,
}

/// The set of items awaiting availability, one entry per (item, requester).
///
/// Every mutation, and every sweep, holds the same lock, so a manual check
/// and the timer can never interleave their read-modify-write of the snapshot.
/// The lock spans processes through the store, and the snapshot is re-read
/// each time it is taken, so changes made by another process are never lost.
#[derive(Clone)]
pub struct WatchRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl WatchRegistry {
    /// Load the snapshot. A corrupt snapshot is an error, never silently replaced.
    pub fn open(store: Box<dyn SnapshotStore>) -> Result<Self, RegistryError> {
        let entries = store.load()?;
        info!(entries = entries.len(), "Watch registry loaded");
        Ok(Self {
            state: Arc::new(Mutex::new(RegistryState {
                entries,
                store: Arc::from(store),
            })),
        })
    }

    pub fn open_file(path: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        Self::open(Box::new(JsonSnapshotStore::new(path)))
    }

    pub async fn submit(&self, request: WatchRequest) -> Result<SubmitOutcome, RegistryError> {
        let mut guard = self.lock().await?;
        let key = request.media.key();
        if guard.find(&key, &request.requester_channel).is_some() {
            debug!(media = %request.media, channel = %request.requester_channel, "Already tracked");
            return Ok(SubmitOutcome::AlreadyTracked);
        }

        let entry = WatchEntry::from_request(request, Utc::now());
        let mut entries = guard.entries().to_vec();
        entries.push(entry.clone());
        guard.commit(entries)?;

        info!(
            operation = "watch_submit",
            media = %entry.media,
            channel = %entry.requester_channel,
            title = %entry.display_title,
            "Now watching for availability"
        );
        Ok(SubmitOutcome::Added)
    }

    /// Remove the entry if present. Cancelling something untracked is a no-op.
    pub async fn cancel(&self, media: &MediaKey, channel: &str) -> Result<Option<WatchEntry>, RegistryError> {
        let mut guard = self.lock().await?;
        let Some(index) = guard.find(media, channel) else {
            debug!(channel, "Nothing to cancel");
            return Ok(None);
        };

        let mut entries = guard.entries().to_vec();
        let removed = entries.remove(index);
        guard.commit(entries)?;

        info!(operation = "watch_cancel", media = %removed.media, channel, "Stopped watching");
        Ok(Some(removed))
    }

    /// Record the acknowledgement message to retire when the notification fires.
    pub async fn attach_confirmation(&self, media: &MediaKey, channel: &str, handle: String) -> Result<bool, RegistryError> {
        let mut guard = self.lock().await?;
        let Some(index) = guard.find(media, channel) else {
            warn!(channel, "No tracked entry to attach confirmation to");
            return Ok(false);
        };

        let mut entries = guard.entries().to_vec();
        entries[index].confirmation_handle = Some(handle);
        guard.commit(entries)?;
        Ok(true)
    }

    /// Current entries, re-read from the store.
    pub async fn entries(&self) -> Result<Vec<WatchEntry>, RegistryError> {
        Ok(self.lock().await?.entries().to_vec())
    }

    /// Wait for exclusive access, then reload the snapshot.
    pub async fn lock(&self) -> Result<RegistryGuard<'_>, RegistryError> {
        let state = self.state.lock().await;
        let store = state.store.clone();
        let file_lock = tokio::task::spawn_blocking(move || store.lock())
            .await
            .map_err(|e| RegistryError::LockFailure(e.to_string()))??;
        RegistryGuard::acquired(state, file_lock)
    }

    /// `Ok(None)` while another holder, in this process or another, is active.
    pub fn try_lock(&self) -> Result<Option<RegistryGuard<'_>>, RegistryError> {
        let Ok(state) = self.state.try_lock() else {
            return Ok(None);
        };
        let Some(file_lock) = state.store.try_lock()? else {
            debug!("Watch registry is locked by another process");
            return Ok(None);
        };
        RegistryGuard::acquired(state, file_lock).map(Some)
    }
}

/// Exclusive access to the registry for the duration of a mutation or sweep.
pub struct RegistryGuard<'a> {
    state: MutexGuard<'a, RegistryState>,
    _file_lock: StoreLock,
}

impl<'a> RegistryGuard<'a> {
    fn acquired(mut state: MutexGuard<'a, RegistryState>, file_lock: StoreLock) -> Result<Self, RegistryError> {
        let entries = state.store.load()?;
        if entries.len() != state.entries.len() {
            debug!(before = state.entries.len(), after = entries.len(), "Watch registry changed on disk");
        }
        state.entries = entries;
        Ok(Self {
            state,
            _file_lock: file_lock,
        })
    }

    pub fn entries(&self) -> &[WatchEntry] {
        &self.state.entries
    }

    fn find(&self, media: &MediaKey, channel: &str) -> Option<usize> {
        self.state.entries.iter().position(|e| e.matches(media, channel))
    }

    /// Persist `entries` and adopt them. On failure the previous snapshot
    /// stays authoritative, both on disk and in memory.
    pub fn commit(&mut self, entries: Vec<WatchEntry>) -> Result<(), RegistryError> {
        self.state.store.save(&entries)?;
        self.state.entries = entries;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FlakyStore;
    use media_watch_models::{MediaRef, WatchMarker};

    fn request(catalog_id: u64, channel: &str) -> WatchRequest {
        WatchRequest {
            media: MediaRef::movie(catalog_id),
            requester_channel: channel.to_string(),
            display_title: "The Matrix (1999)".to_string(),
            library_label: "Movies".to_string(),
            request_id: Some(11),
        }
    }

    #[tokio::test]
    async fn test_submit_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("availability_watch.json");

        let registry = WatchRegistry::open_file(&path).unwrap();
        assert_eq!(registry.submit(request(603, "42")).await.unwrap(), SubmitOutcome::Added);
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());

        let reopened = WatchRegistry::open_file(&path).unwrap();
        let entries = reopened.entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].last_known_status, WatchMarker::Pending);
        assert_eq!(entries[0].request_id, Some(11));
    }

    #[tokio::test]
    async fn test_duplicate_submit_is_already_tracked() {
        let dir = tempfile::tempdir().unwrap();
        let registry = WatchRegistry::open_file(dir.path().join("watch.json")).unwrap();

        registry.submit(request(603, "42")).await.unwrap();
        assert_eq!(registry.submit(request(603, "42")).await.unwrap(), SubmitOutcome::AlreadyTracked);
        assert_eq!(registry.submit(request(603, "43")).await.unwrap(), SubmitOutcome::Added);
        assert_eq!(registry.entries().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let registry = WatchRegistry::open_file(dir.path().join("watch.json")).unwrap();
        registry.submit(request(603, "42")).await.unwrap();

        let key = MediaRef::movie(603).key();
        let removed = registry.cancel(&key, "42").await.unwrap();
        assert_eq!(removed.map(|e| e.request_id), Some(Some(11)));
        assert!(registry.cancel(&key, "42").await.unwrap().is_none());
        assert!(registry.entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_attach_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watch.json");
        let registry = WatchRegistry::open_file(&path).unwrap();
        registry.submit(request(603, "42")).await.unwrap();

        let key = MediaRef::movie(603).key();
        assert!(registry.attach_confirmation(&key, "42", "msg-1".to_string()).await.unwrap());
        assert!(!registry.attach_confirmation(&key, "99", "msg-2".to_string()).await.unwrap());

        let reopened = WatchRegistry::open_file(&path).unwrap();
        assert_eq!(reopened.entries().await.unwrap()[0].confirmation_handle.as_deref(), Some("msg-1"));
    }

    #[test]
    fn test_corrupt_snapshot_is_reported_and_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watch.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = WatchRegistry::open_file(&path);
        assert!(matches!(result, Err(RegistryError::CorruptSnapshot { .. })));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[tokio::test]
    async fn test_failed_write_leaves_registry_unchanged() {
        let store = FlakyStore::new();
        let registry = WatchRegistry::open(Box::new(store.clone())).unwrap();
        registry.submit(request(603, "42")).await.unwrap();

        store.break_writes();
        assert!(registry.submit(request(604, "42")).await.is_err());
        assert_eq!(registry.entries().await.unwrap().len(), 1);
        assert_eq!(store.saved().len(), 1);
    }

    #[tokio::test]
    async fn test_try_lock_fails_while_held() {
        let dir = tempfile::tempdir().unwrap();
        let registry = WatchRegistry::open_file(dir.path().join("watch.json")).unwrap();
        let guard = registry.lock().await.unwrap();
        assert!(registry.try_lock().unwrap().is_none());
        drop(guard);
        assert!(registry.try_lock().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_changes_from_another_registry_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watch.json");
        let daemon = WatchRegistry::open_file(&path).unwrap();
        let cli = WatchRegistry::open_file(&path).unwrap();

        cli.submit(request(604, "42")).await.unwrap();
        daemon.submit(request(603, "42")).await.unwrap();
        assert_eq!(daemon.entries().await.unwrap().len(), 2);

        let key = MediaRef::movie(604).key();
        assert!(daemon.cancel(&key, "42").await.unwrap().is_some());
        assert!(cli.cancel(&key, "42").await.unwrap().is_none());

        let reopened = WatchRegistry::open_file(&path).unwrap();
        let ids: Vec<_> = reopened.entries().await.unwrap().iter().map(|e| e.media.catalog_id).collect();
        assert_eq!(ids, vec![603]);
    }

    #[tokio::test]
    async fn test_file_lock_excludes_other_registries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watch.json");
        let first = WatchRegistry::open_file(&path).unwrap();
        let second = WatchRegistry::open_file(&path).unwrap();

        let guard = first.lock().await.unwrap();
        assert!(path.with_extension("json.lock").exists());
        assert!(second.try_lock().unwrap().is_none());

        let waiting = second.clone();
        let submit = tokio::spawn(async move { waiting.submit(request(603, "42")).await });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!submit.is_finished());

        drop(guard);
        assert_eq!(submit.await.unwrap().unwrap(), SubmitOutcome::Added);
        assert_eq!(first.entries().await.unwrap().len(), 1);
    }
}

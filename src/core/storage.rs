//! Local key/value store with change notifications.
//!
//! The store keeps string values under string keys, the same contract a
//! browser's local storage offers. [`FileStorage`] persists the map as a
//! single JSON object and can report keys rewritten by other processes, which
//! is how a second chat window learns that the transcript it shows is stale.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use directories::ProjectDirs;
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

type Entries = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to access store at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode store contents: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to replace store at {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },

    #[error("Could not determine a data directory for the store")]
    NoDataDir,

    #[error("Session id '{0}' must not contain ':'")]
    InvalidSessionId(String),
}

/// A key changed underneath this process. `new_value` is `None` on removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub new_value: Option<String>,
}

pub trait Storage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

/// Process-local store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<Entries>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.entries().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.entries().keys().cloned().collect())
    }
}

#[derive(Default)]
struct FileState {
    /// Contents as of the last read or write made by this instance.
    observed: Entries,
    /// Foreign changes noticed while preparing a write, not yet reported.
    pending: Vec<StorageEvent>,
}

/// JSON-file backed store. Every write re-reads the file first so keys written
/// by other processes survive; concurrent writers to the same key resolve as
/// last-write-wins.
pub struct FileStorage {
    path: PathBuf,
    state: Mutex<FileState>,
}

impl FileStorage {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let observed = read_entries(&path)?;
        Ok(Self {
            path,
            state: Mutex::new(FileState {
                observed,
                pending: Vec::new(),
            }),
        })
    }

    pub fn open_default() -> Result<Self, StorageError> {
        Self::open(Self::default_path()?)
    }

    pub fn default_path() -> Result<PathBuf, StorageError> {
        let dirs = ProjectDirs::from("org", "nakshatra", "nakshatra").ok_or(StorageError::NoDataDir)?;
        Ok(dirs.data_dir().join("storage.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn state(&self) -> MutexGuard<'_, FileState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Report keys that other writers changed since this instance last looked.
    /// Writes made through this instance are never reported.
    pub fn poll_changes(&self) -> Result<Vec<StorageEvent>, StorageError> {
        // Read under the lock so a concurrent own write cannot look foreign.
        let mut state = self.state();
        let disk = read_entries(&self.path)?;
        let mut events = std::mem::take(&mut state.pending);
        events.extend(diff_entries(&state.observed, &disk));
        state.observed = disk;
        Ok(events)
    }

    fn update<F>(&self, apply: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut Entries),
    {
        let mut state = self.state();
        let mut disk = read_entries(&self.path)?;
        let foreign = diff_entries(&state.observed, &disk);
        state.pending.extend(foreign);

        apply(&mut disk);
        write_entries(&self.path, &disk)?;
        state.observed = disk;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(read_entries(&self.path)?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.update(|entries| {
            entries.remove(key);
        })
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(read_entries(&self.path)?.into_keys().collect())
    }
}

fn read_entries(path: &Path) -> Result<Entries, StorageError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Entries::new()),
        Err(source) => {
            return Err(StorageError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if contents.trim().is_empty() {
        return Ok(Entries::new());
    }

    match serde_json::from_str::<Entries>(&contents) {
        Ok(entries) => Ok(entries),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "store file is malformed; treating it as empty");
            Ok(Entries::new())
        }
    }
}

fn write_entries(path: &Path, entries: &Entries) -> Result<(), StorageError> {
    let io_err = |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    };
    let parent = path.parent().filter(|dir| !dir.as_os_str().is_empty());
    if let Some(dir) = parent {
        fs::create_dir_all(dir).map_err(io_err)?;
    }

    let contents = serde_json::to_string_pretty(entries)?;
    let mut temp_file = match parent {
        Some(dir) => NamedTempFile::new_in(dir),
        None => NamedTempFile::new(),
    }
    .map_err(io_err)?;

    temp_file.write_all(contents.as_bytes()).map_err(io_err)?;
    temp_file.as_file_mut().sync_all().map_err(io_err)?;
    temp_file
        .persist(path)
        .map_err(|source| StorageError::Persist {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(())
}

fn diff_entries(before: &Entries, after: &Entries) -> Vec<StorageEvent> {
    let mut events = Vec::new();
    for (key, value) in after {
        if before.get(key) != Some(value) {
            events.push(StorageEvent {
                key: key.clone(),
                new_value: Some(value.clone()),
            });
        }
    }
    for key in before.keys() {
        if !after.contains_key(key) {
            events.push(StorageEvent {
                key: key.clone(),
                new_value: None,
            });
        }
    }
    events
}

/// Poll `storage` every `interval` and forward foreign changes until `cancel`
/// fires or the receiver goes away.
pub fn spawn_storage_watcher(
    storage: Arc<FileStorage>,
    interval: Duration,
    tx: mpsc::UnboundedSender<StorageEvent>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let events = match storage.poll_changes() {
                        Ok(events) => events,
                        Err(err) => {
                            warn!(error = %err, "store poll failed");
                            continue;
                        }
                    };
                    for event in events {
                        debug!(key = %event.key, "store changed externally");
                        if tx.send(event).is_err() {
                            return;
                        }
                    }
                }
            }
        }
    })
}

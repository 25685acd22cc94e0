//! Snapshot persistence: a single keyed JSON record, like browser local storage.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::Mutex,
};

use thiserror::Error;
use tracing::{debug, warn};

use crate::core::Snapshot;

pub const STORAGE_KEY: &str = "budget_calculator_state_v1";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

pub trait SnapshotStore: Send + Sync {
    fn read_raw(&self) -> Result<Option<String>>;
    fn write_raw(&self, data: &str) -> Result<()>;
}

/// Stores the snapshot as `<dir>/budget_calculator_state_v1.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{STORAGE_KEY}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    tmp.set_extension("json.tmp");
    tmp
}

impl SnapshotStore for JsonFileStore {
    fn read_raw(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&self.path)?))
    }

    fn write_raw(&self, data: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = tmp_path(&self.path);
        let mut file = fs::File::create(&tmp)?;
        file.write_all(data.as_bytes())?;
        file.flush()?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn with_data(data: impl Into<String>) -> Self {
        Self {
            data: Mutex::new(Some(data.into())),
        }
    }
}

impl SnapshotStore for MemoryStore {
    fn read_raw(&self) -> Result<Option<String>> {
        Ok(self
            .data
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }

    fn write_raw(&self, data: &str) -> Result<()> {
        *self
            .data
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(data.to_string());
        Ok(())
    }
}

pub fn persist(store: &dyn SnapshotStore, snapshot: &Snapshot) -> Result<()> {
    let data = serde_json::to_string(snapshot)?;
    store.write_raw(&data)?;
    debug!(bytes = data.len(), "snapshot persisted");
    Ok(())
}

/// Reads the stored snapshot. Missing, unreadable or malformed data all mean
/// "no prior state".
pub fn restore(store: &dyn SnapshotStore) -> Option<Snapshot> {
    let raw = match store.read_raw() {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(err) => {
            warn!(error = %err, "could not read stored snapshot");
            return None;
        }
    };
    match serde_json::from_str::<Snapshot>(&raw) {
        Ok(snapshot) => Some(snapshot.normalized()),
        Err(err) => {
            warn!(error = %err, "discarding malformed stored snapshot");
            None
        }
    }
}

pub fn restore_or_bootstrap(store: &dyn SnapshotStore) -> Snapshot {
    restore(store).unwrap_or_else(|| {
        debug!("no stored snapshot; starting from defaults");
        Snapshot::bootstrap()
    })
}

#![deny(warnings)]

//! Persistence layer: JSON snapshots of the cell store.
//!
//! A snapshot is the serialised [`MemoryStore`]. Reads and writes during a run
//! hit memory only; [`FileStore::save`] writes the whole snapshot atomically.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sim_core::{CellStore, MemoryStore, StoreError};
use thiserror::Error;

/// Where snapshots are saved when no path is given.
pub fn default_store_path() -> &'static Path {
    Path::new("./saves/ascendancy.json")
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot i/o failed for {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("snapshot {path:?} is not valid: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A [`MemoryStore`] bound to a snapshot file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    store: MemoryStore,
}

impl FileStore {
    /// Load `path`, or start empty if it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SnapshotError> {
        let path = path.into();
        let store = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|source| SnapshotError::Json {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no snapshot yet; starting empty");
                MemoryStore::new()
            }
            Err(source) => return Err(SnapshotError::Io { path, source }),
        };
        Ok(Self { path, store })
    }

    /// Wrap an existing store; nothing is read from disk.
    pub fn with_store(path: impl Into<PathBuf>, store: MemoryStore) -> Self {
        Self {
            path: path.into(),
            store,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn into_inner(self) -> MemoryStore {
        self.store
    }

    /// Write the snapshot to a sibling temp file, then rename over the target.
    pub fn save(&self) -> Result<(), SnapshotError> {
        let io_err = |source| SnapshotError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(&self.store).map_err(|source| SnapshotError::Json {
            path: self.path.clone(),
            source,
        })?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        tracing::info!(path = %self.path.display(), "snapshot saved");
        Ok(())
    }
}

impl CellStore for FileStore {
    fn read_value(&self, table: &str, row: &str, column: &str) -> Option<String> {
        self.store.read_value(table, row, column)
    }

    fn write_value(
        &mut self,
        table: &str,
        row: &str,
        column: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        self.store.write_value(table, row, column, value)
    }
}

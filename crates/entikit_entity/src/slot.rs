//! Persistence slots: one named text blob per key.

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{EntityError, Result};

/// Key/value blob storage backing the entity repository.
pub trait SlotStorage {
    /// Read the blob under `key`; `Ok(None)` when the slot was never written.
    fn read_slot(&self, key: &str) -> Result<Option<String>>;

    /// Replace the blob under `key` in a single write.
    fn write_slot(&mut self, key: &str, blob: &str) -> Result<()>;
}

////////////////////////////////////////////////////////////////////////////////
// #region MemorySlotStorage

/// In-process slot storage.
#[derive(Debug, Clone, Default)]
pub struct MemorySlotStorage {
    dict_blob_by_key: BTreeMap<String, String>,
}

impl MemorySlotStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SlotStorage for MemorySlotStorage {
    fn read_slot(&self, key: &str) -> Result<Option<String>> {
        Ok(self.dict_blob_by_key.get(key).cloned())
    }

    fn write_slot(&mut self, key: &str, blob: &str) -> Result<()> {
        self.dict_blob_by_key
            .insert(key.to_string(), blob.to_string());
        Ok(())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FileSlotStorage

/// Directory-backed slot storage: slot `key` lives at `<dir>/<key>.json`.
///
/// Writes land in a temporary file in the same directory and are renamed over
/// the target, so readers see either the previous or the new blob.
#[derive(Debug, Clone)]
pub struct FileSlotStorage {
    path_dir: PathBuf,
}

impl FileSlotStorage {
    /// Bind to `path_dir`. The directory is created on first write.
    pub fn new(path_dir: impl Into<PathBuf>) -> Self {
        Self {
            path_dir: path_dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.path_dir
    }

    /// File path of slot `key`.
    pub fn slot_path(&self, key: &str) -> Result<PathBuf> {
        validate_slot_key(key)?;
        Ok(self.path_dir.join(format!("{key}.json")))
    }
}

impl SlotStorage for FileSlotStorage {
    fn read_slot(&self, key: &str) -> Result<Option<String>> {
        let path_slot = self.slot_path(key)?;
        match fs::read_to_string(&path_slot) {
            Ok(c_blob) => Ok(Some(c_blob)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(EntityError::persistence(format!(
                "Failed to read slot {}: {err}",
                path_slot.display()
            ))),
        }
    }

    fn write_slot(&mut self, key: &str, blob: &str) -> Result<()> {
        let path_slot = self.slot_path(key)?;
        fs::create_dir_all(&self.path_dir).map_err(|err| {
            EntityError::persistence(format!(
                "Failed to create storage directory {}: {err}",
                self.path_dir.display()
            ))
        })?;

        let mut file_tmp = NamedTempFile::new_in(&self.path_dir).map_err(|err| {
            EntityError::persistence(format!("Failed to stage slot {key:?}: {err}"))
        })?;
        file_tmp
            .write_all(blob.as_bytes())
            .and_then(|()| file_tmp.as_file().sync_all())
            .map_err(|err| {
                EntityError::persistence(format!("Failed to write slot {key:?}: {err}"))
            })?;
        file_tmp.persist(&path_slot).map_err(|err| {
            EntityError::persistence(format!(
                "Failed to commit slot {}: {}",
                path_slot.display(),
                err.error
            ))
        })?;

        debug!(slot = key, bytes = blob.len(), "slot written");
        Ok(())
    }
}

fn validate_slot_key(key: &str) -> Result<()> {
    let if_valid = !key.is_empty()
        && key
            .chars()
            .all(|chr| chr.is_ascii_alphanumeric() || matches!(chr, '_' | '-' | '.'))
        && !key.starts_with('.');
    if if_valid {
        Ok(())
    } else {
        Err(EntityError::persistence(format!(
            "Invalid slot key {key:?}: expected [A-Za-z0-9_.-] and no leading dot."
        )))
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

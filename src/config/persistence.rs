//! File-backed key-value store for marklive
//!
//! This module persists the key-value store as a single JSON object in the
//! platform-specific configuration directory, with atomic writes and graceful
//! fallback to an empty store when the file is missing or corrupted.

use super::store::KeyValueStore;
use crate::error::{Error, Result, ResultExt};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Application name used for the config directory
const APP_NAME: &str = "marklive";

/// Store file name
const STORE_FILE_NAME: &str = "storage.json";

/// Temporary file used during atomic writes
const STORE_BACKUP_SUFFIX: &str = "bak";

// ─────────────────────────────────────────────────────────────────────────────
// Platform-Specific Directory Resolution
// ─────────────────────────────────────────────────────────────────────────────

/// Get the platform-specific configuration directory for the application.
///
/// - **Windows**: `%APPDATA%\marklive\`
/// - **macOS**: `~/Library/Application Support/marklive/`
/// - **Linux**: `~/.config/marklive/`
///
/// # Errors
///
/// Returns `Error::ConfigDirNotFound` if the config directory cannot be determined.
pub fn get_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|base| base.join(APP_NAME))
        .ok_or(Error::ConfigDirNotFound)
}

/// Get the full path to the default store file.
pub fn get_store_file_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(STORE_FILE_NAME))
}

// ─────────────────────────────────────────────────────────────────────────────
// JsonFileStore
// ─────────────────────────────────────────────────────────────────────────────

/// Key-value store persisted to a JSON file.
///
/// The whole map is held in memory and rewritten on every change.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Open the store at the default platform location.
    ///
    /// Never fails on a missing or corrupted file; those degrade to an empty store.
    pub fn open_default() -> Result<Self> {
        Ok(Self::open(get_store_file_path()?))
    }

    /// Open the store at a specific path.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load_entries(&path)
            .unwrap_or_warn_default(BTreeMap::new(), "Failed to load stored data");
        Self { path, entries }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the in-memory map to disk.
    ///
    /// Writes to a sibling backup file first, then renames it over the
    /// original so a crash never leaves a half-written store.
    pub fn flush(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                debug!("Creating store directory: {}", dir.display());
                fs::create_dir_all(dir).map_err(|e| Error::ConfigSave {
                    path: dir.to_path_buf(),
                    source: Box::new(e),
                })?;
            }
        }

        let json = serde_json::to_string_pretty(&self.entries).map_err(|e| Error::ConfigSave {
            path: self.path.clone(),
            source: Box::new(e),
        })?;

        let backup_path = self.path.with_extension(STORE_BACKUP_SUFFIX);
        fs::write(&backup_path, &json).map_err(|e| Error::ConfigSave {
            path: backup_path.clone(),
            source: Box::new(e),
        })?;

        fs::rename(&backup_path, &self.path).map_err(|e| Error::ConfigSave {
            path: self.path.clone(),
            source: Box::new(e),
        })?;

        debug!("Store saved to {}", self.path.display());
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if self.entries.get(key).map(String::as_str) == Some(value) {
            return Ok(());
        }
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

/// Read the store file into a map.
fn load_entries(path: &Path) -> Result<BTreeMap<String, String>> {
    if !path.exists() {
        debug!("Store file not found at {}, starting empty", path.display());
        return Ok(BTreeMap::new());
    }

    let contents = fs::read_to_string(path).map_err(|e| Error::ConfigLoad {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;

    if contents.trim().is_empty() {
        debug!("Store file is empty, starting empty");
        return Ok(BTreeMap::new());
    }

    let entries: BTreeMap<String, String> = serde_json::from_str(&contents).map_err(|e| {
        warn!(
            "Store file at {} contains invalid JSON: {}",
            path.display(),
            e
        );
        Error::ConfigParse {
            message: format!("Failed to parse store file: {}", e),
            source: Some(Box::new(e)),
        }
    })?;

    info!(
        "Loaded {} stored entries from {}",
        entries.len(),
        path.display()
    );
    Ok(entries)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

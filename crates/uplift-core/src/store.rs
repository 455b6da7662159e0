//! Key-value persistence port
//!
//! The form remembers its last-used values between sessions, the way a
//! browser page would use local storage. The form state only talks to the
//! [`KeyValueStore`] trait; the concrete store is chosen by the frontend.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::anyhow;

use crate::error::{PlaygroundError, Result};
use crate::input::SlotId;

/// Prefix shared by every key this crate writes
pub const KEY_PREFIX: &str = "uplift-playground.";

/// String-valued storage
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Persisted form fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKey {
    SourceKind(SlotId),
    Text(SlotId),
    Url(SlotId),
    BaseUri,
    OutputFormat,
    Provenance,
}

impl StorageKey {
    pub fn key(&self) -> String {
        let name = match self {
            StorageKey::SourceKind(slot) => format!("{}.type", slot_key(*slot)),
            StorageKey::Text(slot) => format!("{}.text", slot_key(*slot)),
            StorageKey::Url(slot) => format!("{}.url", slot_key(*slot)),
            StorageKey::BaseUri => "base".to_string(),
            StorageKey::OutputFormat => "output".to_string(),
            StorageKey::Provenance => "provenance".to_string(),
        };
        format!("{KEY_PREFIX}{name}")
    }
}

fn slot_key(slot: SlotId) -> &'static str {
    match slot {
        SlotId::Context => "context",
        SlotId::Json => "json",
    }
}

/// In-memory store, for tests and embedders with their own persistence
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON file holding a flat object of string values
///
/// The whole file is read when the store is opened and rewritten on every
/// `set`.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if !path.exists() {
            return Ok(Self {
                path,
                values: BTreeMap::new(),
            });
        }

        let content = fs::read_to_string(&path)?;
        let values = if content.trim().is_empty() {
            BTreeMap::new()
        } else {
            serde_json::from_str(&content).map_err(|e| {
                PlaygroundError::Storage(format!("{} is not a storage file: {}", path.display(), e))
            })?
        };

        Ok(Self { path, values })
    }

    /// `<data dir>/uplift-playground/storage.json`
    pub fn default_path() -> anyhow::Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow!("Could not determine data directory"))?;

        Ok(data_dir.join("uplift-playground").join("storage.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        // Create storage directory if it doesn't exist
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&self.values)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if self.values.get(key).map(String::as_str) == Some(value) {
            return Ok(());
        }
        self.values.insert(key.to_string(), value.to_string());
        self.save()
    }
}

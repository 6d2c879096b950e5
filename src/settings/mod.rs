//! Deployment settings: where storages live and which overrides apply.
//!
//! Handles loading from settings files and environment variables with
//! precedence Env > File > Defaults.

use crate::config::{OverrideMap, OverrideProvider};
use crate::import::DeletePolicy;
use crate::storage::{
    DatabaseStorage, FileStorage, MemoryStorage, StorageBackend, StorageResult,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod loader;

pub use loader::load_settings;

/// Where one collection is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageSettings {
    Memory,
    Database { path: PathBuf },
    Files { dir: PathBuf },
}

impl StorageSettings {
    /// Open the backend for `collection`; relative paths resolve against `base_dir`.
    pub fn open(&self, base_dir: &Path, collection: &str) -> StorageResult<Arc<dyn StorageBackend>> {
        Ok(match self {
            Self::Memory => Arc::new(MemoryStorage::new(collection)),
            Self::Database { path } => {
                Arc::new(DatabaseStorage::open(&base_dir.join(path), collection)?)
            }
            Self::Files { dir } => Arc::new(FileStorage::new(base_dir.join(dir), collection)),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    pub delete: DeletePolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub active: StorageSettings,
    pub staging: StorageSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<StorageSettings>,
    /// Runtime overrides keyed by configuration name.
    pub overrides: OverrideMap,
    pub import: ImportSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            active: StorageSettings::Database { path: PathBuf::from(".config-stage/config.sqlite") },
            staging: StorageSettings::Files { dir: PathBuf::from("config/staging") },
            snapshot: None,
            overrides: OverrideMap::new(),
            import: ImportSettings::default(),
        }
    }
}

impl Settings {
    /// Seed a provider with the configured overrides.
    pub fn override_provider(&self) -> OverrideProvider {
        OverrideProvider::from_map(self.overrides.clone())
    }
}

//! Shared CLI wiring: settings, storages and the factory.

use anyhow::{Context, Result};
use config_stage::settings::{load_settings, Settings};
use config_stage::storage::{
    StorageBackend, ACTIVE_COLLECTION, SNAPSHOT_COLLECTION, STAGING_COLLECTION,
};
use config_stage::{ConfigFactory, ConfigImporter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct CliContext {
    pub settings: Settings,
    pub factory: ConfigFactory,
    pub staging: Arc<dyn StorageBackend>,
    pub snapshot: Option<Arc<dyn StorageBackend>>,
}

impl CliContext {
    pub fn load(settings_path: Option<&Path>) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to resolve current directory")?;
        let base_dir = settings_base_dir(&cwd, settings_path);
        let settings = load_settings(&base_dir, settings_path)?;

        let active = settings
            .active
            .open(&base_dir, ACTIVE_COLLECTION)
            .context("Failed to open active storage")?;
        let staging = settings
            .staging
            .open(&base_dir, STAGING_COLLECTION)
            .context("Failed to open staging storage")?;
        let snapshot = settings
            .snapshot
            .as_ref()
            .map(|s| s.open(&base_dir, SNAPSHOT_COLLECTION))
            .transpose()
            .context("Failed to open snapshot storage")?;

        let overrides = Arc::new(settings.override_provider());
        let factory = ConfigFactory::new(active, overrides);
        Ok(Self { settings, factory, staging, snapshot })
    }

    pub fn importer(&self) -> ConfigImporter {
        let importer = ConfigImporter::new(Arc::clone(&self.staging), self.factory.clone())
            .with_delete_policy(self.settings.import.delete.clone());
        match &self.snapshot {
            Some(snapshot) => importer.with_snapshot(Arc::clone(snapshot)),
            None => importer,
        }
    }
}

/// Relative storage paths resolve against the settings file's directory when
/// one is given explicitly, otherwise against the working directory.
fn settings_base_dir(cwd: &Path, settings_path: Option<&Path>) -> PathBuf {
    settings_path
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| cwd.join(p))
        .unwrap_or_else(|| cwd.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::settings_base_dir;
    use std::path::Path;

    #[test]
    fn base_dir_follows_explicit_settings_file() {
        let cwd = Path::new("/work");
        assert_eq!(settings_base_dir(cwd, None), Path::new("/work"));
        assert_eq!(settings_base_dir(cwd, Some(Path::new("site.toml"))), Path::new("/work"));
        assert_eq!(
            settings_base_dir(cwd, Some(Path::new("deploy/site.toml"))),
            Path::new("/work/deploy")
        );
        assert_eq!(settings_base_dir(cwd, Some(Path::new("/etc/site.toml"))), Path::new("/etc"));
    }
}

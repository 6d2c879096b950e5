//! Config object factory with a per-name cache.

use super::object::{write_state, Config, ObjectState, SharedState};
use super::overrides::OverrideProvider;
use crate::domain::{ConfigName, RawData};
use crate::error::{ConfigError, StorageError};
use crate::storage::StorageBackend;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Whether a config object is built with runtime overrides applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverrideMode {
    Apply,
    Bypass,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    name: String,
    mode: OverrideMode,
}

/// State shared between a factory, its clones, and the objects it produced.
pub(crate) struct FactoryShared {
    pub(crate) storage: Arc<dyn StorageBackend>,
    pub(crate) overrides: Arc<OverrideProvider>,
    cache: RwLock<HashMap<CacheKey, SharedState>>,
}

impl FactoryShared {
    fn cache(&self) -> RwLockReadGuard<'_, HashMap<CacheKey, SharedState>> {
        self.cache.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn cache_mut(&self) -> RwLockWriteGuard<'_, HashMap<CacheKey, SharedState>> {
        self.cache.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Drop every cached entry for `name`, whatever its override mode.
    /// Handles already out keep their data but no longer receive saves.
    pub(crate) fn invalidate(&self, name: &str) {
        let mut cache = self.cache_mut();
        let before = cache.len();
        cache.retain(|key, _| key.name != name);
        if cache.len() != before {
            tracing::debug!(name, "invalidated cached configuration");
        }
    }

    /// Push freshly persisted data, or `None` after a delete, to every live
    /// handle for `name` in both override modes.
    pub(crate) fn publish(&self, name: &str, raw: Option<&RawData>) {
        let cache = self.cache();
        for (_, state) in cache.iter().filter(|(key, _)| key.name == name) {
            *write_state(state) = ObjectState::loaded(raw.cloned());
        }
    }

    fn load(&self, name: &str) -> Result<ObjectState, StorageError> {
        match self.storage.read(name) {
            Ok(raw) => Ok(ObjectState::loaded(Some(raw))),
            Err(e) if e.is_not_found() => Ok(ObjectState::loaded(None)),
            Err(e) => Err(e),
        }
    }
}

/// Entry point producing [`Config`] objects.
///
/// Objects are cached by name and override mode. Saves through any handle,
/// imports and renames update the cached entries in place, so both later
/// [`get`](Self::get) calls and handles already out see the new data.
/// Overrides are never cached; they are read from the provider on access.
#[derive(Clone)]
pub struct ConfigFactory {
    shared: Arc<FactoryShared>,
}

impl ConfigFactory {
    pub fn new(storage: Arc<dyn StorageBackend>, overrides: Arc<OverrideProvider>) -> Self {
        Self {
            shared: Arc::new(FactoryShared {
                storage,
                overrides,
                cache: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// The active storage this factory reads from.
    pub fn storage(&self) -> Arc<dyn StorageBackend> {
        Arc::clone(&self.shared.storage)
    }

    pub fn override_provider(&self) -> &Arc<OverrideProvider> {
        &self.shared.overrides
    }

    /// Load `name` using the current override toggle.
    pub fn get(&self, name: &str) -> Result<Config, ConfigError> {
        self.get_with(name, self.current_mode())
    }

    /// Load `name` with an explicit override mode, independent of the toggle.
    pub fn get_with(&self, name: &str, mode: OverrideMode) -> Result<Config, ConfigError> {
        let name = ConfigName::new(name)?;
        let key = CacheKey { name: name.to_string(), mode };
        let hit = self.shared.cache().get(&key).cloned();
        match hit {
            Some(state) => {
                tracing::trace!(name = %name, ?mode, "config cache hit");
                Ok(self.build(name, mode, state))
            }
            None => self.load_into_cache(name, mode),
        }
    }

    /// Load several objects; names missing from storage are skipped.
    pub fn load_multiple(&self, names: &[&str]) -> Result<Vec<Config>, ConfigError> {
        let mut configs = Vec::with_capacity(names.len());
        for name in names {
            let config = self.get(name)?;
            if !config.is_new() {
                configs.push(config);
            }
        }
        Ok(configs)
    }

    /// Names present in active storage.
    pub fn list_all(&self, prefix: Option<&str>) -> Result<Vec<String>, StorageError> {
        self.shared.storage.list_all(prefix)
    }

    pub fn rename(&self, old: &str, new: &str) -> Result<(), ConfigError> {
        let old = ConfigName::new(old)?;
        let new = ConfigName::new(new)?;
        self.shared.storage.rename(old.as_str(), new.as_str())?;
        self.shared.publish(old.as_str(), None);
        self.refresh(new.as_str())?;
        Ok(())
    }

    /// Re-read `name` from storage and push the result to live handles.
    pub fn refresh(&self, name: &str) -> Result<(), StorageError> {
        let state = self.shared.load(name)?;
        let raw = if state.is_new { None } else { Some(&state.raw) };
        self.shared.publish(name, raw);
        Ok(())
    }

    pub fn overrides_enabled(&self) -> bool {
        self.shared.overrides.is_enabled()
    }

    /// Later [`get`](Self::get) calls return raw objects. Cached entries are
    /// keyed by mode, so nothing needs dropping.
    pub fn disable_overrides(&self) {
        self.set_overrides_enabled(false);
    }

    pub fn enable_overrides(&self) {
        self.set_overrides_enabled(true);
    }

    fn set_overrides_enabled(&self, enabled: bool) {
        self.shared.overrides.set_enabled(enabled);
        tracing::debug!(enabled, "toggled configuration overrides");
    }

    /// Forget cached state for one name.
    pub fn reset(&self, name: &str) {
        self.shared.invalidate(name);
    }

    pub fn clear_cache(&self) {
        self.shared.cache_mut().clear();
    }

    pub(crate) fn publish(&self, name: &str, raw: Option<&RawData>) {
        self.shared.publish(name, raw);
    }

    pub(crate) fn is_cached(&self, name: &str) -> bool {
        self.shared.cache().keys().any(|key| key.name == name)
    }

    fn current_mode(&self) -> OverrideMode {
        if self.shared.overrides.is_enabled() {
            OverrideMode::Apply
        } else {
            OverrideMode::Bypass
        }
    }

    fn load_into_cache(&self, name: ConfigName, mode: OverrideMode) -> Result<Config, ConfigError> {
        let key = CacheKey { name: name.to_string(), mode };
        // Load while holding the write lock so a save cannot publish between
        // the storage read and the insert.
        let mut cache = self.shared.cache_mut();
        let state = match cache.get(&key) {
            Some(state) => Arc::clone(state),
            None => {
                let state: SharedState = Arc::new(RwLock::new(self.shared.load(name.as_str())?));
                cache.insert(key, Arc::clone(&state));
                tracing::debug!(name = %name, ?mode, "loaded configuration");
                state
            }
        };
        drop(cache);
        Ok(self.build(name, mode, state))
    }

    fn build(&self, name: ConfigName, mode: OverrideMode, state: SharedState) -> Config {
        Config::from_parts(name, mode, state, Arc::clone(&self.shared))
    }
}

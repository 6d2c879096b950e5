//! In-memory configuration objects.

use super::factory::{FactoryShared, OverrideMode};
use crate::domain::{clear_path, get_path, merge_deep, set_path, ConfigName, RawData, Value};
use crate::error::StorageError;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Raw data shared by every handle the factory hands out for one name and mode.
#[derive(Debug, Default)]
pub(crate) struct ObjectState {
    pub(crate) raw: RawData,
    pub(crate) is_new: bool,
}

impl ObjectState {
    pub(crate) fn loaded(raw: Option<RawData>) -> Self {
        Self { is_new: raw.is_none(), raw: raw.unwrap_or_default() }
    }
}

pub(crate) type SharedState = Arc<RwLock<ObjectState>>;

pub(crate) fn read_state(state: &SharedState) -> RwLockReadGuard<'_, ObjectState> {
    state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub(crate) fn write_state(state: &SharedState) -> RwLockWriteGuard<'_, ObjectState> {
    state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Handle to one named configuration object.
///
/// Handles obtained from the same factory for the same name and mode share
/// their raw data, and a save through any handle is visible to all of them.
/// Overrides are read from the provider on every access, so the overridden
/// view follows runtime changes. Mutations always target the raw data;
/// overrides are never written back to storage.
#[derive(Clone)]
pub struct Config {
    name: ConfigName,
    mode: OverrideMode,
    state: SharedState,
    shared: Arc<FactoryShared>,
}

impl Config {
    pub(crate) fn from_parts(
        name: ConfigName,
        mode: OverrideMode,
        state: SharedState,
        shared: Arc<FactoryShared>,
    ) -> Self {
        Self { name, mode, state, shared }
    }

    pub fn name(&self) -> &ConfigName {
        &self.name
    }

    /// True until the object has been saved or was found in storage.
    pub fn is_new(&self) -> bool {
        read_state(&self.state).is_new
    }

    pub fn overrides_applied(&self) -> bool {
        self.mode == OverrideMode::Apply
    }

    /// Read a dotted key path from the view this object was loaded with.
    /// Missing keys return `None`; a stored `null` returns `Some(Value::Null)`.
    pub fn get(&self, key: &str) -> Option<Value> {
        get_path(&self.data(), key).cloned()
    }

    /// The whole data as callers should see it.
    pub fn data(&self) -> RawData {
        let overrides = self.overrides();
        let state = read_state(&self.state);
        if overrides.is_empty() {
            state.raw.clone()
        } else {
            merge_deep(&state.raw, &overrides)
        }
    }

    /// The data as it will be persisted, without overrides.
    pub fn get_raw_data(&self) -> RawData {
        read_state(&self.state).raw.clone()
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        set_path(&mut write_state(&self.state).raw, key, value.into());
        self
    }

    pub fn clear(&mut self, key: &str) -> &mut Self {
        clear_path(&mut write_state(&self.state).raw, key);
        self
    }

    /// Replace the raw data entirely.
    pub fn set_data(&mut self, data: RawData) -> &mut Self {
        write_state(&self.state).raw = data;
        self
    }

    /// Deep-merge `data` into the raw data.
    pub fn merge(&mut self, data: &RawData) -> &mut Self {
        let mut state = write_state(&self.state);
        state.raw = merge_deep(&state.raw, data);
        drop(state);
        self
    }

    /// Persist the raw data and publish it to every live handle for this name.
    ///
    /// Storage failures are returned unchanged and leave the object unsaved.
    pub fn save(&mut self) -> Result<&mut Self, StorageError> {
        let raw = self.get_raw_data();
        self.shared.storage.write(self.name.as_str(), &raw)?;
        self.shared.publish(self.name.as_str(), Some(&raw));
        tracing::debug!(
            name = %self.name,
            collection = self.shared.storage.collection(),
            "saved configuration"
        );
        Ok(self)
    }

    /// Remove the object from storage and reset it to an empty, new object.
    pub fn delete(&mut self) -> Result<&mut Self, StorageError> {
        match self.shared.storage.delete(self.name.as_str()) {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }
        self.shared.publish(self.name.as_str(), None);
        tracing::debug!(name = %self.name, "deleted configuration");
        Ok(self)
    }

    /// Discard in-memory changes and re-read storage.
    pub fn reload(&mut self) -> Result<&mut Self, StorageError> {
        let raw = match self.shared.storage.read(self.name.as_str()) {
            Ok(raw) => Some(raw),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };
        *write_state(&self.state) = ObjectState::loaded(raw);
        Ok(self)
    }

    fn overrides(&self) -> RawData {
        match self.mode {
            OverrideMode::Apply => self.shared.overrides.registered(self.name.as_str()),
            OverrideMode::Bypass => RawData::new(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = read_state(&self.state);
        f.debug_struct("Config")
            .field("name", &self.name)
            .field("raw", &state.raw)
            .field("is_new", &state.is_new)
            .field("mode", &self.mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{ConfigFactory, OverrideMode, OverrideProvider};
    use crate::domain::RawData;
    use crate::storage::{MemoryStorage, StorageBackend};
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn raw(value: Value) -> RawData {
        value.as_object().cloned().expect("object literal")
    }

    fn factory() -> (ConfigFactory, Arc<MemoryStorage>, Arc<OverrideProvider>) {
        let storage = Arc::new(MemoryStorage::new("active"));
        let overrides = Arc::new(OverrideProvider::new());
        (ConfigFactory::new(storage.clone(), overrides.clone()), storage, overrides)
    }

    #[test]
    fn new_object_carries_overrides() {
        let (factory, _, overrides) = factory();
        overrides.set_override("config_test.new", "key", "override");
        let config = factory.get("config_test.new").expect("config");
        assert!(config.is_new());
        assert_eq!(config.get("key"), Some(json!("override")));
        assert!(config.get_raw_data().is_empty());
    }

    #[test]
    fn set_keeps_override_consistent_before_save() {
        let (factory, storage, overrides) = factory();
        overrides.set_override("config_test.system", "foo", "overridden");
        let mut config = factory.get("config_test.system").expect("config");
        config.set("foo", "raw").set("other", 1);
        assert_eq!(config.get("foo"), Some(json!("overridden")));
        assert_eq!(config.get("other"), Some(json!(1)));
        assert_eq!(config.get_raw_data().get("foo"), Some(&json!("raw")));
        assert!(!storage.exists("config_test.system").expect("exists"));
    }

    #[test]
    fn save_persists_raw_only() {
        let (factory, storage, overrides) = factory();
        overrides.set_override("config_test.system", "foo", "overridden");
        let mut config = factory.get("config_test.system").expect("config");
        config.set("foo", "bar").save().expect("save");
        assert!(!config.is_new());
        assert_eq!(config.get("foo"), Some(json!("overridden")));
        assert_eq!(
            Value::Object(storage.read("config_test.system").expect("read")),
            json!({"foo": "bar"})
        );
    }

    #[test]
    fn bypass_mode_reads_raw_values() {
        let (factory, _, overrides) = factory();
        overrides.set_override("config_test.system", "foo", "overridden");
        let mut config =
            factory.get_with("config_test.system", OverrideMode::Bypass).expect("config");
        assert!(!config.overrides_applied());
        assert_eq!(config.get("foo"), None);
        config.set("foo", "raw");
        assert_eq!(config.get("foo"), Some(json!("raw")));
    }

    #[test]
    fn clear_merge_and_set_data_edit_raw() {
        let (factory, _, _) = factory();
        let mut config = factory.get("config_test.system").expect("config");
        config.set_data(json!({"a": {"b": 1, "c": 2}}).as_object().cloned().expect("object"));
        config.clear("a.b");
        config.merge(json!({"a": {"d": 3}}).as_object().expect("object"));
        assert_eq!(Value::Object(config.get_raw_data()), json!({"a": {"c": 2, "d": 3}}));
    }

    #[test]
    fn delete_resets_to_new() {
        let (factory, storage, _) = factory();
        let mut config = factory.get("config_test.system").expect("config");
        config.set("foo", "bar").save().expect("save");
        config.delete().expect("delete");
        assert!(config.is_new());
        assert!(config.get_raw_data().is_empty());
        assert!(!storage.exists("config_test.system").expect("exists"));
        assert!(factory.get("config_test.system").expect("config").is_new());
    }

    #[test]
    fn reload_discards_unsaved_changes() {
        let (factory, _, _) = factory();
        let mut config = factory.get("config_test.system").expect("config");
        config.set("foo", "bar").save().expect("save");
        config.set("foo", "changed");
        config.reload().expect("reload");
        assert_eq!(config.get("foo"), Some(json!("bar")));
    }

    #[test]
    fn handles_for_the_same_name_share_saves() {
        let (factory, storage, _) = factory();
        storage.write("config_test.system", &raw(json!({"foo": "bar"}))).expect("write");
        let held = factory.get("config_test.system").expect("config");
        let mut bypass =
            factory.get_with("config_test.system", OverrideMode::Bypass).expect("config");
        bypass.set("foo", "saved").save().expect("save");
        assert_eq!(held.get("foo"), Some(json!("saved")));
        assert!(!held.is_new());
    }

    #[test]
    fn overridden_view_follows_runtime_overrides() {
        let (factory, storage, overrides) = factory();
        storage.write("config_test.system", &raw(json!({"foo": "bar"}))).expect("write");
        let config = factory.get("config_test.system").expect("config");
        assert_eq!(config.get("foo"), Some(json!("bar")));
        overrides.set_override("config_test.system", "foo", "overridden");
        assert_eq!(config.get("foo"), Some(json!("overridden")));
        overrides.clear();
        assert_eq!(config.get("foo"), Some(json!("bar")));
    }
}

//! Runtime override registry.
//!
//! Overrides are supplied by deployment settings, live only in memory and are
//! never written to storage. They may name objects that do not exist yet.

use crate::domain::{set_path, RawData, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Overrides keyed by configuration name.
pub type OverrideMap = BTreeMap<String, RawData>;

#[derive(Debug)]
pub struct OverrideProvider {
    overrides: RwLock<OverrideMap>,
    enabled: AtomicBool,
}

impl Default for OverrideProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl OverrideProvider {
    pub fn new() -> Self {
        Self::from_map(OverrideMap::new())
    }

    pub fn from_map(overrides: OverrideMap) -> Self {
        Self { overrides: RwLock::new(overrides), enabled: AtomicBool::new(true) }
    }

    fn read(&self) -> RwLockReadGuard<'_, OverrideMap> {
        self.overrides.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, OverrideMap> {
        self.overrides.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a single override; `key` may be a dotted path.
    pub fn set_override(&self, name: &str, key: &str, value: impl Into<Value>) {
        let mut overrides = self.write();
        set_path(overrides.entry(name.to_string()).or_default(), key, value.into());
    }

    /// Replace every override registered for `name`.
    pub fn set_overrides(&self, name: &str, data: RawData) {
        self.write().insert(name.to_string(), data);
    }

    pub fn remove(&self, name: &str) -> Option<RawData> {
        self.write().remove(name)
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    /// Overrides for `name`, or an empty mapping when none are registered or
    /// the provider is disabled.
    pub fn get_overrides(&self, name: &str) -> RawData {
        if !self.is_enabled() {
            return RawData::new();
        }
        self.registered(name)
    }

    /// Overrides registered for `name`, regardless of the enable switch.
    pub fn registered(&self, name: &str) -> RawData {
        self.read().get(name).cloned().unwrap_or_default()
    }

    /// Names with at least one registered override.
    pub fn names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }
}

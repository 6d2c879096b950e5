//! In-process storage, used for tests and ephemeral setups.

use super::{not_found, StorageBackend, StorageResult};
use crate::domain::RawData;
use std::collections::BTreeMap;
use std::sync::RwLock;

#[derive(Debug)]
pub struct MemoryStorage {
    collection: String,
    objects: RwLock<BTreeMap<String, RawData>>,
}

impl MemoryStorage {
    pub fn new(collection: impl Into<String>) -> Self {
        Self { collection: collection.into(), objects: RwLock::new(BTreeMap::new()) }
    }

    fn objects(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, RawData>> {
        self.objects.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn objects_mut(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, RawData>> {
        self.objects.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl StorageBackend for MemoryStorage {
    fn collection(&self) -> &str {
        &self.collection
    }

    fn read(&self, name: &str) -> StorageResult<RawData> {
        self.objects().get(name).cloned().ok_or_else(|| not_found(&self.collection, name))
    }

    fn write(&self, name: &str, data: &RawData) -> StorageResult<()> {
        self.objects_mut().insert(name.to_string(), data.clone());
        Ok(())
    }

    fn delete(&self, name: &str) -> StorageResult<()> {
        self.objects_mut().remove(name).map(|_| ()).ok_or_else(|| not_found(&self.collection, name))
    }

    fn exists(&self, name: &str) -> StorageResult<bool> {
        Ok(self.objects().contains_key(name))
    }

    fn list_all(&self, prefix: Option<&str>) -> StorageResult<Vec<String>> {
        let prefix = prefix.unwrap_or("");
        Ok(self.objects().keys().filter(|name| name.starts_with(prefix)).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn raw(value: Value) -> RawData {
        value.as_object().cloned().expect("object literal")
    }

    #[test]
    fn round_trip_keeps_explicit_nulls() {
        let storage = MemoryStorage::new("active");
        let data = raw(json!({"foo": "bar", "baz": null, "404": "herp"}));
        storage.write("config_test.system", &data).expect("write");
        let read = storage.read("config_test.system").expect("read");
        assert_eq!(read, data);
        assert!(read.contains_key("baz"));
    }

    #[test]
    fn missing_names_are_not_found() {
        let storage = MemoryStorage::new("active");
        assert!(storage.read("config_test.none").expect_err("absent").is_not_found());
        assert!(storage.delete("config_test.none").expect_err("absent").is_not_found());
        assert!(!storage.exists("config_test.none").expect("exists"));
    }

    #[test]
    fn list_all_is_sorted_and_filtered() {
        let storage = MemoryStorage::new("active");
        for name in ["system.site", "config_test.b", "config_test.a"] {
            storage.write(name, &RawData::new()).expect("write");
        }
        assert_eq!(
            storage.list_all(None).expect("list"),
            vec!["config_test.a", "config_test.b", "system.site"]
        );
        assert_eq!(
            storage.list_all(Some("config_test.")).expect("list"),
            vec!["config_test.a", "config_test.b"]
        );
    }

    #[test]
    fn read_multiple_skips_missing() {
        let storage = MemoryStorage::new("active");
        storage.write("config_test.a", &raw(json!({"k": 1}))).expect("write");
        let found = storage
            .read_multiple(&["config_test.a".to_string(), "config_test.b".to_string()])
            .expect("read multiple");
        assert_eq!(found.len(), 1);
        assert!(found.contains_key("config_test.a"));
    }

    #[test]
    fn collections_are_isolated() {
        let active = MemoryStorage::new("active");
        let staging = MemoryStorage::new("staging");
        active.write("config_test.a", &RawData::new()).expect("write");
        assert!(!staging.exists("config_test.a").expect("exists"));
        assert_eq!(staging.delete_all(None).expect("delete all"), 0);
    }
}

//! Configuration storage backends.
//!
//! A backend persists [`RawData`] by name within one collection (`active`,
//! `staging`, `snapshot`). Collections never share keys. Backends do not
//! cache; caching belongs to [`ConfigFactory`](crate::config::ConfigFactory).

use crate::domain::RawData;
use crate::error::StorageError;
use std::collections::BTreeMap;

pub mod database;
pub mod file;
pub mod memory;

pub use database::DatabaseStorage;
pub use file::FileStorage;
pub use memory::MemoryStorage;

pub const ACTIVE_COLLECTION: &str = "active";
pub const STAGING_COLLECTION: &str = "staging";
pub const SNAPSHOT_COLLECTION: &str = "snapshot";

pub type StorageResult<T> = Result<T, StorageError>;

pub trait StorageBackend: Send + Sync {
    /// Collection this backend reads and writes.
    fn collection(&self) -> &str;

    /// Read one object. Absent names yield [`StorageError::NotFound`].
    fn read(&self, name: &str) -> StorageResult<RawData>;

    /// Create or overwrite one object.
    fn write(&self, name: &str, data: &RawData) -> StorageResult<()>;

    /// Delete one object. Absent names yield [`StorageError::NotFound`].
    fn delete(&self, name: &str) -> StorageResult<()>;

    /// Names in lexical order, optionally restricted to a prefix.
    fn list_all(&self, prefix: Option<&str>) -> StorageResult<Vec<String>>;

    fn exists(&self, name: &str) -> StorageResult<bool> {
        match self.read(name) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Read several objects at once; names that do not exist are omitted.
    fn read_multiple(&self, names: &[String]) -> StorageResult<BTreeMap<String, RawData>> {
        let mut found = BTreeMap::new();
        for name in names {
            match self.read(name) {
                Ok(data) => {
                    found.insert(name.clone(), data);
                }
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(found)
    }

    /// Delete every object under `prefix` (everything when `None`). Returns the count.
    fn delete_all(&self, prefix: Option<&str>) -> StorageResult<usize> {
        let names = self.list_all(prefix)?;
        for name in &names {
            self.delete(name)?;
        }
        Ok(names.len())
    }

    fn rename(&self, old: &str, new: &str) -> StorageResult<()> {
        let data = self.read(old)?;
        self.write(new, &data)?;
        self.delete(old)
    }
}

pub(crate) fn not_found(collection: &str, name: &str) -> StorageError {
    StorageError::NotFound { collection: collection.to_string(), name: name.to_string() }
}

/// Replace everything in `target` with the content of `source`.
///
/// Used for export (active to staging) and for refreshing the snapshot after
/// an import. Returns the number of objects copied.
pub fn replace_storage_data(
    source: &dyn StorageBackend,
    target: &dyn StorageBackend,
) -> StorageResult<usize> {
    let names = source.list_all(None)?;
    let data = source.read_multiple(&names)?;
    let removed = target.delete_all(None)?;
    for (name, raw) in &data {
        target.write(name, raw)?;
    }
    tracing::debug!(
        source = source.collection(),
        target = target.collection(),
        removed,
        copied = data.len(),
        "replaced storage data"
    );
    Ok(data.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn replace_storage_data_mirrors_source() {
        let source = MemoryStorage::new(ACTIVE_COLLECTION);
        let target = MemoryStorage::new(STAGING_COLLECTION);
        let a = json!({"foo": "bar"}).as_object().cloned().expect("object");
        source.write("config_test.a", &a).expect("write");
        target.write("config_test.stale", &RawData::new()).expect("write");

        let copied = replace_storage_data(&source, &target).expect("replace");
        assert_eq!(copied, 1);
        assert_eq!(target.list_all(None).expect("list"), vec!["config_test.a"]);
        assert_eq!(target.read("config_test.a").expect("read"), a);
    }

    #[test]
    fn default_rename_moves_data() {
        let storage = MemoryStorage::new(ACTIVE_COLLECTION);
        storage.write("config_test.old", &RawData::new()).expect("write");
        storage.rename("config_test.old", "config_test.new").expect("rename");
        assert!(!storage.exists("config_test.old").expect("exists"));
        assert!(storage.exists("config_test.new").expect("exists"));
    }
}

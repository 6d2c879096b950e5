//! Applying a change list to active storage.

use super::comparer::{ChangeList, StorageComparer};
use super::{DeletePolicy, Operation};
use crate::config::ConfigFactory;
use crate::error::{ImportError, ImportFailure, StorageError};
use crate::storage::{replace_storage_data, StorageBackend};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, TryLockError};

/// Outcome of one import run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub deleted: Vec<String>,
    pub unchanged: Vec<String>,
    /// Staged names that are not valid configuration names.
    pub skipped: Vec<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub snapshot_refreshed: bool,
}

impl ImportReport {
    /// Number of successful writes and deletes against active storage.
    pub fn writes(&self) -> usize {
        self.created.len() + self.updated.len() + self.deleted.len()
    }

    fn record(&mut self, name: &str, operation: Operation) {
        let list = match operation {
            Operation::Create => &mut self.created,
            Operation::Update => &mut self.updated,
            Operation::Delete => &mut self.deleted,
        };
        list.push(name.to_string());
    }
}

/// Copies staging data into the active storage behind a [`ConfigFactory`].
///
/// Names are processed independently: a failure on one name is recorded and
/// the rest of the batch still runs. Nothing is rolled back.
pub struct ConfigImporter {
    staging: Arc<dyn StorageBackend>,
    factory: ConfigFactory,
    delete_policy: DeletePolicy,
    snapshot: Option<Arc<dyn StorageBackend>>,
    running: Mutex<()>,
}

impl ConfigImporter {
    pub fn new(staging: Arc<dyn StorageBackend>, factory: ConfigFactory) -> Self {
        Self {
            staging,
            factory,
            delete_policy: DeletePolicy::default(),
            snapshot: None,
            running: Mutex::new(()),
        }
    }

    pub fn with_delete_policy(mut self, policy: DeletePolicy) -> Self {
        self.delete_policy = policy;
        self
    }

    /// Refresh `snapshot` from active storage after every clean import.
    pub fn with_snapshot(mut self, snapshot: Arc<dyn StorageBackend>) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    /// Compare staging with active without writing anything.
    pub fn changelist(&self) -> Result<ChangeList, StorageError> {
        let active = self.factory.storage();
        StorageComparer::new(self.staging.as_ref(), active.as_ref())
            .create_changelist(&self.delete_policy)
    }

    pub fn import(&self) -> Result<ImportReport, ImportError> {
        let _guard = match self.running.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(ImportError::AlreadyImporting),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };

        let mut report = ImportReport { started_at: Some(Utc::now()), ..ImportReport::default() };
        let changes = self.changelist().map_err(ImportError::Compare)?;
        report.unchanged = changes.unchanged.clone();
        report.skipped = changes.invalid.clone();

        let active = self.factory.storage();
        let mut failures = Vec::new();
        for (name, operation) in changes.operations() {
            let staged = changes.staged_data(name);
            let result = match operation {
                Operation::Create | Operation::Update => match staged {
                    Some(data) => active.write(name, data),
                    None => Err(StorageError::Read {
                        collection: self.staging.collection().to_string(),
                        name: name.to_string(),
                        reason: "staged data missing from change list".to_string(),
                    }),
                },
                Operation::Delete => match active.delete(name) {
                    Err(e) if e.is_not_found() => Ok(()),
                    other => other,
                },
            };

            match result {
                Ok(()) => {
                    let published = match operation {
                        Operation::Delete => None,
                        _ => staged,
                    };
                    self.factory.publish(name, published);
                    tracing::debug!(name, %operation, "imported configuration");
                    report.record(name, operation);
                }
                Err(error) => {
                    // The write may still have touched storage; drop cached state.
                    self.factory.reset(name);
                    tracing::warn!(name, %operation, %error, "configuration import failed");
                    failures.push(ImportFailure { name: name.to_string(), operation, error });
                }
            }
        }

        if failures.is_empty() {
            report.snapshot_refreshed = self.refresh_snapshot(active.as_ref());
        }
        report.finished_at = Some(Utc::now());

        tracing::info!(
            created = report.created.len(),
            updated = report.updated.len(),
            deleted = report.deleted.len(),
            unchanged = report.unchanged.len(),
            failed = failures.len(),
            "configuration import finished"
        );

        if failures.is_empty() {
            Ok(report)
        } else {
            Err(ImportError::Failed { failures, report })
        }
    }

    fn refresh_snapshot(&self, active: &dyn StorageBackend) -> bool {
        let Some(snapshot) = &self.snapshot else {
            return false;
        };
        match replace_storage_data(active, snapshot.as_ref()) {
            Ok(_) => true,
            Err(error) => {
                tracing::warn!(%error, "failed to refresh configuration snapshot");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OverrideProvider;
    use crate::domain::RawData;
    use crate::storage::MemoryStorage;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawData {
        value.as_object().cloned().expect("object literal")
    }

    struct Setup {
        staging: Arc<MemoryStorage>,
        active: Arc<MemoryStorage>,
        factory: ConfigFactory,
    }

    fn setup() -> Setup {
        let staging = Arc::new(MemoryStorage::new("staging"));
        let active = Arc::new(MemoryStorage::new("active"));
        let factory = ConfigFactory::new(active.clone(), Arc::new(OverrideProvider::new()));
        Setup { staging, active, factory }
    }

    #[test]
    fn import_creates_and_updates() {
        let s = setup();
        s.active.write("config_test.system", &raw(json!({"foo": "bar"}))).expect("write");
        s.staging.write("config_test.system", &raw(json!({"foo": "barbar"}))).expect("write");
        s.staging.write("config_test.other", &raw(json!({"k": true}))).expect("write");

        let importer = ConfigImporter::new(s.staging.clone(), s.factory.clone());
        let report = importer.import().expect("import");
        assert_eq!(report.created, vec!["config_test.other"]);
        assert_eq!(report.updated, vec!["config_test.system"]);
        assert_eq!(report.writes(), 2);
        assert!(report.started_at.is_some() && report.finished_at.is_some());
        assert!(!report.snapshot_refreshed);
        assert_eq!(
            s.active.read("config_test.system").expect("read"),
            raw(json!({"foo": "barbar"}))
        );
    }

    #[test]
    fn import_updates_cached_objects() {
        let s = setup();
        s.active.write("config_test.system", &raw(json!({"foo": "bar"}))).expect("write");
        s.active.write("config_test.orphan", &raw(json!({"k": 1}))).expect("write");
        let held = s.factory.get("config_test.system").expect("config");
        let orphan = s.factory.get("config_test.orphan").expect("config");

        s.staging.write("config_test.system", &raw(json!({"foo": "barbar"}))).expect("write");
        ConfigImporter::new(s.staging.clone(), s.factory.clone())
            .with_delete_policy(DeletePolicy::All)
            .import()
            .expect("import");
        assert_eq!(held.get("foo"), Some(json!("barbar")));
        assert_eq!(
            s.factory.get("config_test.system").expect("config").get("foo"),
            Some(json!("barbar"))
        );
        assert!(orphan.is_new());
    }

    #[test]
    fn invalid_staged_names_are_skipped() {
        let s = setup();
        s.staging.write("nodot", &raw(json!({"k": 1}))).expect("write");
        s.staging.write("config_test.a", &raw(json!({"v": 1}))).expect("write");

        let report = ConfigImporter::new(s.staging.clone(), s.factory.clone())
            .import()
            .expect("import");
        assert_eq!(report.created, vec!["config_test.a"]);
        assert_eq!(report.skipped, vec!["nodot"]);
        assert!(!s.active.exists("nodot").expect("exists"));
    }

    #[test]
    fn second_import_is_a_no_op() {
        let s = setup();
        s.staging.write("config_test.a", &raw(json!({"v": 1}))).expect("write");
        let importer = ConfigImporter::new(s.staging.clone(), s.factory.clone());
        assert_eq!(importer.import().expect("first").writes(), 1);
        let second = importer.import().expect("second");
        assert_eq!(second.writes(), 0);
        assert_eq!(second.unchanged, vec!["config_test.a"]);
    }

    #[test]
    fn delete_respects_policy() {
        let s = setup();
        s.active.write("config_test.orphan", &RawData::new()).expect("write");
        s.active.write("system.site", &RawData::new()).expect("write");

        let keep = ConfigImporter::new(s.staging.clone(), s.factory.clone());
        assert!(keep.import().expect("import").deleted.is_empty());

        let scoped = ConfigImporter::new(s.staging.clone(), s.factory.clone())
            .with_delete_policy(DeletePolicy::Prefixes(vec!["config_test.".into()]));
        assert_eq!(scoped.import().expect("import").deleted, vec!["config_test.orphan"]);
        assert!(s.active.exists("system.site").expect("exists"));
        assert!(!s.active.exists("config_test.orphan").expect("exists"));
    }

    #[test]
    fn clean_import_refreshes_snapshot() {
        let s = setup();
        let snapshot = Arc::new(MemoryStorage::new("snapshot"));
        s.active.write("system.site", &raw(json!({"name": "x"}))).expect("write");
        s.staging.write("config_test.a", &raw(json!({"v": 1}))).expect("write");

        let report = ConfigImporter::new(s.staging.clone(), s.factory.clone())
            .with_snapshot(snapshot.clone())
            .import()
            .expect("import");
        assert!(report.snapshot_refreshed);
        assert_eq!(snapshot.list_all(None).expect("list"), vec!["config_test.a", "system.site"]);
    }

    #[test]
    fn concurrent_import_is_rejected() {
        let s = setup();
        let importer = ConfigImporter::new(s.staging.clone(), s.factory.clone());
        let _held = importer.running.lock().expect("lock");
        assert!(matches!(importer.import(), Err(ImportError::AlreadyImporting)));
    }
}

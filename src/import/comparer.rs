//! Change detection between a source (staging) and a target (active) storage.

use super::{DeletePolicy, Operation};
use crate::domain::{ConfigName, RawData};
use crate::storage::{StorageBackend, StorageResult};
use serde::Serialize;
use std::collections::BTreeMap;

/// Classified differences, each list in lexical order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChangeList {
    pub create: Vec<String>,
    pub update: Vec<String>,
    pub delete: Vec<String>,
    pub unchanged: Vec<String>,
    /// Source names rejected as configuration names; never imported.
    pub invalid: Vec<String>,
    /// Source data captured at comparison time, written on create and update.
    #[serde(skip)]
    staged: BTreeMap<String, RawData>,
}

impl ChangeList {
    pub fn has_changes(&self) -> bool {
        !(self.create.is_empty() && self.update.is_empty() && self.delete.is_empty())
    }

    /// Names to apply, in the order an import processes them.
    pub fn operations(&self) -> impl Iterator<Item = (&str, Operation)> {
        let create = self.create.iter().map(|n| (n.as_str(), Operation::Create));
        let update = self.update.iter().map(|n| (n.as_str(), Operation::Update));
        let delete = self.delete.iter().map(|n| (n.as_str(), Operation::Delete));
        create.chain(update).chain(delete)
    }

    /// Staged data for a name scheduled for create or update.
    pub fn staged_data(&self, name: &str) -> Option<&RawData> {
        self.staged.get(name)
    }
}

pub struct StorageComparer<'a> {
    source: &'a dyn StorageBackend,
    target: &'a dyn StorageBackend,
}

impl<'a> StorageComparer<'a> {
    pub fn new(source: &'a dyn StorageBackend, target: &'a dyn StorageBackend) -> Self {
        Self { source, target }
    }

    /// Snapshot the source and classify every name against the target.
    ///
    /// All reads happen here, before anything is written.
    pub fn create_changelist(&self, policy: &DeletePolicy) -> StorageResult<ChangeList> {
        let mut changes = ChangeList::default();
        let mut source_names = Vec::new();
        for name in self.source.list_all(None)? {
            match ConfigName::new(&name) {
                Ok(_) => source_names.push(name),
                Err(error) => {
                    tracing::warn!(name, %error, "skipping staged configuration");
                    changes.invalid.push(name);
                }
            }
        }
        let staged = self.source.read_multiple(&source_names)?;
        let current = self.target.read_multiple(&source_names)?;

        for (name, new_data) in &staged {
            match current.get(name) {
                None => changes.create.push(name.clone()),
                Some(old_data) if old_data != new_data => changes.update.push(name.clone()),
                Some(_) => changes.unchanged.push(name.clone()),
            }
        }

        for name in self.target.list_all(None)? {
            if !staged.contains_key(&name) && policy.manages(&name) {
                changes.delete.push(name);
            }
        }

        changes.staged = staged;
        tracing::debug!(
            source = self.source.collection(),
            target = self.target.collection(),
            create = changes.create.len(),
            update = changes.update.len(),
            delete = changes.delete.len(),
            unchanged = changes.unchanged.len(),
            invalid = changes.invalid.len(),
            "compared storages"
        );
        Ok(changes)
    }
}

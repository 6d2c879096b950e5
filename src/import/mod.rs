//! Reconciling staging storage into active storage.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod comparer;
pub mod importer;

pub use comparer::{ChangeList, StorageComparer};
pub use importer::{ConfigImporter, ImportReport};

/// What an import does to one name in active storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which active-only objects an import may delete.
///
/// Objects present in active storage but absent from staging are only removed
/// when the policy manages them; everything else is left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Never delete.
    #[default]
    Keep,
    /// Delete names starting with one of these prefixes.
    Prefixes(Vec<String>),
    /// Delete everything staging lacks.
    All,
}

impl DeletePolicy {
    pub fn manages(&self, name: &str) -> bool {
        match self {
            Self::Keep => false,
            Self::Prefixes(prefixes) => prefixes.iter().any(|p| name.starts_with(p.as_str())),
            Self::All => true,
        }
    }
}

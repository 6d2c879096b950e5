//! Error types for storage, config objects and import.

use crate::import::{ImportReport, Operation};
use std::fmt;

/// Errors raised by [`StorageBackend`](crate::storage::StorageBackend) implementations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("configuration object {name} not found in {collection} storage")]
    NotFound { collection: String, name: String },

    #[error("failed to write {name} to {collection} storage: {reason}")]
    Write { collection: String, name: String, reason: String },

    #[error("failed to read {name} from {collection} storage: {reason}")]
    Read { collection: String, name: String, reason: String },

    #[error("{collection} storage backend error: {message}")]
    Backend { collection: String, message: String },
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Errors raised while loading or saving configuration objects.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// One name that could not be applied during import.
#[derive(Debug)]
pub struct ImportFailure {
    pub name: String,
    pub operation: Operation,
    pub error: StorageError,
}

impl fmt::Display for ImportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name, self.operation, self.error)
    }
}

/// Errors raised by [`ConfigImporter::import`](crate::import::ConfigImporter::import).
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("an import is already in progress")]
    AlreadyImporting,

    /// Reading either storage failed before anything was written.
    #[error("cannot compare staging with active storage: {0}")]
    Compare(#[source] StorageError),

    #[error("import failed for {}", failed_names(.failures))]
    Failed { failures: Vec<ImportFailure>, report: ImportReport },
}

impl ImportError {
    /// Names that failed to apply, in processing order.
    pub fn failed_names(&self) -> Vec<&str> {
        match self {
            Self::Failed { failures, .. } => failures.iter().map(|f| f.name.as_str()).collect(),
            _ => Vec::new(),
        }
    }
}

fn failed_names(failures: &[ImportFailure]) -> String {
    failures.iter().map(|f| f.name.as_str()).collect::<Vec<_>>().join(", ")
}

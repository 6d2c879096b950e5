//! config-stage: layered configuration storage with runtime overrides and
//! staged import.
//!
//! Persisted configuration lives in an *active* [`storage`] collection.
//! [`config::ConfigFactory`] hands out [`config::Config`] objects that show the
//! raw data with runtime overrides superimposed, while writes only ever touch
//! the raw data. [`import::ConfigImporter`] reconciles a *staging* collection
//! into active storage.

pub mod config;
pub mod domain;
pub mod error;
pub mod import;
pub mod settings;
pub mod storage;

pub use config::{Config, ConfigFactory, OverrideMode, OverrideProvider};
pub use domain::{ConfigName, RawData, Value};
pub use error::{ConfigError, ImportError, ImportFailure, StorageError};
pub use import::{ConfigImporter, DeletePolicy, ImportReport};
pub use storage::StorageBackend;

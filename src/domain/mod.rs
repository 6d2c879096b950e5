//! Core domain types shared by storage, config objects and the importer.

pub mod data;
pub mod name;

pub use data::{clear_path, get_path, merge_deep, set_path, RawData};
pub use name::{ConfigName, MAX_NAME_LENGTH};
pub use serde_json::Value;

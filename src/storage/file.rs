//! Directory of YAML files, one `<name>.yml` per configuration object.

use super::{not_found, StorageBackend, StorageResult};
use crate::domain::RawData;
use crate::error::StorageError;
use serde_json::{Map, Number, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const FILE_EXTENSION: &str = "yml";

#[derive(Debug, Clone)]
pub struct FileStorage {
    collection: String,
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>, collection: impl Into<String>) -> Self {
        Self { collection: collection.into(), dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{FILE_EXTENSION}"))
    }

    fn read_error(&self, name: &str, reason: impl std::fmt::Display) -> StorageError {
        StorageError::Read {
            collection: self.collection.clone(),
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }

    fn write_error(&self, name: &str, reason: impl std::fmt::Display) -> StorageError {
        StorageError::Write {
            collection: self.collection.clone(),
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Serialize raw data as YAML.
pub fn encode(data: &RawData) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(data)
}

/// Parse YAML into raw data.
///
/// Hand-written files often carry bare numeric or boolean keys (`404: herp`);
/// those are stringified. An empty document decodes to an empty mapping.
pub fn decode(content: &str) -> Result<RawData, String> {
    let parsed: serde_yaml::Value = serde_yaml::from_str(content).map_err(|e| e.to_string())?;
    match yaml_to_json(parsed)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(RawData::new()),
        other => Err(format!("expected a mapping at the top level, found {other}")),
    }
}

/// Parse a single YAML scalar or structure, e.g. a value typed on the command line.
pub fn parse_value(input: &str) -> Result<Value, String> {
    let parsed: serde_yaml::Value = serde_yaml::from_str(input).map_err(|e| e.to_string())?;
    yaml_to_json(parsed)
}

fn yaml_to_json(value: serde_yaml::Value) -> Result<Value, String> {
    use serde_yaml::Value as Yaml;

    Ok(match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                Value::Number(u.into())
            } else {
                let f = n.as_f64().unwrap_or(f64::NAN);
                Value::Number(
                    Number::from_f64(f).ok_or_else(|| format!("unsupported number {n}"))?,
                )
            }
        }
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => {
            Value::Array(items.into_iter().map(yaml_to_json).collect::<Result<_, _>>()?)
        }
        Yaml::Mapping(mapping) => {
            let mut map = Map::new();
            for (key, value) in mapping {
                map.insert(yaml_key(key)?, yaml_to_json(value)?);
            }
            Value::Object(map)
        }
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

fn yaml_key(key: serde_yaml::Value) -> Result<String, String> {
    use serde_yaml::Value as Yaml;

    match key {
        Yaml::String(s) => Ok(s),
        Yaml::Number(n) => Ok(n.to_string()),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Null => Ok(String::new()),
        other => Err(format!("unsupported mapping key {other:?}")),
    }
}

impl StorageBackend for FileStorage {
    fn collection(&self) -> &str {
        &self.collection
    }

    fn read(&self, name: &str) -> StorageResult<RawData> {
        let content = match fs::read_to_string(self.file_path(name)) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found(&self.collection, name)),
            Err(e) => return Err(self.read_error(name, e)),
        };
        decode(&content).map_err(|e| self.read_error(name, e))
    }

    fn write(&self, name: &str, data: &RawData) -> StorageResult<()> {
        let encoded = encode(data).map_err(|e| self.write_error(name, e))?;
        fs::create_dir_all(&self.dir).map_err(|e| self.write_error(name, e))?;
        fs::write(self.file_path(name), encoded).map_err(|e| self.write_error(name, e))
    }

    fn delete(&self, name: &str) -> StorageResult<()> {
        match fs::remove_file(self.file_path(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(not_found(&self.collection, name)),
            Err(e) => Err(self.write_error(name, e)),
        }
    }

    fn exists(&self, name: &str) -> StorageResult<bool> {
        Ok(self.file_path(name).is_file())
    }

    fn list_all(&self, prefix: Option<&str>) -> StorageResult<Vec<String>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let prefix = prefix.unwrap_or("");
        let suffix = format!(".{FILE_EXTENSION}");

        let mut names = Vec::new();
        for entry in WalkDir::new(&self.dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| StorageError::Backend {
                collection: self.collection.clone(),
                message: e.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(file_name) = entry.file_name().to_str() else {
                continue;
            };
            if let Some(name) = file_name.strip_suffix(&suffix) {
                if name.starts_with(prefix) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

//! Configuration object names.

use crate::error::ConfigError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest name a storage backend is required to accept.
pub const MAX_NAME_LENGTH: usize = 250;

/// Characters that are unsafe in file names or database keys.
static INVALID_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[:?*<>"'/\\]"#).expect("valid name regex"));

/// Validated identifier of a configuration object, e.g. `config_test.system`.
///
/// Names are `owner.object` pairs: at least one dot, no path separators or
/// shell-special characters, and at most [`MAX_NAME_LENGTH`] characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConfigName(String);

impl ConfigName {
    pub fn new(name: impl Into<String>) -> Result<Self, ConfigError> {
        let name = name.into();
        validate(&name)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part before the first dot (the module or component that owns the object).
    pub fn owner(&self) -> &str {
        self.0.split_once('.').map(|(owner, _)| owner).unwrap_or(&self.0)
    }
}

fn validate(name: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if !name.contains('.') {
        return Err(invalid("missing owner prefix (expected `owner.object`)"));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(invalid("name exceeds the maximum length"));
    }
    if INVALID_CHARS.is_match(name) {
        return Err(invalid("name contains a forbidden character"));
    }
    Ok(())
}

impl fmt::Display for ConfigName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ConfigName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ConfigName {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for ConfigName {
    type Error = ConfigError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ConfigName> for String {
    fn from(name: ConfigName) -> Self {
        name.0
    }
}

//! Settings file discovery and loading

use super::Settings;
use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Toml, Yaml};
use figment::Figment;
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "CONFIG_STAGE_";

pub fn load_settings(base_dir: &Path, settings_path: Option<&Path>) -> Result<Settings> {
    let settings_path_provided = settings_path.is_some();

    let discovered = match settings_path {
        Some(path) => {
            if !path.is_file() {
                anyhow::bail!("Settings file not found: {}", path.display());
            }
            Some(path.to_path_buf())
        }
        None => discover_settings(base_dir),
    };

    let Some(settings_file) = discovered else {
        return defaults_with_env();
    };

    let ext =
        settings_file.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();

    let with_file = match ext.as_str() {
        "toml" => defaults().merge(Toml::file(&settings_file)),
        "yaml" | "yml" => defaults().merge(Yaml::file(&settings_file)),
        other => {
            let err = anyhow::anyhow!(
                "Unsupported settings extension '.{}' for file {}",
                other,
                settings_file.display()
            );
            if settings_path_provided {
                return Err(err);
            }
            tracing::warn!("{}", err);
            return defaults_with_env();
        }
    };

    match with_file.merge(env()).extract::<Settings>() {
        Ok(settings) => {
            tracing::debug!(file = %settings_file.display(), "loaded settings");
            Ok(settings)
        }
        Err(e) if settings_path_provided => Err(anyhow::Error::new(e))
            .with_context(|| format!("Invalid settings file: {}", settings_file.display())),
        Err(e) => {
            // Auto-discovered: warn and fall back to defaults.
            tracing::warn!(
                "Failed to parse auto-discovered settings {}: {}",
                settings_file.display(),
                e
            );
            defaults_with_env()
        }
    }
}

fn defaults() -> Figment {
    Figment::from(Serialized::defaults(Settings::default()))
}

fn env() -> Env {
    Env::prefixed(ENV_PREFIX).split("__")
}

fn defaults_with_env() -> Result<Settings> {
    defaults().merge(env()).extract().context("Invalid settings in environment")
}

fn discover_settings(base_dir: &Path) -> Option<PathBuf> {
    let candidates =
        ["config-stage.toml", ".config-stage.toml", "config-stage.yml", "config-stage.yaml"];

    for candidate in candidates {
        let path = base_dir.join(candidate);
        if path.exists() {
            return Some(path);
        }
    }

    None
}

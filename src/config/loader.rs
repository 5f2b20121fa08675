// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{Overrides, RawConfigFile, Settings};
use crate::config::validate::resolve;
use crate::errors::Result;

/// Load a configuration file and return the raw `RawConfigFile`.
///
/// Only TOML deserialization happens here; use [`load_and_validate`] or
/// [`load_settings`] for the validated form.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it on its own.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Settings> {
    let raw_config = load_from_path(&path)?;
    let settings = Settings::try_from(raw_config)?;
    Ok(settings)
}

/// Resolve the settings for a run.
///
/// An explicit `path` must exist. Without one, [`default_config_path`] is
/// used if present and built-in defaults otherwise. `overrides` are applied
/// on top before validation.
pub fn load_settings(path: Option<&Path>, overrides: &Overrides) -> Result<Settings> {
    resolve(load_raw(path)?, overrides)
}

/// The unvalidated file for `path`, with the same lookup as [`load_settings`].
pub fn load_raw(path: Option<&Path>) -> Result<RawConfigFile> {
    match path {
        Some(path) => load_from_path(path),
        None => {
            let default = default_config_path();
            if default.is_file() {
                debug!(path = %default.display(), "using default config file");
                load_from_path(&default)
            } else {
                Ok(RawConfigFile::default())
            }
        }
    }
}

/// `Devloop.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Devloop.toml")
}

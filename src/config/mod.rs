// src/config/mod.rs

//! Configuration loading and validation for devloop.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Merge command-line overrides and validate into [`Settings`] (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_raw, load_settings};
pub use model::{BuildSection, Overrides, RawConfigFile, RunnerSection, Settings, WatchSection};
pub use validate::{parse_duration, resolve};

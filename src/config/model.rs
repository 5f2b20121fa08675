// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::reload::DEFAULT_WATCH_PATTERN;

/// Configuration as read from `Devloop.toml`.
///
/// ```toml
/// [build]
/// target = "server"
/// bin_dir = "bin"
/// generate_dir = "."
///
/// [watch]
/// dir = "."
/// pattern = "\\.vugu$"
/// exclude = ["bin/**"]
///
/// [runner]
/// stop_timeout = "10s"
/// ```
///
/// Every section and key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub build: BuildSection,

    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub runner: RunnerSection,
}

/// `[build]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildSection {
    /// A `.go` file or a package directory. Usually given on the command line.
    #[serde(default)]
    pub target: Option<String>,

    /// Where the executable is written.
    #[serde(default = "default_bin_dir")]
    pub bin_dir: String,

    /// Directory to run `generate` in; empty disables generation.
    #[serde(default = "default_generate_dir")]
    pub generate_dir: String,

    /// Toolchain executable.
    #[serde(default = "default_toolchain")]
    pub toolchain: String,

    /// Arguments for the launched program.
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_bin_dir() -> String {
    "bin".to_string()
}

fn default_generate_dir() -> String {
    ".".to_string()
}

fn default_toolchain() -> String {
    "go".to_string()
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            target: None,
            bin_dir: default_bin_dir(),
            generate_dir: default_generate_dir(),
            toolchain: default_toolchain(),
            args: Vec::new(),
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    #[serde(default = "default_watch_dir")]
    pub dir: String,

    /// Regex matched against the full path of a changed file.
    #[serde(default = "default_pattern")]
    pub pattern: String,

    /// Globs relative to `dir` that never trigger a rebuild.
    #[serde(default)]
    pub exclude: Vec<String>,
}

fn default_watch_dir() -> String {
    ".".to_string()
}

fn default_pattern() -> String {
    DEFAULT_WATCH_PATTERN.to_string()
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            dir: default_watch_dir(),
            pattern: default_pattern(),
            exclude: Vec::new(),
        }
    }
}

/// `[runner]` section. Durations are strings like `"10s"` or `"200ms"`.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerSection {
    #[serde(default = "default_stop_timeout")]
    pub stop_timeout: String,

    #[serde(default = "default_settle_delay")]
    pub settle_delay: String,

    #[serde(default = "default_notify_delay")]
    pub notify_delay: String,
}

fn default_stop_timeout() -> String {
    "10s".to_string()
}

fn default_settle_delay() -> String {
    "1s".to_string()
}

fn default_notify_delay() -> String {
    "200ms".to_string()
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            stop_timeout: default_stop_timeout(),
            settle_delay: default_settle_delay(),
            notify_delay: default_notify_delay(),
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub target: Option<String>,
    pub args: Vec<String>,
    pub bin_dir: Option<String>,
    pub no_generate: bool,
    pub watch_dir: Option<String>,
    pub watch_pattern: Option<String>,
    pub once: bool,
    pub verbose: bool,
}

impl RawConfigFile {
    /// Layer `overrides` on top of the file values.
    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(target) = &overrides.target {
            self.build.target = Some(target.clone());
        }
        if !overrides.args.is_empty() {
            self.build.args = overrides.args.clone();
        }
        if let Some(bin_dir) = &overrides.bin_dir {
            self.build.bin_dir = bin_dir.clone();
        }
        if overrides.no_generate {
            self.build.generate_dir.clear();
        }
        if let Some(dir) = &overrides.watch_dir {
            self.watch.dir = dir.clone();
        }
        if let Some(pattern) = &overrides.watch_pattern {
            self.watch.pattern = pattern.clone();
        }
    }
}

/// Validated settings the rest of the program runs on.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub target: String,
    pub args: Vec<String>,
    pub bin_dir: PathBuf,
    /// `None` disables the generate step.
    pub generate_dir: Option<PathBuf>,
    pub toolchain: PathBuf,
    /// `None` only when running once.
    pub watch_dir: Option<PathBuf>,
    pub watch_pattern: String,
    pub exclude: Vec<String>,
    pub stop_timeout: Duration,
    pub settle_delay: Duration,
    pub notify_delay: Duration,
    pub once: bool,
    pub verbose: bool,
}

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use devloop::config::Settings;
use devloop::reload::DEFAULT_WATCH_PATTERN;

/// Builder for `Settings` with test-friendly defaults: run once, no
/// generate step, short timeouts.
pub struct SettingsBuilder {
    settings: Settings,
}

impl SettingsBuilder {
    pub fn new(target: &str) -> Self {
        Self {
            settings: Settings {
                target: target.to_string(),
                args: Vec::new(),
                bin_dir: PathBuf::from("bin"),
                generate_dir: None,
                toolchain: PathBuf::from("go"),
                watch_dir: None,
                watch_pattern: DEFAULT_WATCH_PATTERN.to_string(),
                exclude: Vec::new(),
                stop_timeout: Duration::from_secs(2),
                settle_delay: Duration::from_millis(50),
                notify_delay: Duration::from_millis(10),
                once: true,
                verbose: false,
            },
        }
    }

    pub fn toolchain(mut self, tool: impl AsRef<Path>) -> Self {
        self.settings.toolchain = tool.as_ref().to_path_buf();
        self
    }

    pub fn bin_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.settings.bin_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn generate_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.settings.generate_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Enable watching (turns off run-once).
    pub fn watch_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.settings.watch_dir = Some(dir.as_ref().to_path_buf());
        self.settings.once = false;
        self
    }

    pub fn watch_pattern(mut self, pattern: &str) -> Self {
        self.settings.watch_pattern = pattern.to_string();
        self
    }

    pub fn exclude(mut self, glob: &str) -> Self {
        self.settings.exclude.push(glob.to_string());
        self
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.settings.args.push(arg.to_string());
        self
    }

    pub fn stop_timeout(mut self, timeout: Duration) -> Self {
        self.settings.stop_timeout = timeout;
        self
    }

    pub fn build(self) -> Settings {
        self.settings
    }
}

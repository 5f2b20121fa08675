// src/config/validate.rs

use std::path::PathBuf;
use std::time::Duration;

use globset::Glob;
use regex::Regex;

use crate::config::model::{Overrides, RawConfigFile, Settings};
use crate::errors::{DevloopError, Result};

impl TryFrom<RawConfigFile> for Settings {
    type Error = DevloopError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        resolve(raw, &Overrides::default())
    }
}

/// Apply `overrides` to `raw` and validate the result.
pub fn resolve(mut raw: RawConfigFile, overrides: &Overrides) -> Result<Settings> {
    raw.apply_overrides(overrides);

    let target = validate_target(&raw)?;
    validate_watch(&raw, overrides.once)?;

    let toolchain = raw.build.toolchain.trim();
    if toolchain.is_empty() {
        return Err(DevloopError::ConfigError(
            "[build].toolchain must not be empty".to_string(),
        ));
    }

    let watch_dir = if overrides.once {
        None
    } else {
        Some(PathBuf::from(&raw.watch.dir))
    };

    Ok(Settings {
        target,
        args: raw.build.args,
        bin_dir: PathBuf::from(&raw.build.bin_dir),
        generate_dir: non_empty(&raw.build.generate_dir).map(PathBuf::from),
        toolchain: PathBuf::from(toolchain),
        watch_dir,
        watch_pattern: raw.watch.pattern,
        exclude: raw.watch.exclude,
        stop_timeout: duration_field("stop_timeout", &raw.runner.stop_timeout)?,
        settle_delay: duration_field("settle_delay", &raw.runner.settle_delay)?,
        notify_delay: duration_field("notify_delay", &raw.runner.notify_delay)?,
        once: overrides.once,
        verbose: overrides.verbose,
    })
}

fn validate_target(raw: &RawConfigFile) -> Result<String> {
    match raw.build.target.as_deref().and_then(non_empty) {
        Some(target) => Ok(target.to_string()),
        None => Err(DevloopError::ConfigError(
            "you must provide something to run, either the path to the main package or a .go file"
                .to_string(),
        )),
    }
}

fn validate_watch(raw: &RawConfigFile, once: bool) -> Result<()> {
    if !once && non_empty(&raw.watch.dir).is_none() {
        return Err(DevloopError::ConfigError(
            "you must specify a watch dir in order to watch".to_string(),
        ));
    }

    Regex::new(&raw.watch.pattern).map_err(|e| {
        DevloopError::ConfigError(format!(
            "invalid watch pattern '{}': {}",
            raw.watch.pattern, e
        ))
    })?;

    for pat in &raw.watch.exclude {
        Glob::new(pat).map_err(|e| {
            DevloopError::ConfigError(format!("invalid exclude glob '{}': {}", pat, e))
        })?;
    }
    Ok(())
}

fn duration_field(name: &str, value: &str) -> Result<Duration> {
    parse_duration(value)
        .map_err(|e| DevloopError::ConfigError(format!("[runner].{name}: {e}")))
}

fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

/// Parse `<n>ms`, `<n>s`, `<n>m` or `<n>h`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| format!("duration '{s}' missing unit suffix"))?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;

    let secs_per_unit = match unit_part.trim().to_lowercase().as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        unit => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ));
        }
    };
    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{s}' is too large"))
}

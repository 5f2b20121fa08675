// src/reload/filter.rs

use std::fmt;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;

use crate::errors::{DevloopError, Result};
use crate::watch::{FsEvent, FsOp};

/// Default filename pattern: Vugu component files.
pub const DEFAULT_WATCH_PATTERN: &str = r"\.vugu$";

/// Decides which filesystem events are relevant to a rebuild.
///
/// An event passes when its kind is create/write/remove, its full path
/// matches the filename regex, and it is not covered by an exclude glob.
/// Exclude globs are matched against the path relative to the watch root.
#[derive(Clone)]
pub struct WatchFilter {
    pattern: Regex,
    root: Option<PathBuf>,
    exclude: Option<GlobSet>,
}

impl fmt::Debug for WatchFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchFilter")
            .field("pattern", &self.pattern.as_str())
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl WatchFilter {
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|e| {
            DevloopError::ConfigError(format!("invalid watch pattern {pattern:?}: {e}"))
        })?;
        Ok(Self {
            pattern,
            root: None,
            exclude: None,
        })
    }

    /// Ignore paths under `root` matching any of `globs`.
    pub fn with_excludes(mut self, root: impl Into<PathBuf>, globs: &[String]) -> Result<Self> {
        if globs.is_empty() {
            return Ok(self);
        }
        self.root = Some(root.into());
        self.exclude = Some(build_globset(globs)?);
        Ok(self)
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Only these operations can trigger a rebuild.
    pub fn kind_qualifies(op: FsOp) -> bool {
        matches!(op, FsOp::Create | FsOp::Write | FsOp::Remove)
    }

    pub fn accepts(&self, event: &FsEvent) -> bool {
        Self::kind_qualifies(event.op)
            && self.pattern.is_match(&event.path.to_string_lossy())
            && !self.excluded(&event.path)
    }

    fn excluded(&self, path: &Path) -> bool {
        let (Some(root), Some(exclude)) = (&self.root, &self.exclude) else {
            return false;
        };
        match path.strip_prefix(root) {
            Ok(rel) => exclude.is_match(rel.to_string_lossy().replace('\\', "/")),
            Err(_) => false,
        }
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).map_err(|e| {
            DevloopError::ConfigError(format!("invalid exclude glob {pat:?}: {e}"))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| DevloopError::ConfigError(format!("building exclude globs: {e}")))
}

// src/reload/debounce.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;

/// Last seen modification time per path.
///
/// Platforms often report several writes for one save, and the build's own
/// output generates more. Only a strictly newer mtime counts as a change.
#[derive(Debug, Default)]
pub struct ModTimeCache {
    times: HashMap<PathBuf, SystemTime>,
}

impl ModTimeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `modified` for `path` and report whether it is strictly newer
    /// than what was recorded before. Unknown paths count as epoch.
    pub fn observe(&mut self, path: &Path, modified: SystemTime) -> bool {
        let previous = self
            .times
            .insert(path.to_path_buf(), modified)
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let advanced = modified > previous;
        if !advanced {
            debug!(path = %path.display(), "modification time did not advance");
        }
        advanced
    }

    pub fn get(&self, path: &Path) -> Option<SystemTime> {
        self.times.get(path).copied()
    }
}

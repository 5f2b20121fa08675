// src/watch/roots.rs

use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Ordered set of registered watch roots, safe to share across tasks.
///
/// Callers never see the lock: writers are `insert` / `remove_exact`, the
/// interception task only ever calls `covers`.
#[derive(Debug, Default)]
pub struct WatchRoots {
    roots: RwLock<Vec<PathBuf>>,
}

impl WatchRoots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a root. Duplicates are kept; callers must not double-add.
    pub fn insert(&self, root: PathBuf) {
        let mut roots = self.roots.write().unwrap_or_else(|p| p.into_inner());
        roots.push(root);
    }

    /// Remove the first root equal to `root`. Sub-paths do not match.
    pub fn remove_exact(&self, root: &Path) -> bool {
        let mut roots = self.roots.write().unwrap_or_else(|p| p.into_inner());
        match roots.iter().position(|r| r == root) {
            Some(idx) => {
                roots.remove(idx);
                true
            }
            None => false,
        }
    }

    /// True if `path` equals or lies beneath any registered root.
    ///
    /// Containment is per path component, so `/w/ab` is not under `/w/a`.
    pub fn covers(&self, path: &Path) -> bool {
        let roots = self.roots.read().unwrap_or_else(|p| p.into_inner());
        roots.iter().any(|root| path.starts_with(root))
    }

    pub fn snapshot(&self) -> Vec<PathBuf> {
        self.roots
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

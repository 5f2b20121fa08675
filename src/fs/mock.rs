// src/fs/mock.rs

use super::{FileMeta, FileSystem};
use anyhow::{Result, anyhow};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

#[derive(Debug, Clone)]
pub enum MockEntry {
    File { modified: SystemTime },
    Dir { modified: SystemTime },
}

impl MockEntry {
    fn meta(&self) -> FileMeta {
        match *self {
            MockEntry::File { modified } => FileMeta {
                is_dir: false,
                modified,
            },
            MockEntry::Dir { modified } => FileMeta {
                is_dir: true,
                modified,
            },
        }
    }
}

/// In-memory filesystem with controllable modification times.
///
/// Paths are stored verbatim; tests are expected to use absolute paths.
/// Adding an entry implicitly creates its parent directories.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<BTreeMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, modified: SystemTime) {
        let path = path.as_ref();
        let mut entries = self.entries.lock().unwrap();
        Self::ensure_parents(&mut entries, path);
        entries.insert(path.to_path_buf(), MockEntry::File { modified });
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut entries = self.entries.lock().unwrap();
        Self::ensure_parents(&mut entries, path);
        entries.insert(
            path.to_path_buf(),
            MockEntry::Dir {
                modified: SystemTime::UNIX_EPOCH,
            },
        );
    }

    /// Change the modification time of an existing entry.
    pub fn touch(&self, path: impl AsRef<Path>, modified: SystemTime) {
        let mut entries = self.entries.lock().unwrap();
        match entries.get_mut(path.as_ref()) {
            Some(MockEntry::File { modified: m }) | Some(MockEntry::Dir { modified: m }) => {
                *m = modified;
            }
            None => {}
        }
    }

    /// Remove an entry and everything beneath it.
    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|p, _| !p.starts_with(path));
    }

    fn ensure_parents(entries: &mut BTreeMap<PathBuf, MockEntry>, path: &Path) {
        for ancestor in path.ancestors().skip(1) {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            entries
                .entry(ancestor.to_path_buf())
                .or_insert(MockEntry::Dir {
                    modified: SystemTime::UNIX_EPOCH,
                });
        }
    }
}

impl FileSystem for MockFileSystem {
    fn metadata(&self, path: &Path) -> Result<FileMeta> {
        let entries = self.entries.lock().unwrap();
        entries
            .get(path)
            .map(MockEntry::meta)
            .ok_or_else(|| anyhow!("File not found: {:?}", path))
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        // Paths are already absolute in tests; only existence matters.
        let entries = self.entries.lock().unwrap();
        if entries.contains_key(path) {
            Ok(path.to_path_buf())
        } else {
            Err(anyhow!("File not found: {:?}", path))
        }
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let entries = self.entries.lock().unwrap();
        match entries.get(path) {
            Some(MockEntry::Dir { .. }) => Ok(entries
                .keys()
                .filter(|p| p.parent() == Some(path))
                .cloned()
                .collect()),
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}

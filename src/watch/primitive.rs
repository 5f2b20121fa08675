// src/watch/primitive.rs

//! The single-level directory watch primitive.
//!
//! [`RecursiveWatcher`](super::RecursiveWatcher) only ever asks this layer to
//! watch or unwatch one directory at a time and builds subtree coverage on
//! top of it.

use std::path::Path;

use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::errors::{DevloopError, Result};
use crate::watch::event::FsEvent;

/// Capacity of the forwarded event and error channels.
pub const EVENT_BUFFER: usize = 64;

/// What the primitive reports: one flattened event or a watcher-level error.
pub type RawEvent = std::result::Result<FsEvent, notify::Error>;

/// Watches individual directories, never their subtrees.
pub trait DirWatch: Send + 'static {
    fn watch(&mut self, dir: &Path) -> Result<()>;

    /// Returns `Ok(false)` if `dir` had no active watch.
    fn unwatch(&mut self, dir: &Path) -> Result<bool>;
}

/// `notify`-backed primitive: every directory is a `NonRecursive` watch.
pub struct NotifyDirWatch {
    inner: RecommendedWatcher,
}

impl std::fmt::Debug for NotifyDirWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyDirWatch").finish()
    }
}

impl NotifyDirWatch {
    /// Create the primitive and the channel its events are delivered on.
    ///
    /// The notify callback runs on notify's event-loop thread, which also
    /// services `watch`/`unwatch`. It must never wait on the reader, so the
    /// raw channel is unbounded; backpressure applies at the forwarded
    /// channel instead.
    pub fn new() -> Result<(Self, mpsc::UnboundedReceiver<RawEvent>)> {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel::<RawEvent>();

        let inner = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    for fs_event in FsEvent::from_notify(event) {
                        if raw_tx.send(Ok(fs_event)).is_err() {
                            // Receiver gone: the watcher is shutting down.
                            return;
                        }
                    }
                }
                Err(err) => {
                    let _ = raw_tx.send(Err(err));
                }
            },
            Config::default(),
        )?;

        Ok((Self { inner }, raw_rx))
    }
}

impl DirWatch for NotifyDirWatch {
    fn watch(&mut self, dir: &Path) -> Result<()> {
        self.inner.watch(dir, RecursiveMode::NonRecursive)?;
        Ok(())
    }

    fn unwatch(&mut self, dir: &Path) -> Result<bool> {
        match self.inner.unwatch(dir) {
            Ok(()) => Ok(true),
            Err(err) if matches!(err.kind, notify::ErrorKind::WatchNotFound) => Ok(false),
            Err(err) => Err(DevloopError::WatchError(err)),
        }
    }
}

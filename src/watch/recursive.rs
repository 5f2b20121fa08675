// src/watch/recursive.rs

//! Recursive subtree watching on top of a single-level primitive.
//!
//! Every raw event passes through an interception step before it is
//! forwarded: newly created directories under a registered root get their
//! own watch, removed ones lose it. Everything is forwarded unchanged.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::{DevloopError, Result};
use crate::fs::{FileSystem, RealFileSystem, walk_dirs};
use crate::watch::event::{FsEvent, FsOp};
use crate::watch::primitive::{DirWatch, EVENT_BUFFER, NotifyDirWatch, RawEvent};
use crate::watch::roots::WatchRoots;

/// The two output sequences of a [`RecursiveWatcher`].
///
/// Both end once the watcher is closed or dropped.
#[derive(Debug)]
pub struct WatchStreams {
    pub events: mpsc::Receiver<FsEvent>,
    pub errors: mpsc::Receiver<notify::Error>,
}

/// Emulates recursive watching with one watch per directory.
///
/// Dropping the watcher stops the interception task; [`close`](Self::close)
/// does the same and waits for it to finish.
pub struct RecursiveWatcher<W: DirWatch = NotifyDirWatch> {
    primitive: Arc<Mutex<W>>,
    roots: Arc<WatchRoots>,
    fs: Arc<dyn FileSystem>,
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl<W: DirWatch> std::fmt::Debug for RecursiveWatcher<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecursiveWatcher")
            .field("roots", &self.roots)
            .finish_non_exhaustive()
    }
}

impl RecursiveWatcher<NotifyDirWatch> {
    /// Create a watcher backed by the platform's `notify` implementation.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new() -> Result<(Self, WatchStreams)> {
        let (primitive, raw_rx) = NotifyDirWatch::new()?;
        Ok(Self::with_primitive(
            primitive,
            raw_rx,
            Arc::new(RealFileSystem),
        ))
    }
}

impl<W: DirWatch> RecursiveWatcher<W> {
    /// Wrap an arbitrary primitive whose events arrive on `raw_rx`.
    pub fn with_primitive(
        primitive: W,
        raw_rx: mpsc::UnboundedReceiver<RawEvent>,
        fs: Arc<dyn FileSystem>,
    ) -> (Self, WatchStreams) {
        let primitive = Arc::new(Mutex::new(primitive));
        let roots = Arc::new(WatchRoots::new());

        let (events_tx, events_rx) = mpsc::channel::<FsEvent>(EVENT_BUFFER);
        let (errors_tx, errors_rx) = mpsc::channel::<notify::Error>(EVENT_BUFFER);
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(intercept_loop(
            raw_rx,
            events_tx,
            errors_tx,
            stop_rx,
            Arc::clone(&primitive),
            Arc::clone(&roots),
            Arc::clone(&fs),
        ));

        let watcher = Self {
            primitive,
            roots,
            fs,
            stop_tx,
            task,
        };
        let streams = WatchStreams {
            events: events_rx,
            errors: errors_rx,
        };
        (watcher, streams)
    }

    /// Watch `path` and every directory beneath it.
    ///
    /// Fails if `path` does not exist or is not a directory. Adding the same
    /// root twice registers it twice.
    pub fn add_recursive(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let meta = self.fs.metadata(path)?;
        if !meta.is_dir {
            return Err(DevloopError::NotADirectory(path.to_path_buf()));
        }

        let root = self.fs.canonicalize(path)?;
        self.roots.insert(root.clone());

        let dirs = walk_dirs(self.fs.as_ref(), &root)?;
        let mut primitive = self.lock_primitive();
        for dir in &dirs {
            debug!(dir = ?dir, "adding directory watch");
            primitive.watch(dir)?;
        }

        info!(root = ?root, dirs = dirs.len(), "recursive watch added");
        Ok(())
    }

    /// Reverse [`add_recursive`](Self::add_recursive) for an exact root.
    ///
    /// Directories that exist now but were never individually watched are
    /// skipped.
    pub fn remove_recursive(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let root = match self.fs.canonicalize(path) {
            Ok(p) => p,
            Err(_) => std::path::absolute(path)?,
        };

        if !self.roots.remove_exact(&root) {
            return Err(DevloopError::WatchRootNotFound(path.to_path_buf()));
        }

        let dirs = if self.fs.is_dir(&root) {
            walk_dirs(self.fs.as_ref(), &root)?
        } else {
            vec![root.clone()]
        };

        let mut primitive = self.lock_primitive();
        let mut removed = 0usize;
        for dir in &dirs {
            if primitive.unwatch(dir)? {
                removed += 1;
            } else {
                debug!(dir = ?dir, "directory was not watched; skipping");
            }
        }

        info!(root = ?root, removed, "recursive watch removed");
        Ok(())
    }

    /// Currently registered roots, in registration order.
    pub fn watch_roots(&self) -> Vec<PathBuf> {
        self.roots.snapshot()
    }

    /// Stop the interception task and release the primitive.
    pub async fn close(self) -> Result<()> {
        let Self {
            primitive,
            stop_tx,
            task,
            ..
        } = self;

        let _ = stop_tx.send(());
        task.await
            .map_err(|e| DevloopError::Internal(format!("watcher task failed: {e}")))?;
        drop(primitive);

        debug!("recursive watcher closed");
        Ok(())
    }

    fn lock_primitive(&self) -> MutexGuard<'_, W> {
        self.primitive.lock().unwrap_or_else(|p| p.into_inner())
    }
}

async fn intercept_loop<W: DirWatch>(
    mut raw_rx: mpsc::UnboundedReceiver<RawEvent>,
    events_tx: mpsc::Sender<FsEvent>,
    errors_tx: mpsc::Sender<notify::Error>,
    mut stop_rx: oneshot::Receiver<()>,
    primitive: Arc<Mutex<W>>,
    roots: Arc<WatchRoots>,
    fs: Arc<dyn FileSystem>,
) {
    debug!("watcher interception loop started");

    loop {
        let raw = tokio::select! {
            biased;
            _ = &mut stop_rx => break,
            raw = raw_rx.recv() => raw,
        };

        let event = match raw {
            None => break,
            Some(Err(err)) => {
                if let Err(e) = errors_tx.try_send(err) {
                    warn!(error = %e, "dropping watcher error; nobody is reading errors");
                }
                continue;
            }
            Some(Ok(event)) => event,
        };

        // stat, canonicalize and watch block, and `watch` waits on notify's
        // event loop; keep them off the runtime's workers.
        if touches_watch_set(event.op) {
            let job = tokio::task::spawn_blocking({
                let event = event.clone();
                let primitive = Arc::clone(&primitive);
                let roots = Arc::clone(&roots);
                let fs = Arc::clone(&fs);
                move || intercept(&event, &primitive, &roots, fs.as_ref())
            });
            tokio::select! {
                biased;
                _ = &mut stop_rx => break,
                joined = job => {
                    if let Err(e) = joined {
                        warn!(error = %e, "intercept task failed");
                    }
                }
            }
        }

        // Forwarding may wait on a slow consumer; stay responsive to close.
        tokio::select! {
            biased;
            _ = &mut stop_rx => break,
            sent = events_tx.send(event) => {
                if sent.is_err() {
                    debug!("event receiver dropped");
                    break;
                }
            }
        }
    }

    debug!("watcher interception loop finished");
}

fn touches_watch_set(op: FsOp) -> bool {
    matches!(op, FsOp::Create | FsOp::Remove)
}

/// Adjust the watch set for one event. Never fails: problems are logged and
/// the caller forwards the event regardless.
fn intercept<W: DirWatch>(
    event: &FsEvent,
    primitive: &Mutex<W>,
    roots: &WatchRoots,
    fs: &dyn FileSystem,
) {
    let meta = match fs.metadata(&event.path) {
        Ok(m) => m,
        Err(err) => {
            debug!(path = ?event.path, error = %err, "intercept stat error");
            return;
        }
    };
    if !meta.is_dir {
        return;
    }

    let abs = match fs.canonicalize(&event.path) {
        Ok(p) => p,
        Err(err) => {
            debug!(path = ?event.path, error = %err, "intercept canonicalize error");
            return;
        }
    };
    if !roots.covers(&abs) {
        return;
    }

    let mut primitive = primitive.lock().unwrap_or_else(|p| p.into_inner());
    match event.op {
        // Only this directory: anything created inside it in the same burst
        // is not picked up.
        FsOp::Create => match primitive.watch(&abs) {
            Ok(()) => debug!(dir = ?abs, "watching new directory"),
            Err(err) => warn!(dir = ?abs, error = %err, "intercept add error"),
        },
        FsOp::Remove => match primitive.unwatch(&abs) {
            Ok(_) => debug!(dir = ?abs, "stopped watching directory"),
            Err(err) => warn!(dir = ?abs, error = %err, "intercept remove error"),
        },
        FsOp::Rename | FsOp::Write | FsOp::Chmod | FsOp::Other => {}
    }
}

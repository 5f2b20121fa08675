// src/reload/coordinator.rs

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::fs::FileSystem;
use crate::runner::RunnerHandle;
use crate::types::{RunState, RunStateChangeRequest};
use crate::watch::{FsEvent, WatchStreams};

use super::debounce::ModTimeCache;
use super::filter::WatchFilter;

/// Turns filesystem events into rebuild requests, one rebuild at a time.
#[derive(Debug)]
pub struct ReloadCoordinator {
    filter: WatchFilter,
    fs: Arc<dyn FileSystem>,
    cache: ModTimeCache,
    verbose: bool,
}

impl ReloadCoordinator {
    pub fn new(filter: WatchFilter, fs: Arc<dyn FileSystem>, verbose: bool) -> Self {
        Self {
            filter,
            fs,
            cache: ModTimeCache::new(),
            verbose,
        }
    }

    /// Whether `event` should trigger a rebuild. Updates the mtime cache.
    pub fn qualifies(&mut self, event: &FsEvent) -> bool {
        if self.verbose {
            debug!(path = %event.path.display(), op = %event.op, "watcher event");
        }
        if !self.filter.accepts(event) {
            return false;
        }

        let meta = match self.fs.metadata(&event.path) {
            Ok(meta) => meta,
            Err(err) => {
                debug!(path = %event.path.display(), error = %err, "stat failed, ignoring event");
                return false;
            }
        };
        self.cache.observe(&event.path, meta.modified)
    }

    /// Dispatch loop. Returns when the event stream ends or the runner goes
    /// away.
    pub async fn run(mut self, mut streams: WatchStreams, mut handle: RunnerHandle) {
        let mut errors_open = true;

        loop {
            tokio::select! {
                event = streams.events.recv() => {
                    let Some(event) = event else {
                        debug!("watch event stream closed");
                        return;
                    };
                    if !self.qualifies(&event) {
                        continue;
                    }

                    self.announce(&event);
                    match rebuild(&mut handle).await {
                        Some(RunState::Running) => {
                            let mut dropped = 0usize;
                            while streams.events.try_recv().is_ok() {
                                dropped += 1;
                            }
                            if dropped > 0 {
                                debug!(dropped, "discarded events queued during rebuild");
                            }
                        }
                        Some(_) => {}
                        None => {
                            debug!("runner gone, stopping coordinator");
                            return;
                        }
                    }
                }
                err = streams.errors.recv(), if errors_open => {
                    match err {
                        Some(err) => warn!(error = %err, "watcher error"),
                        None => errors_open = false,
                    }
                }
            }
        }
    }

    fn announce(&self, event: &FsEvent) {
        if self.verbose {
            info!(
                "watcher: {:?} {}, rebuilding and restarting...",
                event.path, event.op
            );
        } else {
            info!("Generate and Rebuild: {}", event.path.display());
        }
    }
}

/// One request/response handshake. Returns the terminal state
/// (`Running` or `RebuildFail`), or `None` if the runner is gone.
async fn rebuild(handle: &mut RunnerHandle) -> Option<RunState> {
    while let Ok(stale) = handle.states.try_recv() {
        debug!(state = %stale, "dropping stale state");
    }

    handle
        .requests
        .send(RunStateChangeRequest::RebuildAndRestart)
        .await
        .ok()?;

    loop {
        match handle.states.recv().await? {
            state @ (RunState::RebuildFail | RunState::Running) => return Some(state),
            RunState::None | RunState::RebuildSuccess => continue,
        }
    }
}

// src/notifier.rs

//! Notifying listeners about new process identities.
//!
//! The runner calls [`Notifier::process_started`] once per successful start.
//! Delivering that fact anywhere (browsers, sockets) is up to the
//! implementation; the core only needs the trait.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

/// Default delay between a process start and the notification reaching its
/// listeners, giving the new program time to bind its server.
pub const DEFAULT_NOTIFY_DELAY: Duration = Duration::from_millis(200);

/// Receives the pid of every newly started process.
///
/// Implementations must not block the caller.
pub trait Notifier: Send + Sync {
    fn process_started(&self, pid: u32);
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    fn process_started(&self, pid: u32) {
        (**self).process_started(pid);
    }
}

/// Notifier that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn process_started(&self, pid: u32) {
        info!(pid, "process started");
    }
}

/// Forwards to `inner` after a fixed delay, from a spawned task.
///
/// Must be used from within a Tokio runtime.
#[derive(Debug, Clone)]
pub struct DeferredNotifier<N> {
    inner: Arc<N>,
    delay: Duration,
}

impl<N: Notifier + 'static> DeferredNotifier<N> {
    pub fn new(inner: N, delay: Duration) -> Self {
        Self {
            inner: Arc::new(inner),
            delay,
        }
    }
}

impl<N: Notifier + 'static> Notifier for DeferredNotifier<N> {
    fn process_started(&self, pid: u32) {
        let inner = Arc::clone(&self.inner);
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner.process_started(pid);
        });
    }
}

// src/reload/mod.rs

//! Reload coordination.
//!
//! Sits between the watcher and the build runner:
//! - [`filter`] decides which events are interesting at all.
//! - [`debounce`] suppresses repeats whose modification time did not move.
//! - [`coordinator`] performs the request/response handshake with the
//!   runner and discards events caused by the build itself.

pub mod coordinator;
pub mod debounce;
pub mod filter;

pub use coordinator::ReloadCoordinator;
pub use debounce::ModTimeCache;
pub use filter::{DEFAULT_WATCH_PATTERN, WatchFilter};

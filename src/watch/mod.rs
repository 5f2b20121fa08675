// src/watch/mod.rs

//! Filesystem watching.
//!
//! This module is responsible for:
//! - Flattening `notify` events into `(path, operation)` pairs ([`event`]).
//! - Wrapping a single-directory watch primitive ([`primitive`]).
//! - Emulating recursive subtree watching on top of it ([`recursive`]),
//!   keeping the registered roots in a shared set ([`roots`]).
//!
//! It does **not** decide whether a change warrants a rebuild; that is the
//! reload coordinator's job.

pub mod event;
pub mod primitive;
pub mod recursive;
pub mod roots;

pub use event::{FsEvent, FsOp};
pub use primitive::{DirWatch, EVENT_BUFFER, NotifyDirWatch, RawEvent};
pub use recursive::{RecursiveWatcher, WatchStreams};
pub use roots::WatchRoots;

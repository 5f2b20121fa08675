// src/watch/event.rs

//! Flattened filesystem events.
//!
//! `notify` reports one event per kind with possibly several paths; the rest
//! of the crate works on one `(path, operation)` pair at a time.

use std::fmt;
use std::path::PathBuf;

use notify::event::{EventKind, ModifyKind};

/// Operation kind of a raw filesystem event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsOp {
    Create,
    Write,
    Remove,
    Rename,
    Chmod,
    Other,
}

impl From<&EventKind> for FsOp {
    fn from(kind: &EventKind) -> Self {
        match kind {
            EventKind::Create(_) => FsOp::Create,
            EventKind::Modify(ModifyKind::Name(_)) => FsOp::Rename,
            EventKind::Modify(ModifyKind::Metadata(_)) => FsOp::Chmod,
            EventKind::Modify(_) => FsOp::Write,
            EventKind::Remove(_) => FsOp::Remove,
            EventKind::Access(_) | EventKind::Any | EventKind::Other => FsOp::Other,
        }
    }
}

impl fmt::Display for FsOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FsOp::Create => "CREATE",
            FsOp::Write => "WRITE",
            FsOp::Remove => "REMOVE",
            FsOp::Rename => "RENAME",
            FsOp::Chmod => "CHMOD",
            FsOp::Other => "OTHER",
        };
        f.write_str(s)
    }
}

/// A single filesystem change: one path, one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    pub path: PathBuf,
    pub op: FsOp,
}

impl FsEvent {
    pub fn new(path: impl Into<PathBuf>, op: FsOp) -> Self {
        Self {
            path: path.into(),
            op,
        }
    }

    /// Split a `notify` event into one `FsEvent` per affected path.
    pub fn from_notify(event: notify::Event) -> Vec<FsEvent> {
        let op = FsOp::from(&event.kind);
        event
            .paths
            .into_iter()
            .map(|path| FsEvent { path, op })
            .collect()
    }
}

impl fmt::Display for FsEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {}", self.path, self.op)
    }
}

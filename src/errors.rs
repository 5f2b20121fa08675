// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::RunState;

#[derive(Error, Debug)]
pub enum DevloopError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("watch error: {0}")]
    WatchError(#[from] notify::Error),

    #[error("{0:?} is not a directory")]
    NotADirectory(PathBuf),

    #[error("no recursive registration found for {0:?}")]
    WatchRootNotFound(PathBuf),

    #[error("generate error: {status}; full output:\n{output}")]
    GenerateFailed { status: String, output: String },

    #[error("build error: {status}; full output:\n{output}")]
    BuildFailed { status: String, output: String },

    #[error("installing {package}: {status}; full output:\n{output}")]
    InstallFailed {
        package: String,
        status: String,
        output: String,
    },

    #[error("initial build error: {0}")]
    InitialBuild(#[source] Box<DevloopError>),

    #[error("process start error: {0}")]
    ProcessStart(#[source] std::io::Error),

    #[error("unexpected process exit: {0}")]
    UnexpectedExit(String),

    #[error("failed to kill pid {pid}: {message}")]
    Signal { pid: u32, message: String },

    #[error("state updates channel already full ({0} messages), consumer blocked")]
    StateChannelSaturated(usize),

    #[error("unexpected start state: {0}")]
    AlreadyRunning(RunState),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DevloopError>;

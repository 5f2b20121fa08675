// src/runner/mod.rs

//! Build runner.
//!
//! This module is responsible for:
//! - Generating and building the target ([`build`]).
//! - Launching and supervising the resulting process ([`process`]), stopping
//!   it through a platform [`controller`].
//! - Deciding what happens next from what was observed ([`core`]), with
//!   [`supervisor`] doing the actual IO and publishing [`RunState`]s.
//!
//! [`RunState`]: crate::types::RunState

pub mod build;
pub mod controller;
pub mod core;
pub mod process;
pub mod supervisor;

pub use build::{BuildFuture, BuildStep, GoToolchain, VUGU_TOOLS, install_tools, output_path};
pub use controller::{PlatformController, ProcessController, SignalError};
pub use core::{ExitReason, Observation, Phase, RunnerCore, Step, Transition};
pub use process::{ExitOutcome, ManagedProcess, StopOutcome, graceful_stop};
pub use supervisor::{BuildRunner, RunnerHandle, RunnerOptions};

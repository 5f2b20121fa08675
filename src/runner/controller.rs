// src/runner/controller.rs

//! Platform signal delivery.
//!
//! The runner never signals processes directly; it goes through a
//! [`ProcessController`] so tests can substitute a fake and so platforms
//! without an interrupt signal can report [`SignalError::Unsupported`].

use std::fmt;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignalError {
    #[error("interrupt is not supported on this platform")]
    Unsupported,

    #[error("process already exited")]
    AlreadyExited,

    #[error("{0}")]
    Failed(String),
}

/// Delivers stop signals to a process by pid.
pub trait ProcessController: Send + Sync + fmt::Debug {
    /// Ask the process to stop (SIGINT on Unix).
    fn interrupt(&self, pid: u32) -> Result<(), SignalError>;

    /// Forcibly terminate the process.
    fn kill(&self, pid: u32) -> Result<(), SignalError>;
}

/// Controller for the current platform.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformController;

#[cfg(unix)]
impl ProcessController for PlatformController {
    fn interrupt(&self, pid: u32) -> Result<(), SignalError> {
        unix::send(pid, nix::sys::signal::Signal::SIGINT)
    }

    fn kill(&self, pid: u32) -> Result<(), SignalError> {
        unix::send(pid, nix::sys::signal::Signal::SIGKILL)
    }
}

#[cfg(unix)]
mod unix {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    use super::SignalError;

    pub(super) fn send(pid: u32, signal: Signal) -> Result<(), SignalError> {
        let raw = i32::try_from(pid)
            .map_err(|_| SignalError::Failed(format!("pid {pid} out of range")))?;

        match kill(Pid::from_raw(raw), signal) {
            Ok(()) => Ok(()),
            Err(Errno::ESRCH) => Err(SignalError::AlreadyExited),
            Err(e) => Err(SignalError::Failed(format!("{signal:?}: {e}"))),
        }
    }
}

#[cfg(windows)]
impl ProcessController for PlatformController {
    fn interrupt(&self, _pid: u32) -> Result<(), SignalError> {
        Err(SignalError::Unsupported)
    }

    fn kill(&self, pid: u32) -> Result<(), SignalError> {
        let output = std::process::Command::new("taskkill")
            .args(["/F", "/PID", &pid.to_string()])
            .output()
            .map_err(|e| SignalError::Failed(format!("running taskkill: {e}")))?;

        match output.status.code() {
            Some(0) => Ok(()),
            // taskkill reports a missing process with exit code 128.
            Some(128) => Err(SignalError::AlreadyExited),
            _ => Err(SignalError::Failed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            )),
        }
    }
}

// src/runner/process.rs

//! The supervised child process and its graceful stop.

use std::fmt;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tracing::{debug, info, warn};

use crate::errors::{DevloopError, Result};

use super::controller::{ProcessController, SignalError};

/// How a supervised process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    Status(ExitStatus),
    /// Waiting on the child failed, so its status is not known.
    Unknown,
}

impl ExitOutcome {
    pub fn success(&self) -> bool {
        matches!(self, ExitOutcome::Status(status) if status.success())
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitOutcome::Status(status) => write!(f, "{status}"),
            ExitOutcome::Unknown => f.write_str("unknown exit status"),
        }
    }
}

/// How [`graceful_stop`] got the process to exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// It had already exited before any signal was sent.
    AlreadyExited(ExitOutcome),
    /// It honoured the interrupt within the timeout.
    Interrupted(ExitOutcome),
    /// It had to be killed.
    Killed(ExitOutcome),
}

/// A running child plus a single-shot report of its exit.
///
/// A background task owns the `Child` and reaps it; this handle only keeps
/// the pid and the receiving end of the exit report. The child is spawned
/// with `kill_on_drop`, so it never outlives the runtime.
#[derive(Debug)]
pub struct ManagedProcess {
    pid: u32,
    exit_rx: oneshot::Receiver<std::io::Result<ExitStatus>>,
    outcome: Option<ExitOutcome>,
}

impl ManagedProcess {
    /// Launch `exe` with `args`, inheriting the supervisor's stdio.
    pub fn spawn(exe: &Path, args: &[String]) -> std::io::Result<Self> {
        let mut child = Command::new(exe)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let pid = child.id().ok_or_else(|| {
            std::io::Error::other(format!("{} exited before its pid was read", exe.display()))
        })?;

        let (exit_tx, exit_rx) = oneshot::channel();
        tokio::spawn(async move {
            let status = child.wait().await;
            // Nobody listening means the runner already moved on.
            let _ = exit_tx.send(status);
        });

        debug!(pid, exe = %exe.display(), "spawned process");
        Ok(Self {
            pid,
            exit_rx,
            outcome: None,
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Wait for the exit report. Cancel safe; repeated calls return the
    /// same outcome.
    pub async fn wait(&mut self) -> ExitOutcome {
        if let Some(outcome) = self.outcome {
            return outcome;
        }
        let received = (&mut self.exit_rx).await;
        let outcome = match received {
            Ok(report) => self.record(report),
            Err(_) => ExitOutcome::Unknown,
        };
        self.outcome = Some(outcome);
        outcome
    }

    /// Non-blocking check for an exit that has already happened.
    pub fn try_exit(&mut self) -> Option<ExitOutcome> {
        if self.outcome.is_some() {
            return self.outcome;
        }
        let received = self.exit_rx.try_recv();
        let outcome = match received {
            Ok(report) => self.record(report),
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Closed) => ExitOutcome::Unknown,
        };
        self.outcome = Some(outcome);
        Some(outcome)
    }

    fn record(&self, report: std::io::Result<ExitStatus>) -> ExitOutcome {
        match report {
            Ok(status) => ExitOutcome::Status(status),
            Err(e) => {
                warn!(pid = self.pid, error = %e, "waiting on process failed");
                ExitOutcome::Unknown
            }
        }
    }
}

/// Stop `process`: interrupt, wait up to `timeout`, then kill.
///
/// Returns only once the process has exited. An error means neither signal
/// could be delivered.
pub async fn graceful_stop(
    process: &mut ManagedProcess,
    controller: &dyn ProcessController,
    timeout: Duration,
) -> Result<StopOutcome> {
    let pid = process.pid();

    if let Some(outcome) = process.try_exit() {
        debug!(pid, %outcome, "process already exited");
        return Ok(StopOutcome::AlreadyExited(outcome));
    }

    match controller.interrupt(pid) {
        Ok(()) => match tokio::time::timeout(timeout, process.wait()).await {
            Ok(outcome) => {
                debug!(pid, %outcome, "process exited after interrupt");
                return Ok(StopOutcome::Interrupted(outcome));
            }
            Err(_) => warn!(pid, ?timeout, "graceful stop hit timeout"),
        },
        Err(SignalError::Unsupported) => debug!(pid, "interrupt unsupported, killing"),
        Err(err) => warn!(pid, error = %err, "interrupt failed"),
    }

    info!(pid, "graceful stop doing kill");
    match controller.kill(pid) {
        Ok(()) | Err(SignalError::AlreadyExited) => {}
        Err(err) => {
            return Err(DevloopError::Signal {
                pid,
                message: err.to_string(),
            });
        }
    }

    Ok(StopOutcome::Killed(process.wait().await))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::runner::controller::PlatformController;
    use nix::errno::Errno;
    use nix::unistd::Pid;
    use std::sync::Mutex;

    fn sh(script: &str) -> ManagedProcess {
        ManagedProcess::spawn(
            Path::new("/bin/sh"),
            &["-c".to_string(), script.to_string()],
        )
        .unwrap()
    }

    fn is_gone(pid: u32) -> bool {
        nix::sys::signal::kill(Pid::from_raw(pid as i32), None) == Err(Errno::ESRCH)
    }

    /// Records calls and fails every signal.
    #[derive(Debug, Default)]
    struct BrokenController {
        calls: Mutex<Vec<&'static str>>,
    }

    impl ProcessController for BrokenController {
        fn interrupt(&self, _pid: u32) -> std::result::Result<(), SignalError> {
            self.calls.lock().unwrap().push("interrupt");
            Err(SignalError::Failed("EPERM".into()))
        }

        fn kill(&self, _pid: u32) -> std::result::Result<(), SignalError> {
            self.calls.lock().unwrap().push("kill");
            Err(SignalError::Failed("EPERM".into()))
        }
    }

    #[tokio::test]
    async fn cooperative_process_stops_on_interrupt() {
        let mut process = sh("trap 'exit 0' INT; while :; do sleep 0.05; done");
        // Give the shell time to install its trap.
        tokio::time::sleep(Duration::from_millis(200)).await;

        let outcome = graceful_stop(&mut process, &PlatformController, Duration::from_secs(5))
            .await
            .unwrap();

        assert!(matches!(outcome, StopOutcome::Interrupted(_)), "{outcome:?}");
        assert!(is_gone(process.pid()));
    }

    #[tokio::test]
    async fn stubborn_process_is_killed_after_timeout() {
        let mut process = sh("trap '' INT; while :; do sleep 0.05; done");
        tokio::time::sleep(Duration::from_millis(200)).await;

        let outcome = graceful_stop(
            &mut process,
            &PlatformController,
            Duration::from_millis(300),
        )
        .await
        .unwrap();

        assert!(matches!(outcome, StopOutcome::Killed(_)), "{outcome:?}");
        assert!(is_gone(process.pid()));
    }

    #[tokio::test]
    async fn exited_process_is_not_signalled() {
        let controller = BrokenController::default();
        let mut process = sh("exit 4");
        tokio::time::sleep(Duration::from_millis(300)).await;

        let outcome = graceful_stop(&mut process, &controller, Duration::from_secs(1))
            .await
            .unwrap();

        let StopOutcome::AlreadyExited(exit) = outcome else {
            panic!("expected AlreadyExited, got {outcome:?}");
        };
        assert!(!exit.success());
        assert!(controller.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn undeliverable_signals_are_an_error() {
        let controller = BrokenController::default();
        let mut process = sh("sleep 5");

        let err = graceful_stop(&mut process, &controller, Duration::from_secs(1))
            .await
            .unwrap_err();

        assert!(matches!(err, DevloopError::Signal { .. }), "{err}");
        assert_eq!(*controller.calls.lock().unwrap(), vec!["interrupt", "kill"]);
    }

    #[tokio::test]
    async fn wait_is_repeatable() {
        let mut process = sh("exit 0");
        let first = process.wait().await;
        let second = process.wait().await;
        assert!(first.success());
        assert_eq!(first, second);
        assert_eq!(process.try_exit(), Some(first));
    }
}

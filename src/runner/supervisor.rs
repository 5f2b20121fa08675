// src/runner/supervisor.rs

//! IO shell around [`RunnerCore`].
//!
//! `BuildRunner` performs the steps the core asks for (build, stop, start,
//! wait), feeds back what happened, and publishes the resulting states.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

use crate::errors::{DevloopError, Result};
use crate::notifier::Notifier;
use crate::types::{
    REQUEST_CHANNEL_CAPACITY, RunState, RunStateChangeRequest, STATE_CHANNEL_CAPACITY,
};

use super::build::BuildStep;
use super::controller::ProcessController;
use super::core::{ExitReason, Observation, RunnerCore, Step};
use super::process::{ExitOutcome, ManagedProcess, graceful_stop};

/// Tunables for a [`BuildRunner`].
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Arguments passed to every launched process.
    pub args: Vec<String>,
    /// How long an interrupted process gets before it is killed.
    pub stop_timeout: Duration,
    /// Pause between starting a process and publishing `Running`.
    pub settle_delay: Duration,
    pub verbose: bool,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            stop_timeout: Duration::from_secs(10),
            settle_delay: Duration::from_secs(1),
            verbose: false,
        }
    }
}

/// The other ends of a runner's channels.
#[derive(Debug)]
pub struct RunnerHandle {
    pub requests: mpsc::Sender<RunStateChangeRequest>,
    pub states: mpsc::Receiver<RunState>,
}

/// Supervises one build target: rebuilds on request and keeps at most one
/// instance of the program running.
pub struct BuildRunner<B> {
    build: B,
    notifier: Arc<dyn Notifier>,
    controller: Arc<dyn ProcessController>,
    options: RunnerOptions,
    state: RunState,
    started: bool,
    state_tx: mpsc::Sender<RunState>,
    request_rx: mpsc::Receiver<RunStateChangeRequest>,
}

/// Mutable bookkeeping for one `run` call.
#[derive(Default)]
struct Session {
    process: Option<ManagedProcess>,
    exe: Option<PathBuf>,
    build_error: Option<DevloopError>,
    exit: Option<ExitOutcome>,
}

impl<B: BuildStep> BuildRunner<B> {
    pub fn new(
        build: B,
        notifier: Arc<dyn Notifier>,
        controller: Arc<dyn ProcessController>,
        options: RunnerOptions,
    ) -> (Self, RunnerHandle) {
        let (state_tx, states) = mpsc::channel(STATE_CHANNEL_CAPACITY);
        let (requests, request_rx) = mpsc::channel(REQUEST_CHANNEL_CAPACITY);

        let runner = Self {
            build,
            notifier,
            controller,
            options,
            state: RunState::None,
            started: false,
            state_tx,
            request_rx,
        };
        (runner, RunnerHandle { requests, states })
    }

    /// Last published state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Build, start and supervise until stopped, the first build fails, or
    /// the process exits by itself. Callable once.
    pub async fn run(&mut self) -> Result<()> {
        if self.started || self.state != RunState::None {
            return Err(DevloopError::AlreadyRunning(self.state));
        }
        self.started = true;

        let result = self.run_loop().await;
        if let Err(err) = &result {
            debug!(error = %err, "runner loop ended with error");
        }
        let last = self.publish(RunState::None);
        result.and(last)
    }

    async fn run_loop(&mut self) -> Result<()> {
        let mut core = RunnerCore::new();
        let mut session = Session::default();
        let mut step = core.begin()?;

        loop {
            let observation = match step {
                Step::GenerateAndBuild => self.generate_and_build(&mut session).await,
                Step::StopProcess => self.stop_process(&mut session).await?,
                Step::StartProcess => self.start_process(&mut session).await?,
                Step::Await => self.await_event(&mut session).await?,
                Step::Finish(reason) => return finish(reason, session),
            };

            let transition = core.advance(observation)?;
            if let Some(state) = transition.publish {
                self.publish(state)?;
            }
            step = transition.next;
        }
    }

    async fn generate_and_build(&mut self, session: &mut Session) -> Observation {
        if self.options.verbose {
            info!("running generate and build");
        }
        match self.build.generate_and_build().await {
            Ok(exe) => {
                session.exe = Some(exe);
                Observation::Built
            }
            Err(err) => {
                if session.process.is_some() {
                    warn!(error = %err, "rebuild failed, keeping the running process");
                }
                session.build_error = Some(err);
                Observation::BuildFailed
            }
        }
    }

    async fn stop_process(&mut self, session: &mut Session) -> Result<Observation> {
        let mut process = session
            .process
            .take()
            .ok_or_else(|| DevloopError::Internal("stop requested with no process".into()))?;

        if self.options.verbose {
            info!(pid = process.pid(), "stopping process");
        }
        let outcome =
            graceful_stop(&mut process, self.controller.as_ref(), self.options.stop_timeout)
                .await?;
        debug!(pid = process.pid(), ?outcome, "process stopped");
        Ok(Observation::ProcessStopped)
    }

    async fn start_process(&mut self, session: &mut Session) -> Result<Observation> {
        let exe = session
            .exe
            .as_deref()
            .ok_or_else(|| DevloopError::Internal("start requested before a build".into()))?;

        let process =
            ManagedProcess::spawn(exe, &self.options.args).map_err(DevloopError::ProcessStart)?;
        let pid = process.pid();
        info!(pid, exe = %exe.display(), "started process");

        session.process = Some(process);
        self.notifier.process_started(pid);
        tokio::time::sleep(self.options.settle_delay).await;
        Ok(Observation::ProcessStarted)
    }

    async fn await_event(&mut self, session: &mut Session) -> Result<Observation> {
        let process = session
            .process
            .as_mut()
            .ok_or_else(|| DevloopError::Internal("waiting with no process".into()))?;

        let observation = tokio::select! {
            request = self.request_rx.recv() => {
                // All senders gone: nobody can ever ask again, so wind down.
                let request = request.unwrap_or(RunStateChangeRequest::Stop);
                debug!(?request, "state change request");
                Observation::Request(request)
            }
            outcome = process.wait() => {
                info!(pid = process.pid(), %outcome, "process exited on its own");
                session.exit = Some(outcome);
                Observation::ProcessExited { success: outcome.success() }
            }
        };
        Ok(observation)
    }

    /// Non-blocking publish; a full channel means the consumer stalled.
    fn publish(&mut self, state: RunState) -> Result<()> {
        if state == self.state {
            debug!(%state, "publishing unchanged state");
        }
        self.state = state;

        match self.state_tx.try_send(state) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                error!(
                    %state,
                    capacity = STATE_CHANNEL_CAPACITY,
                    "state updates channel full, consumer blocked"
                );
                Err(DevloopError::StateChannelSaturated(STATE_CHANNEL_CAPACITY))
            }
            Err(TrySendError::Closed(_)) => {
                debug!(%state, "no state listener");
                Ok(())
            }
        }
    }
}

fn finish(reason: ExitReason, session: Session) -> Result<()> {
    match reason {
        ExitReason::Stopped => Ok(()),
        ExitReason::InitialBuildFailed => {
            let cause = session
                .build_error
                .unwrap_or_else(|| DevloopError::Internal("build failed without an error".into()));
            Err(DevloopError::InitialBuild(Box::new(cause)))
        }
        ExitReason::ProcessExited { success: true } => Ok(()),
        ExitReason::ProcessExited { success: false } => {
            let outcome = session.exit.unwrap_or(ExitOutcome::Unknown);
            Err(DevloopError::UnexpectedExit(outcome.to_string()))
        }
    }
}

// src/runner/core.rs

//! Pure build-runner state machine.
//!
//! [`RunnerCore`] consumes [`Observation`]s (what the IO shell saw happen)
//! and answers with a [`Transition`]: which state to publish, and which
//! [`Step`] the shell should perform next. It has no channels, processes or
//! timers and is unit tested in isolation.
//!
//! Every phase has its own transition function; an observation a phase does
//! not expect is an internal error.

use crate::errors::{DevloopError, Result};
use crate::types::{RunState, RunStateChangeRequest};

/// Where the supervisor loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// `begin` not called yet.
    Idle,
    /// Generate + build in progress.
    Building,
    /// Build succeeded; the previous process is being stopped.
    Replacing,
    /// The new executable is being launched.
    Starting,
    /// Waiting for a request or for the process to exit on its own.
    Awaiting,
    /// A stop request is being honoured.
    ShuttingDown,
    /// The loop is over.
    Finished,
}

/// Something the IO shell observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    Built,
    BuildFailed,
    ProcessStopped,
    ProcessStarted,
    Request(RunStateChangeRequest),
    ProcessExited { success: bool },
}

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The very first build failed; there was nothing to fall back to.
    InitialBuildFailed,
    /// A stop request was honoured.
    Stopped,
    /// The supervised process terminated by itself.
    ProcessExited { success: bool },
}

/// What the IO shell should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    GenerateAndBuild,
    /// Graceful stop of the live process.
    StopProcess,
    StartProcess,
    /// Block on the next request or the process exiting.
    Await,
    Finish(ExitReason),
}

/// Result of feeding one observation into the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub publish: Option<RunState>,
    pub next: Step,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Next {
    phase: Phase,
    process_live: bool,
    transition: Transition,
}

impl Next {
    fn to(
        phase: Phase,
        process_live: bool,
        publish: Option<RunState>,
        next: Step,
    ) -> Option<Self> {
        Some(Next {
            phase,
            process_live,
            transition: Transition { publish, next },
        })
    }
}

/// Runner state machine.
#[derive(Debug, Clone)]
pub struct RunnerCore {
    phase: Phase,
    process_live: bool,
}

impl Default for RunnerCore {
    fn default() -> Self {
        Self::new()
    }
}

impl RunnerCore {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            process_live: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether a supervised process is currently alive (as far as the core knows).
    pub fn process_live(&self) -> bool {
        self.process_live
    }

    /// Enter the loop. Only valid once.
    pub fn begin(&mut self) -> Result<Step> {
        if self.phase != Phase::Idle {
            return Err(DevloopError::Internal(format!(
                "runner core already started (phase {:?})",
                self.phase
            )));
        }
        self.phase = Phase::Building;
        Ok(Step::GenerateAndBuild)
    }

    /// Feed one observation and get the resulting transition.
    pub fn advance(&mut self, observation: Observation) -> Result<Transition> {
        let live = self.process_live;
        let next = match self.phase {
            Phase::Building => from_building(live, observation),
            Phase::Replacing => from_replacing(observation),
            Phase::Starting => from_starting(observation),
            Phase::Awaiting => from_awaiting(observation),
            Phase::ShuttingDown => from_shutting_down(observation),
            Phase::Idle | Phase::Finished => None,
        };

        let Some(next) = next else {
            return Err(DevloopError::Internal(format!(
                "unexpected observation {:?} in phase {:?}",
                observation, self.phase
            )));
        };

        self.phase = next.phase;
        self.process_live = next.process_live;
        Ok(next.transition)
    }
}

fn from_building(live: bool, observation: Observation) -> Option<Next> {
    match (observation, live) {
        // The old process must be fully gone before the new one starts.
        (Observation::Built, true) => Next::to(
            Phase::Replacing,
            true,
            Some(RunState::RebuildSuccess),
            Step::StopProcess,
        ),
        (Observation::Built, false) => Next::to(
            Phase::Starting,
            false,
            Some(RunState::RebuildSuccess),
            Step::StartProcess,
        ),
        // Keep the old process and go back to waiting.
        (Observation::BuildFailed, true) => Next::to(
            Phase::Awaiting,
            true,
            Some(RunState::RebuildFail),
            Step::Await,
        ),
        (Observation::BuildFailed, false) => Next::to(
            Phase::Finished,
            false,
            None,
            Step::Finish(ExitReason::InitialBuildFailed),
        ),
        _ => None,
    }
}

fn from_replacing(observation: Observation) -> Option<Next> {
    match observation {
        Observation::ProcessStopped => {
            Next::to(Phase::Starting, false, None, Step::StartProcess)
        }
        _ => None,
    }
}

fn from_starting(observation: Observation) -> Option<Next> {
    match observation {
        Observation::ProcessStarted => {
            Next::to(Phase::Awaiting, true, Some(RunState::Running), Step::Await)
        }
        _ => None,
    }
}

fn from_awaiting(observation: Observation) -> Option<Next> {
    match observation {
        Observation::Request(RunStateChangeRequest::Stop) => {
            Next::to(Phase::ShuttingDown, true, None, Step::StopProcess)
        }
        Observation::Request(RunStateChangeRequest::RebuildAndRestart) => {
            Next::to(Phase::Building, true, None, Step::GenerateAndBuild)
        }
        // Self-termination is never restarted.
        Observation::ProcessExited { success } => Next::to(
            Phase::Finished,
            false,
            None,
            Step::Finish(ExitReason::ProcessExited { success }),
        ),
        _ => None,
    }
}

fn from_shutting_down(observation: Observation) -> Option<Next> {
    match observation {
        Observation::ProcessStopped => Next::to(
            Phase::Finished,
            false,
            None,
            Step::Finish(ExitReason::Stopped),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started_core() -> RunnerCore {
        let mut core = RunnerCore::new();
        assert_eq!(core.begin().unwrap(), Step::GenerateAndBuild);
        core
    }

    /// Drive a fresh core through a successful first build and start.
    fn running_core() -> RunnerCore {
        let mut core = started_core();
        core.advance(Observation::Built).unwrap();
        core.advance(Observation::ProcessStarted).unwrap();
        assert_eq!(core.phase(), Phase::Awaiting);
        core
    }

    #[test]
    fn clean_first_build_publishes_success_then_running() {
        let mut core = started_core();

        let t = core.advance(Observation::Built).unwrap();
        assert_eq!(t.publish, Some(RunState::RebuildSuccess));
        assert_eq!(t.next, Step::StartProcess);
        assert!(!core.process_live());

        let t = core.advance(Observation::ProcessStarted).unwrap();
        assert_eq!(t.publish, Some(RunState::Running));
        assert_eq!(t.next, Step::Await);
        assert!(core.process_live());
    }

    #[test]
    fn failed_first_build_is_fatal() {
        let mut core = started_core();
        let t = core.advance(Observation::BuildFailed).unwrap();
        assert_eq!(t.publish, None);
        assert_eq!(t.next, Step::Finish(ExitReason::InitialBuildFailed));
        assert_eq!(core.phase(), Phase::Finished);
    }

    #[test]
    fn failed_rebuild_keeps_the_running_process() {
        let mut core = running_core();
        core.advance(Observation::Request(RunStateChangeRequest::RebuildAndRestart))
            .unwrap();

        let t = core.advance(Observation::BuildFailed).unwrap();
        assert_eq!(t.publish, Some(RunState::RebuildFail));
        assert_eq!(t.next, Step::Await);
        assert!(core.process_live());
    }

    #[test]
    fn successful_rebuild_stops_old_process_before_starting_new_one() {
        let mut core = running_core();
        let t = core
            .advance(Observation::Request(RunStateChangeRequest::RebuildAndRestart))
            .unwrap();
        assert_eq!(t.next, Step::GenerateAndBuild);

        let t = core.advance(Observation::Built).unwrap();
        assert_eq!(t.next, Step::StopProcess);
        assert_eq!(t.publish, Some(RunState::RebuildSuccess));

        let t = core.advance(Observation::ProcessStopped).unwrap();
        assert_eq!(t.next, Step::StartProcess);
        assert!(!core.process_live());
    }

    #[test]
    fn stop_request_stops_process_and_finishes() {
        let mut core = running_core();
        let t = core
            .advance(Observation::Request(RunStateChangeRequest::Stop))
            .unwrap();
        assert_eq!(t.next, Step::StopProcess);

        let t = core.advance(Observation::ProcessStopped).unwrap();
        assert_eq!(t.next, Step::Finish(ExitReason::Stopped));
        assert_eq!(core.phase(), Phase::Finished);
    }

    #[test]
    fn self_exit_finishes_without_restart() {
        let mut core = running_core();
        let t = core
            .advance(Observation::ProcessExited { success: false })
            .unwrap();
        assert_eq!(
            t.next,
            Step::Finish(ExitReason::ProcessExited { success: false })
        );
        assert!(!core.process_live());
    }

    #[test]
    fn unexpected_observations_are_rejected() {
        let mut core = RunnerCore::new();
        assert!(core.advance(Observation::Built).is_err());

        let mut core = started_core();
        assert!(core.advance(Observation::ProcessStarted).is_err());
        assert!(core.begin().is_err());
    }
}

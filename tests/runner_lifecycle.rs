// tests/runner_lifecycle.rs
#![cfg(unix)]

mod common;
use crate::common::{init_tracing, pid_alive, wait_until, with_timeout};

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use devloop::errors::{DevloopError, Result};
use devloop::runner::{BuildRunner, PlatformController, RunnerOptions};
use devloop::types::{RunState, RunStateChangeRequest, STATE_CHANNEL_CAPACITY};
use devloop_test_utils::notifier::RecordingNotifier;
use devloop_test_utils::scripted::{BuildControls, IGNORE_INTERRUPT, SERVE_FOREVER, ScriptedBuild};

struct Harness {
    _dir: TempDir,
    controls: BuildControls,
    notifier: RecordingNotifier,
    requests: mpsc::Sender<RunStateChangeRequest>,
    states: mpsc::Receiver<RunState>,
    task: JoinHandle<(BuildRunner<ScriptedBuild>, Result<()>)>,
}

fn options(stop_timeout: Duration) -> RunnerOptions {
    RunnerOptions {
        args: Vec::new(),
        stop_timeout,
        settle_delay: Duration::from_millis(50),
        verbose: false,
    }
}

/// Start a runner over a scripted program. `prepare` runs before `run`.
fn start(body: &str, stop_timeout: Duration, prepare: impl FnOnce(&BuildControls)) -> Harness {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let build = ScriptedBuild::new(dir.path(), body);
    let controls = build.controls();
    prepare(&controls);

    let notifier = RecordingNotifier::new();
    let (mut runner, handle) = BuildRunner::new(
        build,
        Arc::new(notifier.clone()),
        Arc::new(PlatformController),
        options(stop_timeout),
    );

    let task = tokio::spawn(async move {
        let result = runner.run().await;
        (runner, result)
    });

    Harness {
        _dir: dir,
        controls,
        notifier,
        requests: handle.requests,
        states: handle.states,
        task,
    }
}

impl Harness {
    async fn next_state(&mut self) -> RunState {
        with_timeout(self.states.recv())
            .await
            .expect("state channel closed")
    }

    async fn request(&self, request: RunStateChangeRequest) {
        self.requests.send(request).await.unwrap();
    }

    async fn finish(self) -> (BuildRunner<ScriptedBuild>, Result<()>, mpsc::Receiver<RunState>) {
        let (runner, result) = with_timeout(self.task).await.unwrap();
        (runner, result, self.states)
    }
}

#[tokio::test]
async fn clean_start_publishes_success_then_running_and_stops_on_request() {
    let mut h = start(SERVE_FOREVER, Duration::from_secs(5), |_| {});

    assert_eq!(h.next_state().await, RunState::RebuildSuccess);
    assert_eq!(h.next_state().await, RunState::Running);

    let pids = h.notifier.pids();
    assert_eq!(pids.len(), 1);
    assert!(pid_alive(pids[0]));

    h.request(RunStateChangeRequest::Stop).await;
    let (runner, result, mut states) = h.finish().await;

    assert!(result.is_ok(), "{result:?}");
    assert_eq!(states.recv().await, Some(RunState::None));
    assert_eq!(runner.state(), RunState::None);
    assert!(!pid_alive(pids[0]));
}

#[tokio::test]
async fn failing_first_build_is_fatal_and_starts_nothing() {
    let h = start(SERVE_FOREVER, Duration::from_secs(5), |c| c.set_failing(true));
    let notifier = h.notifier.clone();

    let (_runner, result, mut states) = h.finish().await;

    let err = result.unwrap_err();
    assert!(matches!(err, DevloopError::InitialBuild(_)), "{err}");
    assert!(err.to_string().starts_with("initial build error"), "{err}");
    assert!(notifier.pids().is_empty());
    assert_eq!(states.recv().await, Some(RunState::None));
}

#[tokio::test]
async fn failed_rebuild_keeps_the_old_process() {
    let mut h = start(SERVE_FOREVER, Duration::from_secs(5), |_| {});
    assert_eq!(h.next_state().await, RunState::RebuildSuccess);
    assert_eq!(h.next_state().await, RunState::Running);
    let pid = h.notifier.last().unwrap();

    h.controls.set_failing(true);
    h.request(RunStateChangeRequest::RebuildAndRestart).await;

    assert_eq!(h.next_state().await, RunState::RebuildFail);
    assert_eq!(h.controls.builds(), 2);
    assert_eq!(h.notifier.pids(), vec![pid]);
    assert!(pid_alive(pid));

    h.request(RunStateChangeRequest::Stop).await;
    let (_runner, result, _states) = h.finish().await;
    assert!(result.is_ok(), "{result:?}");
    assert!(!pid_alive(pid));
}

#[tokio::test]
async fn successful_rebuild_replaces_the_process() {
    let mut h = start(SERVE_FOREVER, Duration::from_secs(5), |_| {});
    assert_eq!(h.next_state().await, RunState::RebuildSuccess);
    assert_eq!(h.next_state().await, RunState::Running);
    let first = h.notifier.last().unwrap();

    h.request(RunStateChangeRequest::RebuildAndRestart).await;
    assert_eq!(h.next_state().await, RunState::RebuildSuccess);
    assert_eq!(h.next_state().await, RunState::Running);

    let pids = h.notifier.pids();
    assert_eq!(pids.len(), 2);
    let second = pids[1];
    assert_ne!(first, second);
    assert!(!pid_alive(first), "old process must be gone before the new one runs");
    assert!(pid_alive(second));

    h.request(RunStateChangeRequest::Stop).await;
    let (_runner, result, _states) = h.finish().await;
    assert!(result.is_ok(), "{result:?}");
}

#[tokio::test]
async fn stubborn_process_is_killed_on_stop() {
    let mut h = start(IGNORE_INTERRUPT, Duration::from_millis(300), |_| {});
    assert_eq!(h.next_state().await, RunState::RebuildSuccess);
    assert_eq!(h.next_state().await, RunState::Running);
    let pid = h.notifier.last().unwrap();

    h.request(RunStateChangeRequest::Stop).await;
    let (_runner, result, _states) = h.finish().await;

    assert!(result.is_ok(), "{result:?}");
    assert!(!pid_alive(pid));
}

#[tokio::test]
async fn failing_self_exit_is_an_unexpected_exit() {
    let mut h = start("sleep 0.3\nexit 3\n", Duration::from_secs(5), |_| {});
    assert_eq!(h.next_state().await, RunState::RebuildSuccess);
    assert_eq!(h.next_state().await, RunState::Running);

    let (_runner, result, mut states) = h.finish().await;
    match result {
        Err(DevloopError::UnexpectedExit(status)) => assert!(status.contains('3'), "{status}"),
        other => panic!("expected UnexpectedExit, got {other:?}"),
    }
    assert_eq!(states.recv().await, Some(RunState::None));
}

#[tokio::test]
async fn clean_self_exit_is_not_restarted() {
    let mut h = start("sleep 0.3\nexit 0\n", Duration::from_secs(5), |_| {});
    assert_eq!(h.next_state().await, RunState::RebuildSuccess);
    assert_eq!(h.next_state().await, RunState::Running);

    let controls = h.controls.clone();
    let (_runner, result, _states) = h.finish().await;
    assert!(result.is_ok(), "{result:?}");
    assert_eq!(controls.builds(), 1);
}

#[tokio::test]
async fn closed_request_channel_means_stop() {
    let mut h = start(SERVE_FOREVER, Duration::from_secs(5), |_| {});
    assert_eq!(h.next_state().await, RunState::RebuildSuccess);
    assert_eq!(h.next_state().await, RunState::Running);
    let pid = h.notifier.last().unwrap();

    let Harness {
        requests, task, _dir, ..
    } = h;
    drop(requests);

    let (_runner, result) = with_timeout(task).await.unwrap();
    assert!(result.is_ok(), "{result:?}");
    assert!(!pid_alive(pid));
}

#[tokio::test]
async fn run_can_only_be_called_once() {
    let h = start(SERVE_FOREVER, Duration::from_secs(5), |c| c.set_failing(true));
    let (mut runner, first, _states) = h.finish().await;
    assert!(first.is_err());

    let second = runner.run().await;
    assert!(
        matches!(second, Err(DevloopError::AlreadyRunning(_))),
        "{second:?}"
    );
}

#[tokio::test]
async fn stalled_state_consumer_is_fatal() {
    // `states` is never read.
    let h = start(SERVE_FOREVER, Duration::from_secs(5), |_| {});
    let notifier = h.notifier.clone();
    wait_until(|| !notifier.pids().is_empty()).await;
    h.controls.set_failing(true);

    // Success + Running, then one RebuildFail per request until the buffer
    // is full. Once the runner gives up nobody receives, so a send stalls.
    for _ in 0..STATE_CHANNEL_CAPACITY + 8 {
        let sent = tokio::time::timeout(
            Duration::from_millis(500),
            h.requests.send(RunStateChangeRequest::RebuildAndRestart),
        )
        .await;
        if !matches!(sent, Ok(Ok(()))) {
            break;
        }
    }

    let (_runner, result, _states) = h.finish().await;
    assert!(
        matches!(
            result,
            Err(DevloopError::StateChannelSaturated(STATE_CHANNEL_CAPACITY))
        ),
        "{result:?}"
    );
}

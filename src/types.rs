use std::fmt;

/// Capacity of the runner's state notification channel.
///
/// Publishing never blocks; a full channel means the consumer stalled.
pub const STATE_CHANNEL_CAPACITY: usize = 32;

/// Capacity of the request channel: at most one outstanding request.
pub const REQUEST_CHANNEL_CAPACITY: usize = 1;

/// Lifecycle state published by the build runner.
///
/// - `None`: nothing running. Initial and terminal.
/// - `Running`: a freshly started process is live.
/// - `RebuildSuccess`: transient, emitted right after a successful build.
/// - `RebuildFail`: transient, generate or build failed while a prior process
///   is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    None,
    Running,
    RebuildSuccess,
    RebuildFail,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::None => "none",
            RunState::Running => "running",
            RunState::RebuildSuccess => "rebuild-success",
            RunState::RebuildFail => "rebuild-fail",
        };
        f.write_str(s)
    }
}

/// A request submitted to the runner from outside its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStateChangeRequest {
    /// Gracefully stop the running process and end the loop.
    Stop,
    /// Regenerate, rebuild and replace the running process.
    RebuildAndRestart,
}

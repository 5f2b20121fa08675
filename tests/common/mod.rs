#![allow(dead_code)]

use std::time::Duration;

pub use devloop_test_utils::{init_tracing, with_timeout, with_timeout_secs};

/// Poll `cond` every 20ms until it holds (5s limit).
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    with_timeout(async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
}

#[cfg(unix)]
pub fn pid_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;
    kill(Pid::from_raw(pid as i32), None).is_ok()
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child-process supervision helpers.

use std::time::Duration;

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::process::Child;

/// Checks whether a process with the given PID is alive.
pub fn is_process_alive(pid: u32) -> bool {
    let Ok(pid_i32) = i32::try_from(pid) else {
        return false;
    };
    signal::kill(Pid::from_raw(pid_i32), None).is_ok()
}

/// Terminate a child and keep terminating until it actually exits.
///
/// SIGTERM is re-sent every second so a child that ignores the first signal
/// mid-startup still goes down once its handlers are installed.
pub async fn kill_mercilessly(child: &mut Child) {
    loop {
        if let Some(pid) = child.id() {
            if let Ok(pid_i32) = i32::try_from(pid) {
                let _ = signal::kill(Pid::from_raw(pid_i32), Signal::SIGTERM);
            }
        }

        match child.try_wait() {
            Ok(Some(_)) | Err(_) => break,
            Ok(None) => {
                tracing::warn!(
                    pid = ?child.id(),
                    "managed process didn't die, trying again in 1s"
                );
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! GPU stability tracking.
//!
//! Some GPU workloads wedge the driver in a way only a reboot clears. Each
//! stability tick runs an external probe; results are kept in a rolling
//! window and a sustained failure ratio triggers a host reboot.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tokio::sync::Mutex;

/// Probe results older than this fall out of the window.
const WINDOW: Duration = Duration::from_secs(120);

/// Failure ratio within the window after which the system is unstable.
const FAIL_THRESHOLD: f64 = 0.4;

/// No conclusions are drawn from fewer samples than this.
const MIN_SAMPLES: usize = 5;

pub struct StabilityManager {
    probe_cmd: String,
    attempts: Mutex<Vec<(Instant, bool)>>,
}

impl StabilityManager {
    pub fn new(probe_cmd: impl Into<String>) -> Self {
        Self { probe_cmd: probe_cmd.into(), attempts: Mutex::new(Vec::new()) }
    }

    /// Run one probe and report whether the window still looks stable.
    pub async fn check_stable(&self) -> bool {
        let ok = self.run_probe().await;

        let mut attempts = self.attempts.lock().await;
        let cutoff = Instant::now() - WINDOW;
        attempts.retain(|(when, _)| *when > cutoff);
        attempts.push((Instant::now(), ok));

        if attempts.len() < MIN_SAMPLES {
            return true;
        }

        let failures = attempts.iter().filter(|(_, ok)| !ok).count();
        (failures as f64 / attempts.len() as f64) < FAIL_THRESHOLD
    }

    async fn run_probe(&self) -> bool {
        let status = Command::new("sh")
            .args(["-c", &self.probe_cmd])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => true,
            Ok(_) => {
                tracing::warn!("stability probe exited non-zero, system may be unstable");
                false
            }
            Err(err) => {
                tracing::warn!(err = %err, "stability probe failed to run");
                false
            }
        }
    }
}

/// Reboot the host. Last resort when the probe window shows sustained
/// failure.
pub async fn reboot_host() {
    tracing::error!("sustained GPU instability, rebooting host");
    let result = Command::new("systemctl").arg("reboot").status().await;
    if let Err(err) = result {
        tracing::error!(err = %err, "reboot request failed");
    }
}

#[cfg(test)]
#[path = "stability_tests.rs"]
mod tests;

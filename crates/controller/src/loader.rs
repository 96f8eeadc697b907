// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Loading-screen overlay for experiences with a warm-up period.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use crate::process::kill_mercilessly;

/// Owns the full-screen loader overlay process. Start and stop are
/// serialized so a scheduled dismissal can't race a fresh start.
pub struct LoaderManager {
    loader_cmd: String,
    running: Mutex<Option<Child>>,
}

impl LoaderManager {
    pub fn new(loader_cmd: impl Into<String>) -> Self {
        Self { loader_cmd: loader_cmd.into(), running: Mutex::new(None) }
    }

    pub async fn start(&self) {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return;
        }

        let spawned = Command::new("sh")
            .args(["-c", &self.loader_cmd])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();

        match spawned {
            Ok(child) => *running = Some(child),
            Err(err) => {
                tracing::warn!(err = %err, "loader overlay failed to spawn");
            }
        }
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    pub async fn stop(&self) {
        let mut running = self.running.lock().await;
        if let Some(mut child) = running.take() {
            kill_mercilessly(&mut child).await;
        }
    }

    /// Dismiss the overlay after an experience's advertised load time.
    pub fn stop_after(self: &Arc<Self>, timeout: Duration) {
        let loader = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            loader.stop().await;
        });
    }
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;

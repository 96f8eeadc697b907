// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Externally-captured desktop streams.
//!
//! The visual content comes from a capture service running elsewhere (e.g. a
//! Windows box); this environment points that service at a path and runs a
//! local capture shell that renders the stream.

use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use super::{EnvState, Environment, EnvironmentError};
use crate::process::kill_mercilessly;

/// What the capture service says it is currently showing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentCapture {
    pub id: Option<String>,
    pub processes: Option<u32>,
}

/// Client for the capture-service HTTP API.
pub struct CaptureApi {
    base_url: String,
    client: reqwest::Client,
}

impl CaptureApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { base_url: base_url.into(), client }
    }

    /// Point the upstream at an experience, or clear it with `None`.
    pub async fn set_current(
        &self,
        id: Option<&str>,
        path: Option<&str>,
    ) -> Result<(), reqwest::Error> {
        self.client
            .put(format!("{}/current", self.base_url))
            .json(&serde_json::json!({ "id": id, "path": path }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn current(&self) -> Result<CurrentCapture, reqwest::Error> {
        self.client
            .get(format!("{}/current", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

pub struct CaptureEnvironment {
    id: String,
    path: String,
    api: Arc<CaptureApi>,
    shell_cmd: String,
    load_time: Option<u64>,
    failed_timeout_s: u64,
    running: Mutex<Option<RunningCapture>>,
}

struct RunningCapture {
    child: Child,
    started_at: Instant,
}

impl CaptureEnvironment {
    pub fn new(
        id: String,
        path: String,
        api: Arc<CaptureApi>,
        shell_cmd: String,
        load_time: Option<u64>,
        failed_timeout_s: u64,
    ) -> Self {
        Self { id, path, api, shell_cmd, load_time, failed_timeout_s, running: Mutex::new(None) }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn start(&self, _previous: Option<&Environment>) -> Result<(), EnvironmentError> {
        self.api.set_current(Some(&self.id), Some(&self.path)).await.map_err(|err| {
            EnvironmentError::Capture { id: self.id.clone(), reason: err.to_string() }
        })?;

        let child = Command::new("sh")
            .args(["-c", &self.shell_cmd])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EnvironmentError::Process { id: self.id.clone(), source })?;

        *self.running.lock().await = Some(RunningCapture { child, started_at: Instant::now() });
        Ok(())
    }

    /// Tear down the shell and, unless the successor is also a capture
    /// experience, clear the upstream. A capture→capture handover leaves the
    /// upstream set so the incoming start retargets it without a blank gap.
    pub async fn stop(&self, next: Option<&Environment>) -> Result<(), EnvironmentError> {
        if let Some(mut running) = self.running.lock().await.take() {
            kill_mercilessly(&mut running.child).await;
        }

        let successor_is_capture = next.map(|env| env.is_capture()).unwrap_or(false);
        if !successor_is_capture {
            self.api.set_current(None, None).await.map_err(|err| {
                EnvironmentError::Capture { id: self.id.clone(), reason: err.to_string() }
            })?;
        }
        Ok(())
    }

    /// Failed once the upstream reports no processes for longer than the
    /// grace window (the larger of `load_time` and the failure timeout).
    pub async fn probe(&self) -> EnvState {
        let started_at = {
            let running = self.running.lock().await;
            match running.as_ref() {
                Some(capture) => capture.started_at,
                None => return EnvState::Failed,
            }
        };

        let grace = Duration::from_secs(self.failed_timeout_s.max(self.load_time.unwrap_or(0)));
        if started_at.elapsed() <= grace {
            return EnvState::Running;
        }

        match self.api.current().await {
            Ok(current) => match current.processes {
                Some(processes) if processes > 0 => EnvState::Running,
                _ => EnvState::Failed,
            },
            // An unreachable upstream is indistinguishable from a hung one
            // past the grace window.
            Err(_) => EnvState::Failed,
        }
    }

    pub fn available(&self) -> bool {
        !self.path.is_empty()
    }
}

#[cfg(test)]
#[path = "capture_tests.rs"]
mod tests;

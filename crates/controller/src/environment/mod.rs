// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment family: the runtime embodiment of an experience.
//!
//! Four variants share one contract (`start`, `stop`, `state`, `available`)
//! with lifecycle transitions enforced here, so the variants only implement
//! the bring-up and tear-down work. A new run always constructs a new
//! environment; a failed one is never restarted in place.

pub mod browser;
pub mod capture;
pub mod docker;
pub mod video;
pub mod web;

pub use browser::BrowserRunner;
pub use capture::CaptureEnvironment;
pub use docker::DockerEnvironment;
pub use video::VideoEnvironment;
pub use web::WebEnvironment;

use serde::Serialize;
use tokio::sync::RwLock;

/// Lifecycle state of one environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvState {
    Idle,
    Starting,
    Running,
    Stopping,
    Stopped,
    Failed,
}

impl EnvState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EnvironmentError {
    /// The environment can never come up (missing static path, absent
    /// image). Renders the experience unavailable.
    #[error("environment for '{id}' failed to initialize: {reason}")]
    Initialization { id: String, reason: String },

    /// Lifecycle invariant violation, e.g. starting a running environment.
    #[error("invalid transition for '{id}': {op} from {state}")]
    Transition { id: String, op: &'static str, state: &'static str },

    #[error("docker error for '{id}': {source}")]
    Docker {
        id: String,
        #[source]
        source: bollard::errors::Error,
    },

    #[error("capture service error for '{id}': {reason}")]
    Capture { id: String, reason: String },

    #[error("process error for '{id}': {source}")]
    Process {
        id: String,
        #[source]
        source: std::io::Error,
    },
}

/// One runnable instance of an experience.
pub struct Environment {
    state: RwLock<EnvState>,
    kind: EnvironmentKind,
}

enum EnvironmentKind {
    Docker(DockerEnvironment),
    Web(WebEnvironment),
    Video(VideoEnvironment),
    Capture(CaptureEnvironment),
}

impl Environment {
    pub fn docker(env: DockerEnvironment) -> Self {
        Self::with_kind(EnvironmentKind::Docker(env))
    }

    pub fn web(env: WebEnvironment) -> Self {
        Self::with_kind(EnvironmentKind::Web(env))
    }

    pub fn video(env: VideoEnvironment) -> Self {
        Self::with_kind(EnvironmentKind::Video(env))
    }

    pub fn capture(env: CaptureEnvironment) -> Self {
        Self::with_kind(EnvironmentKind::Capture(env))
    }

    fn with_kind(kind: EnvironmentKind) -> Self {
        Self { state: RwLock::new(EnvState::Idle), kind }
    }

    pub fn id(&self) -> &str {
        match &self.kind {
            EnvironmentKind::Docker(env) => env.id(),
            EnvironmentKind::Web(env) => env.id(),
            EnvironmentKind::Video(env) => env.id(),
            EnvironmentKind::Capture(env) => env.id(),
        }
    }

    pub fn is_capture(&self) -> bool {
        matches!(self.kind, EnvironmentKind::Capture(_))
    }

    /// Bring the environment up. Valid from idle, stopping, stopped, and
    /// failed; anything else is a transition error. A failure during
    /// bring-up leaves the environment failed.
    pub async fn start(&self, previous: Option<&Environment>) -> Result<(), EnvironmentError> {
        {
            let mut state = self.state.write().await;
            match *state {
                EnvState::Idle | EnvState::Stopping | EnvState::Stopped | EnvState::Failed => {}
                other => {
                    return Err(EnvironmentError::Transition {
                        id: self.id().to_owned(),
                        op: "start",
                        state: other.as_str(),
                    });
                }
            }
            *state = EnvState::Starting;
        }

        let result = match &self.kind {
            EnvironmentKind::Docker(env) => env.start().await,
            EnvironmentKind::Web(env) => env.start().await,
            EnvironmentKind::Video(env) => env.start().await,
            EnvironmentKind::Capture(env) => env.start(previous).await,
        };

        let mut state = self.state.write().await;
        match result {
            Ok(()) => {
                *state = EnvState::Running;
                Ok(())
            }
            Err(err) => {
                *state = EnvState::Failed;
                Err(err)
            }
        }
    }

    /// Bring the environment down. Valid from running, starting, and failed.
    /// `next` lets a capture environment skip clearing the shared upstream
    /// when the successor is also capture.
    pub async fn stop(&self, next: Option<&Environment>) -> Result<(), EnvironmentError> {
        {
            let mut state = self.state.write().await;
            match *state {
                EnvState::Running | EnvState::Starting | EnvState::Failed => {}
                other => {
                    return Err(EnvironmentError::Transition {
                        id: self.id().to_owned(),
                        op: "stop",
                        state: other.as_str(),
                    });
                }
            }
            *state = EnvState::Stopping;
        }

        let result = match &self.kind {
            EnvironmentKind::Docker(env) => env.stop().await,
            EnvironmentKind::Web(env) => env.stop().await,
            EnvironmentKind::Video(env) => env.stop().await,
            EnvironmentKind::Capture(env) => env.stop(next).await,
        };

        let mut state = self.state.write().await;
        match result {
            Ok(()) => {
                *state = EnvState::Stopped;
                Ok(())
            }
            Err(err) => {
                *state = EnvState::Failed;
                Err(err)
            }
        }
    }

    /// Current lifecycle state. A recorded `Running` is re-checked against
    /// the live process or container so crashes surface as `Failed`.
    pub async fn state(&self) -> EnvState {
        let recorded = *self.state.read().await;
        if recorded != EnvState::Running {
            return recorded;
        }

        let live = match &self.kind {
            EnvironmentKind::Docker(env) => env.probe().await,
            EnvironmentKind::Web(env) => env.probe().await,
            EnvironmentKind::Video(env) => env.probe().await,
            EnvironmentKind::Capture(env) => env.probe().await,
        };

        if live != EnvState::Running {
            *self.state.write().await = live;
        }
        live
    }

    /// Whether this environment could actually be instantiated right now.
    pub async fn available(&self) -> bool {
        match &self.kind {
            EnvironmentKind::Docker(env) => env.available().await,
            EnvironmentKind::Web(env) => env.available(),
            EnvironmentKind::Video(env) => env.available(),
            EnvironmentKind::Capture(env) => env.available(),
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Experience descriptors and the on-disk catalog loader.
//!
//! An experience is an immutable description of one application the display
//! can show. The `kind` field selects which environment family backs it; a
//! new environment is constructed for every run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::environment::capture::CaptureApi;
use crate::environment::{
    CaptureEnvironment, DockerEnvironment, Environment, EnvironmentError, VideoEnvironment,
    WebEnvironment,
};
use crate::ports::PortManager;
use crate::video_devices::VideoDeviceManager;

/// Default seconds the scheduler leaves an experience on screen absent other
/// signals.
pub const DEFAULT_LIFETIME_S: u64 = 60;

/// Display composition mode, forwarded to the window manager and mapped onto
/// a placard layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DisplayLayout {
    #[default]
    Full,
    Wide,
    Hd,
}

impl DisplayLayout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Wide => "wide",
            Self::Hd => "hd",
        }
    }
}

/// Kind-specific configuration, selected by the `type` field of an
/// experience config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExperienceKind {
    Docker {
        image_id: String,
        #[serde(default)]
        host_network: bool,
    },
    Web {
        #[serde(default = "default_web_url")]
        url: String,
    },
    Video {
        filename: String,
        #[serde(default)]
        scrubbing: bool,
    },
    Capture {
        path: String,
    },
}

fn default_web_url() -> String {
    "/".to_owned()
}

impl ExperienceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Docker { .. } => "docker",
            Self::Web { .. } => "web",
            Self::Video { .. } => "video",
            Self::Capture { .. } => "capture",
        }
    }
}

/// An immutable experience descriptor plus the directory it was loaded from.
#[derive(Debug, Clone, Deserialize)]
pub struct Experience {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub long_description: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default = "default_lifetime")]
    pub lifetime: u64,
    #[serde(default)]
    pub layout: DisplayLayout,
    #[serde(default)]
    pub unlisted: bool,
    #[serde(default = "default_queueable")]
    pub queueable: bool,
    /// Seconds to show the loading overlay before this experience becomes
    /// user-interactive.
    #[serde(default)]
    pub load_time: Option<u64>,
    #[serde(flatten)]
    pub kind: ExperienceKind,
    /// Directory the config was loaded from.
    #[serde(skip)]
    pub path: PathBuf,
}

fn default_lifetime() -> u64 {
    DEFAULT_LIFETIME_S
}

fn default_queueable() -> bool {
    true
}

impl Experience {
    /// Validate cross-field invariants after deserialization.
    pub fn validate(&self) -> Result<(), EnvironmentError> {
        if self.long_description.is_some() && self.description.is_none() {
            return Err(EnvironmentError::Initialization {
                id: self.id.clone(),
                reason: "long_description requires description".to_owned(),
            });
        }
        Ok(())
    }

    /// Hints shown to users about how they can interact. Derived, never
    /// configured: only videos advertise anything, based on `scrubbing`.
    pub fn action_hints(&self) -> Vec<&'static str> {
        match &self.kind {
            ExperienceKind::Video { scrubbing: true, .. } => vec!["scrub"],
            ExperienceKind::Video { scrubbing: false, .. } => vec!["play-pause"],
            _ => vec![],
        }
    }

    pub fn scrubbing(&self) -> Option<bool> {
        match &self.kind {
            ExperienceKind::Video { scrubbing, .. } => Some(*scrubbing),
            _ => None,
        }
    }

    pub fn is_docker(&self) -> bool {
        matches!(self.kind, ExperienceKind::Docker { .. })
    }

    pub fn docker_image(&self) -> Option<&str> {
        match &self.kind {
            ExperienceKind::Docker { image_id, .. } => Some(image_id),
            _ => None,
        }
    }

    /// Construct a fresh environment for one run of this experience.
    pub fn create_environment(&self, deps: &EnvironmentDeps) -> Arc<Environment> {
        let app_messaging_url =
            format!("{}/out/{}", deps.messaging_url.trim_end_matches('/'), self.id);
        let env = match &self.kind {
            ExperienceKind::Docker { image_id, host_network } => {
                Environment::docker(DockerEnvironment::new(
                    self.id.clone(),
                    image_id.clone(),
                    *host_network,
                    deps.docker.clone(),
                    Arc::clone(&deps.video_devices),
                    deps.data_dir.clone(),
                    app_messaging_url.clone(),
                ))
            }
            ExperienceKind::Web { url } => Environment::web(WebEnvironment::new(
                self.id.clone(),
                self.path.join("static"),
                url.clone(),
                deps.browser_cmd.clone(),
                app_messaging_url.clone(),
                Arc::clone(&deps.ports),
            )),
            ExperienceKind::Video { filename, .. } => Environment::video(VideoEnvironment::new(
                self.id.clone(),
                self.path.clone(),
                filename.clone(),
                deps.browser_cmd.clone(),
                app_messaging_url,
                Arc::clone(&deps.ports),
            )),
            ExperienceKind::Capture { path } => Environment::capture(CaptureEnvironment::new(
                self.id.clone(),
                path.clone(),
                Arc::clone(&deps.capture_api),
                deps.capture_shell_cmd.clone(),
                self.load_time,
                deps.capture_failed_timeout_s,
            )),
        };
        Arc::new(env)
    }
}

/// Everything an environment constructor needs from the application context.
pub struct EnvironmentDeps {
    pub docker: Option<bollard::Docker>,
    pub video_devices: Arc<VideoDeviceManager>,
    pub ports: Arc<PortManager>,
    pub capture_api: Arc<CaptureApi>,
    pub data_dir: PathBuf,
    pub browser_cmd: String,
    pub messaging_url: String,
    pub capture_shell_cmd: String,
    pub capture_failed_timeout_s: u64,
}

/// Load every experience config under `dir`. Configs that fail to parse or
/// violate invariants are logged and skipped; availability is probed later
/// so that a missing docker daemon degrades rather than empties the catalog.
pub fn load_experiences(dir: &Path) -> Vec<Experience> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(dir = %dir.display(), err = %err, "experiences directory unreadable");
            return Vec::new();
        }
    };

    let mut experiences = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        match load_experience_at(&path) {
            Ok(Some(experience)) => experiences.push(experience),
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(path = %path.display(), err = %err, "skipping experience config");
            }
        }
    }
    experiences
}

fn load_experience_at(dir: &Path) -> anyhow::Result<Option<Experience>> {
    let json_path = dir.join("config.json");
    let toml_path = dir.join("config.toml");

    let mut experience: Experience = if json_path.exists() {
        let raw = std::fs::read_to_string(&json_path)?;
        serde_json::from_str(&raw)?
    } else if toml_path.exists() {
        let raw = std::fs::read_to_string(&toml_path)?;
        toml::from_str(&raw)?
    } else {
        return Ok(None);
    };

    experience.path = dir.to_path_buf();
    experience.validate()?;
    Ok(Some(experience))
}

#[cfg(test)]
#[path = "experience_tests.rs"]
mod tests;

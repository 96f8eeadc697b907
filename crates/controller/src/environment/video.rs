// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::sync::Arc;

use super::{BrowserRunner, EnvState, EnvironmentError};
use crate::ports::PortManager;

/// Directory holding the bundled video player page, shared by all video
/// experiences.
fn player_path() -> PathBuf {
    match std::env::var_os("FT_VIDEO_PLAYER_PATH") {
        Some(path) => PathBuf::from(path),
        None => PathBuf::from("/usr/share/kiosk/video-player"),
    }
}

/// A video clip played through the bundled player page.
pub struct VideoEnvironment {
    runner: BrowserRunner,
    clip: PathBuf,
}

impl VideoEnvironment {
    pub fn new(
        id: String,
        video_path: PathBuf,
        filename: String,
        browser_cmd: String,
        app_messaging_url: String,
        ports: Arc<PortManager>,
    ) -> Self {
        let url = format!("/?url=/video/{filename}&posterUrl=/video/poster.jpg&id={id}");
        let clip = video_path.join(&filename);
        let runner = BrowserRunner::new(
            id,
            vec![("/video".to_owned(), video_path), ("/".to_owned(), player_path())],
            url,
            browser_cmd,
            app_messaging_url,
            ports,
        );
        Self { runner, clip }
    }

    pub fn id(&self) -> &str {
        self.runner.id()
    }

    pub async fn start(&self) -> Result<(), EnvironmentError> {
        if !self.clip.exists() {
            return Err(EnvironmentError::Initialization {
                id: self.runner.id().to_owned(),
                reason: format!("video file missing: {}", self.clip.display()),
            });
        }
        self.runner.start().await
    }

    pub async fn stop(&self) -> Result<(), EnvironmentError> {
        self.runner.stop().await
    }

    pub async fn probe(&self) -> EnvState {
        self.runner.probe().await
    }

    pub fn available(&self) -> bool {
        self.runner.routes_exist() && self.clip.exists()
    }
}

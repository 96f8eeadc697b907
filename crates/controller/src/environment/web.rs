// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::sync::Arc;

use super::{BrowserRunner, EnvState, EnvironmentError};
use crate::ports::PortManager;

/// A locally-served web app shown in the kiosk browser.
pub struct WebEnvironment {
    runner: BrowserRunner,
}

impl WebEnvironment {
    pub fn new(
        id: String,
        static_path: PathBuf,
        url: String,
        browser_cmd: String,
        app_messaging_url: String,
        ports: Arc<PortManager>,
    ) -> Self {
        let runner = BrowserRunner::new(
            id,
            vec![("/".to_owned(), static_path)],
            url,
            browser_cmd,
            app_messaging_url,
            ports,
        );
        Self { runner }
    }

    pub fn id(&self) -> &str {
        self.runner.id()
    }

    pub async fn start(&self) -> Result<(), EnvironmentError> {
        self.runner.start().await
    }

    pub async fn stop(&self) -> Result<(), EnvironmentError> {
        self.runner.stop().await
    }

    pub async fn probe(&self) -> EnvState {
        self.runner.probe().await
    }

    pub fn available(&self) -> bool {
        self.runner.routes_exist()
    }
}

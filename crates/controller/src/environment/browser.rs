// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Static file server + kiosk browser pair backing web and video
//! experiences.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;

use super::{EnvState, EnvironmentError};
use crate::ports::PortManager;
use crate::process::kill_mercilessly;

/// Serves the experience's static routes on a reserved local port and points
/// a kiosk browser at them. The messaging socket URL rides along as the
/// `ftMsgUrl` query parameter.
pub struct BrowserRunner {
    id: String,
    routes: Vec<(String, PathBuf)>,
    url: String,
    browser_cmd: String,
    app_messaging_url: String,
    ports: Arc<PortManager>,
    running: Mutex<Option<RunningBrowser>>,
}

struct RunningBrowser {
    port: u16,
    child: Child,
    server_cancel: CancellationToken,
}

impl BrowserRunner {
    pub fn new(
        id: String,
        routes: Vec<(String, PathBuf)>,
        url: String,
        browser_cmd: String,
        app_messaging_url: String,
        ports: Arc<PortManager>,
    ) -> Self {
        Self { id, routes, url, browser_cmd, app_messaging_url, ports, running: Mutex::new(None) }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether every static route points at an existing directory.
    pub fn routes_exist(&self) -> bool {
        self.routes.iter().all(|(_, path)| path.exists())
    }

    /// Port the static server is bound to, while running.
    pub async fn port(&self) -> Option<u16> {
        self.running.lock().await.as_ref().map(|running| running.port)
    }

    pub async fn start(&self) -> Result<(), EnvironmentError> {
        for (_, path) in &self.routes {
            if !path.exists() {
                return Err(EnvironmentError::Initialization {
                    id: self.id.clone(),
                    reason: format!("static path missing: {}", path.display()),
                });
            }
        }

        let port = self.ports.reserve().map_err(|source| EnvironmentError::Process {
            id: self.id.clone(),
            source,
        })?;

        let server_cancel = CancellationToken::new();
        self.serve_static(port, server_cancel.clone()).await?;

        let child = self.spawn_browser(port)?;
        *self.running.lock().await = Some(RunningBrowser { port, child, server_cancel });
        Ok(())
    }

    pub async fn stop(&self) -> Result<(), EnvironmentError> {
        let Some(mut running) = self.running.lock().await.take() else {
            return Ok(());
        };

        kill_mercilessly(&mut running.child).await;
        running.server_cancel.cancel();
        self.ports.release(running.port);
        Ok(())
    }

    /// Running only while the browser child is alive.
    pub async fn probe(&self) -> EnvState {
        let mut running = self.running.lock().await;
        match running.as_mut() {
            Some(browser) => match browser.child.try_wait() {
                Ok(None) => EnvState::Running,
                Ok(Some(status)) => {
                    tracing::warn!(experience = %self.id, %status, "browser exited unexpectedly");
                    EnvState::Failed
                }
                Err(_) => EnvState::Failed,
            },
            None => EnvState::Failed,
        }
    }

    async fn serve_static(
        &self,
        port: u16,
        cancel: CancellationToken,
    ) -> Result<(), EnvironmentError> {
        let mut router = axum::Router::new();
        for (prefix, path) in &self.routes {
            if prefix == "/" {
                router = router.fallback_service(ServeDir::new(path));
            } else {
                router = router.nest_service(prefix, ServeDir::new(path));
            }
        }

        let listener = TcpListener::bind(("127.0.0.1", port)).await.map_err(|source| {
            EnvironmentError::Process { id: self.id.clone(), source }
        })?;

        let id = self.id.clone();
        tokio::spawn(async move {
            let serve = axum::serve(listener, router).with_graceful_shutdown(cancel.cancelled_owned());
            if let Err(err) = serve.await {
                tracing::warn!(experience = %id, err = %err, "static server exited with error");
            }
        });
        Ok(())
    }

    fn spawn_browser(&self, port: u16) -> Result<Child, EnvironmentError> {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        let target = format!(
            "http://localhost:{port}{}{separator}ftMsgUrl={}",
            self.url,
            percent_encode(&self.app_messaging_url),
        );

        let mut command = Command::new(&self.browser_cmd);
        command
            .arg("--kiosk")
            .arg(format!("--user-data-dir=/tmp/kiosk-browser-data/{}", self.id))
            // Prevent the make-default-browser prompt.
            .arg("--no-first-run")
            // Allow videos to play without user interaction.
            .arg("--autoplay-policy=no-user-gesture-required")
            // Allow cross-origin requests against the messaging socket.
            .arg("--disable-web-security")
            .arg(&target)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        command
            .spawn()
            .map_err(|source| EnvironmentError::Process { id: self.id.clone(), source })
    }
}

/// Percent-encode a query-parameter value.
fn percent_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char);
            }
            other => {
                encoded.push('%');
                encoded.push_str(&format!("{other:02X}"));
            }
        }
    }
    encoded
}

#[cfg(test)]
#[path = "browser_tests.rs"]
mod tests;

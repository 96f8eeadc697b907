// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness for the end-to-end scenario tests.
//!
//! Each scenario gets a full controller process-in-miniature: a real HTTP +
//! WebSocket listener, a catalog of capture experiences in a temp directory,
//! and a stub capture service. Capture experiences keep everything headless:
//! their "environment" is an HTTP call plus a `sleep` child.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::Json;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use kiosk::config::ControllerConfig;
use kiosk::controller::Controller;
use kiosk::messaging::registry::ConnectionRegistry;
use kiosk::state::AppContext;
use kiosk::transport::build_router;

/// Stub capture service. `processes` is adjustable so scenarios can simulate
/// a dead upstream.
pub struct CaptureStub {
    pub processes: AtomicU32,
}

async fn capture_get(State(stub): State<Arc<CaptureStub>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "id": null,
        "processes": stub.processes.load(Ordering::Relaxed),
    }))
}

async fn capture_put(Json(_body): Json<serde_json::Value>) -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

pub async fn serve_capture_stub() -> anyhow::Result<(String, Arc<CaptureStub>)> {
    let stub = Arc::new(CaptureStub { processes: AtomicU32::new(1) });
    let router = axum::Router::new()
        .route("/current", get(capture_get).put(capture_put))
        .with_state(Arc::clone(&stub));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok((format!("http://{addr}"), stub))
}

/// Write one capture experience config into the harness data directory.
pub fn write_experience(
    data_dir: &std::path::Path,
    id: &str,
    lifetime: u64,
    load_time: Option<u64>,
) -> anyhow::Result<()> {
    let dir = data_dir.join("experiences").join(id);
    std::fs::create_dir_all(&dir)?;
    let mut config = serde_json::json!({
        "id": id,
        "title": id.to_uppercase(),
        "type": "capture",
        "path": format!("C:/shows/{id}"),
        "lifetime": lifetime,
    });
    if let Some(load_time) = load_time {
        config["load_time"] = serde_json::json!(load_time);
    }
    std::fs::write(dir.join("config.json"), serde_json::to_vec_pretty(&config)?)?;
    Ok(())
}

pub struct Harness {
    pub base_url: String,
    pub ws_url: String,
    pub ctx: Arc<AppContext>,
    pub capture: Arc<CaptureStub>,
    _data_dir: tempfile::TempDir,
}

pub struct HarnessOptions {
    /// Seconds before the boot-time empty transition; scenarios that don't
    /// exercise it push it out of the way.
    pub initial_empty_delay_s: u64,
    pub capture_failed_timeout_s: u64,
    pub spawn_background_loops: bool,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            initial_empty_delay_s: 3600,
            capture_failed_timeout_s: 30,
            spawn_background_loops: false,
        }
    }
}

/// Boot a controller with the given catalog writer and serve it on an
/// ephemeral port.
pub async fn boot(
    options: HarnessOptions,
    write_catalog: impl FnOnce(&std::path::Path) -> anyhow::Result<()>,
) -> anyhow::Result<Harness> {
    let data_dir = tempfile::tempdir()?;
    write_catalog(data_dir.path())?;
    let (capture_url, capture) = serve_capture_stub().await?;

    let config = Arc::new(
        ControllerConfig::try_parse_from([
            "kioskd",
            "--data-path",
            &data_dir.path().display().to_string(),
            "--capture-api-url",
            &capture_url,
            "--capture-shell-cmd",
            "sleep 30",
            "--loader-cmd",
            "sleep 30",
            "--disable-wm",
            "--disable-placard",
            "--initial-empty-delay-s",
            &options.initial_empty_delay_s.to_string(),
            "--capture-failed-timeout-s",
            &options.capture_failed_timeout_s.to_string(),
        ])
        .map_err(|err| anyhow::anyhow!("{err}"))?,
    );

    let shutdown = CancellationToken::new();
    let controller = Arc::new(Controller::new(Arc::clone(&config), None));
    controller.load_from_fs().await;
    if options.spawn_background_loops {
        controller.spawn_background_loops(shutdown.clone());
    }

    let ctx = Arc::new(AppContext::new(
        config,
        controller,
        Arc::new(ConnectionRegistry::new()),
        shutdown,
    ));
    kiosk::messaging::spawn_heartbeat_loop(Arc::clone(&ctx));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let router = build_router(Arc::clone(&ctx));
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    Ok(Harness {
        base_url: format!("http://{addr}"),
        ws_url: format!("ws://{addr}"),
        ctx,
        capture,
        _data_dir: data_dir,
    })
}

impl Harness {
    pub async fn get_current(&self) -> anyhow::Result<serde_json::Value> {
        Ok(reqwest::get(format!("{}/current", self.base_url)).await?.json().await?)
    }
}

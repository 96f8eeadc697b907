// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kiosk controller: the control plane for a public interactive display.
//!
//! One process owns the lifecycle of the currently-running experience,
//! transitions between experiences, the real-time message bus between
//! experiences and their on-display clients, and the auxiliary display
//! surfaces (placard, window manager, loading overlay).

pub mod auth;
pub mod colors;
pub mod config;
pub mod controller;
pub mod current;
pub mod environment;
pub mod error;
pub mod experience;
pub mod groupings;
pub mod loader;
pub mod messaging;
pub mod placard;
pub mod ports;
pub mod process;
pub mod screenshot;
pub mod stability;
pub mod state;
pub mod transport;
pub mod video_devices;
pub mod wm;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::ControllerConfig;
use crate::controller::Controller;
use crate::messaging::registry::ConnectionRegistry;
use crate::state::AppContext;
use crate::transport::build_router;

/// Run the controller daemon until shutdown.
pub async fn run(config: ControllerConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let config = Arc::new(config);
    let shutdown = CancellationToken::new();

    if config.error_report_token.is_some() {
        tracing::info!("error report token set; reports go to structured logs");
    }

    let docker = match bollard::Docker::connect_with_local_defaults() {
        Ok(docker) => Some(docker),
        Err(err) => {
            tracing::warn!(err = %err, "docker daemon unavailable, docker experiences disabled");
            None
        }
    };

    let controller = Arc::new(Controller::new(Arc::clone(&config), docker));
    controller.load_from_fs().await;
    controller.spawn_background_loops(shutdown.clone());

    let registry = Arc::new(ConnectionRegistry::new());
    let ctx = Arc::new(AppContext::new(
        Arc::clone(&config),
        Arc::clone(&controller),
        registry,
        shutdown.clone(),
    ));
    messaging::spawn_heartbeat_loop(Arc::clone(&ctx));

    // Cancel on ctrl-c / SIGTERM so teardown below always runs.
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            shutdown.cancel();
        });
    }

    tracing::info!(%addr, "kiosk controller listening");
    let router = build_router(ctx);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned()).await?;

    // Containers and browsers must not outlive the daemon.
    controller.shutdown_current().await;
    Ok(())
}

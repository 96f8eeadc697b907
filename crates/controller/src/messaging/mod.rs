// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Real-time message bus between running experiences and their on-display
//! clients.

pub mod protocol;
pub mod registry;
pub mod ws;

use std::sync::Arc;
use std::time::Duration;

use crate::state::AppContext;

/// Heartbeat cadence for both directions.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(500);

/// Spawn the router heartbeat. Every tick each app gets one roster frame
/// listing its connected clients, and each client gets one app-liveness
/// frame. A client that connects mid-sweep is picked up on the next tick.
pub fn spawn_heartbeat_loop(ctx: Arc<AppContext>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ctx.shutdown.cancelled() => break,
                _ = interval.tick() => {}
            }

            for (app_id, app) in ctx.registry.apps().await {
                let clients = ctx.registry.client_ids(&app_id).await;
                let roster = protocol::WireMessage::client_heartbeat(true, clients);
                // A closed queue means the connection is tearing down; its
                // own loop handles removal.
                let _ = app.tx.send(registry::AppBound::Direct(roster));
            }

            for (app_id, client) in ctx.registry.clients().await {
                let up = ctx.registry.app_connected(&app_id).await;
                let _ = client.tx.send(protocol::WireMessage::app_heartbeat(up));
            }
        }
    });
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kiosk timer: the playlist scheduler.
//!
//! An independent process that decides when to advance the display, mixing
//! the main rotation with a periodic commercial rotation and honoring app
//! locks, interaction timestamps, lifetimes, and app-set end times. It talks
//! to the controller exclusively through the operator HTTP API.

pub mod api;
pub mod config;
pub mod models;
pub mod playlist;
pub mod timer;

use crate::api::TimerApi;
use crate::config::TimerConfig;
use crate::timer::Timer;

/// Run the scheduler loop until the process is killed. Controller downtime
/// is logged and retried on the next tick; the loop itself never dies.
pub async fn run(config: TimerConfig) -> anyhow::Result<()> {
    let mut timer = Timer::new(TimerApi::new(config.controller_url.clone()));
    let mut interval = tokio::time::interval(config.tick_interval());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    tracing::info!(url = %config.controller_url, "scheduler started");
    loop {
        interval.tick().await;
        if let Err(err) = timer.advance_if_ready().await {
            tracing::warn!(err = %err, "tick failed");
        }
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

/// Configuration for the playlist scheduler.
#[derive(Debug, Clone, clap::Parser)]
pub struct TimerConfig {
    /// Controller base URL.
    #[arg(long, default_value = "http://localhost:8000", env = "FT_CONTROLLER_URL")]
    pub controller_url: String,

    /// Tick interval in milliseconds.
    #[arg(long, default_value_t = 1000, env = "FT_TIMER_TICK_MS")]
    pub tick_ms: u64,
}

impl TimerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

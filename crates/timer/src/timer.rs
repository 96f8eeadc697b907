// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The playlist scheduler's advance rules.

use std::time::{Duration, Instant};

use crate::api::TimerApi;
use crate::models::CurrentExperience;

/// At most one commercial per this many seconds.
pub const COMMERCIAL_INTERVAL_S: u64 = 3 * 60;

/// A client interaction holds the current experience for this long.
pub const INTERACTION_TIMEOUT_S: u64 = 30;

pub struct Timer {
    api: TimerApi,
    last_commercial_at: Instant,
    commercial_interval: Duration,
}

impl Timer {
    pub fn new(api: TimerApi) -> Self {
        Self {
            api,
            last_commercial_at: Instant::now(),
            commercial_interval: Duration::from_secs(COMMERCIAL_INTERVAL_S),
        }
    }

    /// Override the commercial cadence.
    pub fn with_commercial_interval(mut self, interval: Duration) -> Self {
        self.commercial_interval = interval;
        self
    }

    /// One scheduler tick: read the controller, decide, maybe advance.
    pub async fn advance_if_ready(&mut self) -> anyhow::Result<()> {
        let current = self.api.current().await?;
        let now_ms = epoch_ms();
        if !should_advance(current.as_ref(), now_ms) {
            return Ok(());
        }
        self.advance().await
    }

    /// Push the next pick. Commercials cut in on their cadence; everything
    /// else comes off the main rotation. A lost throttle race is left for
    /// the next tick.
    pub async fn advance(&mut self) -> anyhow::Result<()> {
        let commercial_due = !self.api.commercials.is_empty()
            && self.last_commercial_at.elapsed() >= self.commercial_interval;

        let next = if commercial_due {
            match self.api.commercials.pop() {
                Some(commercial) => {
                    self.last_commercial_at = Instant::now();
                    Some(commercial)
                }
                None => self.api.experiences.pop(),
            }
        } else {
            self.api.experiences.pop()
        };

        let Some(next) = next else {
            tracing::debug!("nothing to advance to");
            return Ok(());
        };
        self.api.set_current(&next.id).await?;
        Ok(())
    }
}

/// Decide whether the rotation should move on. Rule order matters: locks
/// dominate everything, an app-set end time dominates lifetime, and recent
/// interaction extends the stay.
pub fn should_advance(current: Option<&CurrentExperience>, now_ms: u64) -> bool {
    let Some(current) = current else {
        return true;
    };

    if current.lock.engaged() {
        return false;
    }

    // The lock was just released; rotate away immediately.
    if current.last_lock_update.is_some() {
        return true;
    }

    if let Some(end_time) = current.end_time {
        return now_ms > end_time;
    }

    if let Some(last_interaction) = current.last_interaction {
        if now_ms <= last_interaction + INTERACTION_TIMEOUT_S * 1000 {
            return false;
        }
    }

    if let Some(start_time) = current.start_time {
        if now_ms.saturating_sub(start_time) < current.experience.lifetime * 1000 {
            return false;
        }
    }

    true
}

pub fn epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;

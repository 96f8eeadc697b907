// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The currently-running experience and its app-controlled lock.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::environment::Environment;
use crate::experience::Experience;
use crate::state::epoch_ms;

/// App-controlled lock value.
///
/// `false` means unlocked, `true` means closed to new connections, and an
/// integer n ≥ 1 is an app-provided connection budget. The router surfaces
/// the integer but does not police a count; any value other than `false`
/// holds the scheduler in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LockStatus {
    Flag(bool),
    Limit(u32),
}

impl LockStatus {
    pub fn engaged(&self) -> bool {
        match self {
            Self::Flag(flag) => *flag,
            Self::Limit(n) => *n > 0,
        }
    }
}

impl Default for LockStatus {
    fn default() -> Self {
        Self::Flag(false)
    }
}

/// Lock state plus the timestamp of its last toggle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Lock {
    pub status: LockStatus,
    pub last_update: Option<u64>,
}

impl Lock {
    /// Apply a new status. Setting the current value is a no-op; any actual
    /// toggle stamps `last_update` with the current wall clock. Stamps are
    /// strictly monotonic even when two toggles land in the same millisecond.
    pub fn set_status(&mut self, status: LockStatus) {
        if self.status == status {
            return;
        }
        let now = epoch_ms();
        let stamp = match self.last_update {
            Some(prev) if now <= prev => prev + 1,
            _ => now,
        };
        self.status = status;
        self.last_update = Some(stamp);
    }
}

/// The active experience: descriptor, its running environment, and the
/// per-run fields the app and the messaging router maintain.
pub struct CurrentExperience {
    pub experience: Arc<Experience>,
    pub environment: Arc<Environment>,
    /// Wall-clock ms at successful start.
    pub start_time: u64,
    /// Optional per-run deadline set by the app itself, wall-clock ms.
    pub end_time: Option<u64>,
    /// Last time a client message arrived, wall-clock ms.
    pub last_interaction: Option<u64>,
    pub lock: Lock,
}

impl CurrentExperience {
    pub fn new(experience: Arc<Experience>, environment: Arc<Environment>) -> Self {
        Self {
            experience,
            environment,
            start_time: epoch_ms(),
            end_time: None,
            last_interaction: None,
            lock: Lock::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.experience.id
    }
}

#[cfg(test)]
#[path = "current_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DTOs mirroring the controller's operator API JSON.

use serde::{Deserialize, Serialize};

/// Lock value as the controller serializes it: `false`/`true` or an integer
/// connection budget. Anything other than `false` (or `0`) holds rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LockValue {
    Flag(bool),
    Limit(u32),
}

impl LockValue {
    pub fn engaged(&self) -> bool {
        match self {
            Self::Flag(flag) => *flag,
            Self::Limit(n) => *n > 0,
        }
    }
}

impl Default for LockValue {
    fn default() -> Self {
        Self::Flag(false)
    }
}

/// One catalog entry from `GET /experiences`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub id: String,
    #[serde(default)]
    pub unlisted: bool,
    #[serde(default)]
    pub queueable: bool,
    #[serde(default)]
    pub collection: Option<String>,
    pub lifetime: u64,
    pub title: String,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// The running experience from `GET /current`. Timestamps are wall-clock
/// milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentExperience {
    #[serde(flatten)]
    pub experience: Experience,
    #[serde(default)]
    pub end_time: Option<u64>,
    #[serde(default)]
    pub start_time: Option<u64>,
    #[serde(default)]
    pub last_interaction: Option<u64>,
    #[serde(default)]
    pub last_lock_update: Option<u64>,
    #[serde(default)]
    pub lock: LockValue,
    pub last_update: u64,
}

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;

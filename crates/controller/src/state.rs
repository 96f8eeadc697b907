// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::ControllerConfig;
use crate::controller::Controller;
use crate::messaging::registry::ConnectionRegistry;

/// Shared application context. Constructed once at startup and handed by
/// reference to everything that used to be a process-wide singleton.
pub struct AppContext {
    pub config: Arc<ControllerConfig>,
    pub controller: Arc<Controller>,
    pub registry: Arc<ConnectionRegistry>,
    pub shutdown: CancellationToken,
}

impl AppContext {
    pub fn new(
        config: Arc<ControllerConfig>,
        controller: Arc<Controller>,
        registry: Arc<ConnectionRegistry>,
        shutdown: CancellationToken,
    ) -> Self {
        Self { config, controller, registry, shutdown }
    }
}

/// Return current epoch millis.
pub fn epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

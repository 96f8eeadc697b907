// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local port reservations for experience static servers.

use std::net::TcpListener;
use std::sync::Mutex;

/// Hands out OS-probed free ports. Reservations are advisory: the OS may
/// reuse a port between release and the next bind, which is benign because
/// every reservation re-probes with a fresh bind.
#[derive(Debug, Default)]
pub struct PortManager {
    bound: Mutex<Vec<u16>>,
}

impl PortManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a free port by binding port zero and recording the result.
    pub fn reserve(&self) -> std::io::Result<u16> {
        let listener = TcpListener::bind(("127.0.0.1", 0))?;
        let port = listener.local_addr()?.port();
        drop(listener);

        if let Ok(mut bound) = self.bound.lock() {
            bound.push(port);
        }
        Ok(port)
    }

    /// Release a previously reserved port.
    pub fn release(&self, port: u16) {
        let Ok(mut bound) = self.bound.lock() else {
            return;
        };
        match bound.iter().position(|p| *p == port) {
            Some(index) => {
                bound.swap_remove(index);
            }
            None => {
                tracing::warn!(port, "attempted to release unregistered port");
            }
        }
    }

    pub fn reserved(&self) -> Vec<u16> {
        self.bound.lock().map(|bound| bound.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "ports_tests.rs"]
mod tests;

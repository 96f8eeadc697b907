// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Window-manager client.
//!
//! The window manager arranges on-screen surfaces. Commands are
//! newline-delimited JSON over a paired TCP socket; the manager answers each
//! command with one JSON line.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::experience::DisplayLayout;
use crate::state::epoch_ms;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WmCommand {
    /// Apply `layout` once the wall clock passes `after`.
    Layout { layout: String, after: u64 },
    /// Drop the experience viewport contents before the wall clock passes
    /// `before`.
    ClearViewport { before: u64 },
}

pub struct WmClient {
    addr: String,
}

impl WmClient {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    /// Announce the next experience's composition mode.
    pub async fn set_layout(&self, layout: DisplayLayout) {
        let command =
            WmCommand::Layout { layout: layout.as_str().to_owned(), after: epoch_ms() };
        self.send(&command).await;
    }

    /// Clear the viewport ahead of the incoming experience.
    pub async fn clear_viewport(&self) {
        let command = WmCommand::ClearViewport { before: epoch_ms() };
        self.send(&command).await;
    }

    /// Send one command. Transient failures are retried once after a second
    /// and then swallowed so a wedged window manager can't stall a
    /// transition.
    async fn send(&self, command: &WmCommand) {
        if let Err(first) = self.send_once(command).await {
            tracing::warn!(err = %first, "window manager send failed, retrying in 1s");
            tokio::time::sleep(Duration::from_secs(1)).await;
            if let Err(second) = self.send_once(command).await {
                tracing::warn!(err = %second, "window manager send failed again, giving up");
            }
        }
    }

    async fn send_once(&self, command: &WmCommand) -> anyhow::Result<()> {
        let stream = TcpStream::connect(&self.addr).await?;
        let (read_half, mut write_half) = stream.into_split();

        let mut line = serde_json::to_string(command)?;
        line.push('\n');
        write_half.write_all(line.as_bytes()).await?;

        let mut reply = String::new();
        let mut reader = BufReader::new(read_half);
        reader.read_line(&mut reply).await?;
        let _: serde_json::Value = serde_json::from_str(reply.trim_end())?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "wm_tests.rs"]
mod tests;

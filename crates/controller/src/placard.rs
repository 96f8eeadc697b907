// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Placard client.
//!
//! The placard is a side panel showing the current experience's title and
//! description plus a QR code with a rotating access URL. It listens with a
//! small HTTP server on a Unix-domain socket under `XDG_RUNTIME_DIR`; each
//! call here is a one-shot http1 exchange over that socket.

use std::path::PathBuf;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::Method;
use hyper_util::rt::TokioIo;
use serde::{Deserialize, Serialize};
use tokio::net::UnixStream;

use crate::experience::DisplayLayout;

/// How the placard composes itself next to the running experience.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacardLayout {
    Full,
    Slim,
    Hidden,
}

impl PlacardLayout {
    /// Placard layout implied by the display layout: a fullscreen experience
    /// hides the placard, the wide composition leaves a slim strip, and the
    /// hd composition leaves the full panel.
    pub fn from_display_layout(layout: DisplayLayout) -> Self {
        match layout {
            DisplayLayout::Full => Self::Hidden,
            DisplayLayout::Wide => Self::Slim,
            DisplayLayout::Hd => Self::Full,
        }
    }
}

/// Experience fields shown on the panel. All fields are always sent so a
/// stale artist or description can never survive a transition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacardExperience {
    pub title: Option<String>,
    pub description: Option<String>,
    pub artist: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacardUrl {
    pub url: Option<String>,
}

pub struct PlacardClient {
    socket_path: PathBuf,
}

impl PlacardClient {
    /// Client against the conventional socket path,
    /// `$XDG_RUNTIME_DIR/placard/socket`.
    pub fn from_runtime_dir() -> Self {
        let runtime_dir = std::env::var_os("XDG_RUNTIME_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/run"));
        Self { socket_path: runtime_dir.join("placard").join("socket") }
    }

    pub fn with_socket_path(socket_path: PathBuf) -> Self {
        Self { socket_path }
    }

    pub async fn experience(&self) -> anyhow::Result<PlacardExperience> {
        let value = self.request(Method::GET, "/experience", None).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn set_experience(&self, data: &PlacardExperience) -> anyhow::Result<()> {
        self.request(Method::PUT, "/experience", Some(serde_json::to_value(data)?)).await?;
        Ok(())
    }

    pub async fn url(&self) -> anyhow::Result<PlacardUrl> {
        let value = self.request(Method::GET, "/url", None).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn set_url(&self, url: &str) -> anyhow::Result<()> {
        let body = serde_json::to_value(PlacardUrl { url: Some(url.to_owned()) })?;
        self.request(Method::PUT, "/url", Some(body)).await?;
        Ok(())
    }

    pub async fn set_layout(&self, layout: PlacardLayout) -> anyhow::Result<()> {
        let body = serde_json::json!({ "layout": layout });
        self.request(Method::PUT, "/layout", Some(body)).await?;
        Ok(())
    }

    pub async fn set_action_hints(&self, hints: &[&str]) -> anyhow::Result<()> {
        let body = serde_json::json!({ "hints": hints });
        self.request(Method::PUT, "/action-hints", Some(body)).await?;
        Ok(())
    }

    /// One-shot http1 exchange over the placard socket.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> anyhow::Result<serde_json::Value> {
        let stream = UnixStream::connect(&self.socket_path).await?;
        let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;
        tokio::spawn(async move {
            let _ = connection.await;
        });

        let payload = match body {
            Some(value) => serde_json::to_vec(&value)?,
            None => Vec::new(),
        };
        let request = hyper::Request::builder()
            .method(method)
            .uri(path)
            .header(hyper::header::HOST, "localhost")
            .header(hyper::header::CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(payload)))?;

        let response = sender.send_request(request).await?;
        let status = response.status();
        let collected = response.into_body().collect().await?.to_bytes();
        if !status.is_success() {
            anyhow::bail!("placard returned {status} for {path}");
        }
        if collected.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_slice(&collected)?)
    }
}

#[cfg(test)]
#[path = "placard_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection registry: experience id → app socket + client sockets.
//!
//! Clients may register under an experience id whose app is not connected;
//! the app map only ever holds live app connections. Entries carry the
//! sending half of each connection's queue, so anything holding the registry
//! can push frames without touching the socket.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};

use super::protocol::WireMessage;

/// A frame on its way to an app socket.
#[derive(Debug, Clone)]
pub enum AppBound {
    /// Forwarded from a client; the source id is stamped into the frame.
    FromClient { client_id: String, message: WireMessage },
    /// Router-originated (heartbeats, client-down notices).
    Direct(WireMessage),
}

/// Send side of an app connection.
#[derive(Clone)]
pub struct AppHandle {
    /// Distinguishes this connection from a replacement under the same id.
    pub conn_id: u64,
    pub tx: mpsc::UnboundedSender<AppBound>,
}

/// Send side of a client connection.
#[derive(Clone)]
pub struct ClientHandle {
    pub client_id: String,
    pub tx: mpsc::UnboundedSender<WireMessage>,
    /// Until the app accepts, everything except connection requests is
    /// blocked.
    pub accepted: Arc<AtomicBool>,
}

impl ClientHandle {
    pub fn is_accepted(&self) -> bool {
        self.accepted.load(Ordering::Acquire)
    }
}

#[derive(Default)]
pub struct ConnectionRegistry {
    apps: RwLock<HashMap<String, AppHandle>>,
    clients: RwLock<HashMap<String, HashMap<String, ClientHandle>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an app connection, replacing any predecessor under the same
    /// id. The predecessor's queue closes, which ends its loops.
    pub async fn add_app(&self, app_id: &str, handle: AppHandle) {
        self.apps.write().await.insert(app_id.to_owned(), handle);
    }

    /// Remove an app connection, but only if `conn_id` still matches: a
    /// replaced connection must not tear down its successor's entry.
    pub async fn remove_app(&self, app_id: &str, conn_id: u64) {
        let mut apps = self.apps.write().await;
        if apps.get(app_id).map(|handle| handle.conn_id) == Some(conn_id) {
            apps.remove(app_id);
        }
    }

    pub async fn app(&self, app_id: &str) -> Option<AppHandle> {
        self.apps.read().await.get(app_id).cloned()
    }

    pub async fn app_connected(&self, app_id: &str) -> bool {
        self.apps.read().await.contains_key(app_id)
    }

    pub async fn add_client(&self, app_id: &str, handle: ClientHandle) {
        self.clients
            .write()
            .await
            .entry(app_id.to_owned())
            .or_default()
            .insert(handle.client_id.clone(), handle);
    }

    pub async fn remove_client(&self, app_id: &str, client_id: &str) {
        let mut clients = self.clients.write().await;
        if let Some(for_app) = clients.get_mut(app_id) {
            for_app.remove(client_id);
            if for_app.is_empty() {
                clients.remove(app_id);
            }
        }
    }

    pub async fn client(&self, app_id: &str, client_id: &str) -> Option<ClientHandle> {
        self.clients.read().await.get(app_id).and_then(|for_app| for_app.get(client_id)).cloned()
    }

    /// Ids of every client currently registered under an app.
    pub async fn client_ids(&self, app_id: &str) -> Vec<String> {
        self.clients
            .read()
            .await
            .get(app_id)
            .map(|for_app| for_app.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot of all app connections.
    pub async fn apps(&self) -> Vec<(String, AppHandle)> {
        self.apps.read().await.iter().map(|(id, handle)| (id.clone(), handle.clone())).collect()
    }

    /// Snapshot of all client connections, tagged with their app id.
    pub async fn clients(&self) -> Vec<(String, ClientHandle)> {
        self.clients
            .read()
            .await
            .iter()
            .flat_map(|(app_id, for_app)| {
                for_app.values().map(move |handle| (app_id.clone(), handle.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;

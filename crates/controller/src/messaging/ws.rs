// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket endpoints for the messaging router.
//!
//! `/messaging/out/{id}` is the app side (one per experience),
//! `/messaging/in/{id}` the client side (many per experience). Each
//! connection runs one loop that interleaves its receive path with draining
//! its send queue; when either side finishes, the connection tears down once
//! and leaves the registry.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use super::protocol::{self, ProtocolError, WireMessage};
use super::registry::{AppBound, AppHandle, ClientHandle};
use crate::state::AppContext;

/// `GET /messaging/out/{id}`: the app connection for an experience.
pub async fn app_ws_handler(
    State(ctx): State<Arc<AppContext>>,
    Path(experience_id): Path<String>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_app(ctx, experience_id, socket))
}

/// `GET /messaging/in/{id}`: a client connection; the router assigns the
/// client id.
pub async fn client_ws_handler(
    State(ctx): State<Arc<AppContext>>,
    Path(experience_id): Path<String>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_client(ctx, experience_id, socket))
}

fn next_conn_id() -> u64 {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

// -- App side -----------------------------------------------------------------

async fn handle_app(ctx: Arc<AppContext>, experience_id: String, socket: WebSocket) {
    let conn_id = next_conn_id();
    let (tx, mut rx) = mpsc::unbounded_channel();
    ctx.registry.add_app(&experience_id, AppHandle { conn_id, tx: tx.clone() }).await;
    tracing::info!(experience = %experience_id, "app connected");

    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            queued = rx.recv() => {
                let Some(queued) = queued else { break };
                let text = match queued {
                    AppBound::FromClient { client_id, message } => {
                        protocol::serialize_for_app(&message, &client_id)
                    }
                    AppBound::Direct(message) => protocol::serialize(&message),
                };
                if ws_tx.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            incoming = ws_rx.next() => {
                let text = match incoming {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => continue,
                };
                let message = match protocol::deserialize(&text) {
                    Ok(message) => message,
                    Err(err) => {
                        log_protocol_error(&experience_id, "app", &err);
                        continue;
                    }
                };
                handle_app_message(&ctx, &experience_id, &tx, message).await;
            }
        }
    }

    ctx.registry.remove_app(&experience_id, conn_id).await;
    tracing::info!(experience = %experience_id, "app disconnected");
}

/// Dispatch one frame received from the app.
async fn handle_app_message(
    ctx: &AppContext,
    experience_id: &str,
    app_tx: &mpsc::UnboundedSender<AppBound>,
    message: WireMessage,
) {
    match message {
        WireMessage::AppClient { client: Some(ref client_id), .. } => {
            route_to_client(ctx, experience_id, app_tx, client_id.clone(), message).await;
        }
        WireMessage::AppClient { client: None, .. } => {
            tracing::warn!(
                experience = %experience_id,
                "app sent client-bound frame without a client id, dropping"
            );
        }
        WireMessage::Access { ref client, .. } => {
            route_to_client(ctx, experience_id, app_tx, client.clone(), message.clone()).await;
        }
        WireMessage::DisplaySettings { settings, .. } => {
            if let Err(err) = ctx.controller.apply_display_settings(experience_id, settings).await {
                tracing::warn!(experience = %experience_id, err = %err, "display settings rejected");
            }
        }
        WireMessage::Lifecycle { paused, .. } => {
            ctx.controller.note_lifecycle(experience_id, paused).await;
        }
        other => {
            tracing::warn!(
                experience = %experience_id,
                kind = ?other,
                "unhandled frame kind from app, dropping"
            );
        }
    }
}

/// Deliver an app frame to one client. A missing client elicits exactly one
/// client-down heartbeat back to the app and the frame is dropped.
async fn route_to_client(
    ctx: &AppContext,
    experience_id: &str,
    app_tx: &mpsc::UnboundedSender<AppBound>,
    client_id: String,
    message: WireMessage,
) {
    match ctx.registry.client(experience_id, &client_id).await {
        Some(client) => {
            let _ = client.tx.send(message);
        }
        None => {
            let notice = WireMessage::client_heartbeat(false, vec![client_id]);
            let _ = app_tx.send(AppBound::Direct(notice));
        }
    }
}

// -- Client side --------------------------------------------------------------

async fn handle_client(ctx: Arc<AppContext>, experience_id: String, socket: WebSocket) {
    let client_id = uuid::Uuid::new_v4().to_string();
    let accepted = Arc::new(AtomicBool::new(false));
    let (tx, mut rx) = mpsc::unbounded_channel();
    ctx.registry
        .add_client(
            &experience_id,
            ClientHandle {
                client_id: client_id.clone(),
                tx: tx.clone(),
                accepted: Arc::clone(&accepted),
            },
        )
        .await;
    tracing::debug!(experience = %experience_id, client = %client_id, "client connected");

    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            queued = rx.recv() => {
                let Some(queued) = queued else { break };
                match deliver_to_client(&mut ws_tx, &accepted, queued).await {
                    ClientDelivery::Sent => {}
                    ClientDelivery::Terminated => break,
                }
            }
            incoming = ws_rx.next() => {
                let text = match incoming {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => continue,
                };
                let message = match protocol::deserialize(&text) {
                    Ok(message) => message,
                    Err(err) => {
                        log_protocol_error(&experience_id, &client_id, &err);
                        continue;
                    }
                };
                handle_client_message(&ctx, &experience_id, &client_id, &accepted, &tx, message)
                    .await;
            }
        }
    }

    ctx.registry.remove_client(&experience_id, &client_id).await;
    tracing::debug!(experience = %experience_id, client = %client_id, "client disconnected");
}

enum ClientDelivery {
    Sent,
    Terminated,
}

/// Push one queued frame down a client socket. Access frames flip the
/// acceptance gate after the send; a refusal ends the connection. `app`
/// frames lose their `client` field, which only exists for routing.
async fn deliver_to_client(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    accepted: &AtomicBool,
    message: WireMessage,
) -> ClientDelivery {
    let outgoing = match message {
        WireMessage::AppClient { version, req, body, client: _ } => {
            WireMessage::AppClient { version, req, body, client: None }
        }
        other => other,
    };

    let text = protocol::serialize(&outgoing);
    if ws_tx.send(Message::Text(text.into())).await.is_err() {
        return ClientDelivery::Terminated;
    }

    if let WireMessage::Access { accepted: admitted, .. } = outgoing {
        accepted.store(admitted, Ordering::Release);
        if !admitted {
            return ClientDelivery::Terminated;
        }
    }
    ClientDelivery::Sent
}

/// Dispatch one frame received from a client.
async fn handle_client_message(
    ctx: &AppContext,
    experience_id: &str,
    client_id: &str,
    accepted: &AtomicBool,
    client_tx: &mpsc::UnboundedSender<WireMessage>,
    message: WireMessage,
) {
    let Some(app) = ctx.registry.app(experience_id).await else {
        // No app to deliver to; tell the client instead of going silent.
        let _ = client_tx.send(WireMessage::app_heartbeat(false));
        return;
    };

    let is_connect = matches!(message, WireMessage::Connect { .. });
    if !accepted.load(Ordering::Acquire) && !is_connect {
        tracing::warn!(
            experience = %experience_id,
            client = %client_id,
            "unauthorized client attempted to send an authenticated frame, dropping"
        );
        return;
    }

    if matches!(message, WireMessage::ClientApp { .. }) {
        ctx.controller.note_interaction(experience_id).await;
    }

    let _ = app.tx.send(AppBound::FromClient {
        client_id: client_id.to_owned(),
        message,
    });
}

fn log_protocol_error(experience_id: &str, sender: &str, err: &ProtocolError) {
    tracing::warn!(experience = %experience_id, sender, err = %err, "dropping invalid frame");
}

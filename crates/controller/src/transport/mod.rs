// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator HTTP API + messaging WebSocket transport.

pub mod http;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::messaging::ws;
use crate::state::AppContext;

/// Build the axum `Router` with the operator API and messaging endpoints.
pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        // Catalog
        .route("/experiences", get(http::experiences))
        .route("/experiences/{id}", get(http::experience))
        .route("/collections", get(http::collections))
        .route("/collections/{id}", get(http::collection))
        .route("/tags", get(http::tags))
        .route("/tags/{id}", get(http::tag))
        .route("/folders", get(http::folders))
        .route("/folders/{id}", get(http::folder))
        .route("/reload", get(http::reload))
        // Current experience
        .route(
            "/current",
            get(http::current).put(http::set_current).patch(http::update_current),
        )
        // Placard passthrough
        .route(
            "/placard/experience",
            get(http::placard_experience).patch(http::update_placard_experience),
        )
        .route("/placard/url", get(http::placard_url).patch(http::update_placard_url))
        // Screenshot
        .route("/screenshot", get(http::screenshot))
        // Messaging
        .route("/messaging/in/{id}", get(ws::client_ws_handler))
        .route("/messaging/out/{id}", get(ws::app_ws_handler))
        // Middleware
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

/// Polled endpoints get debug-level spans so the scheduler's once-a-second
/// reads don't drown the log.
fn request_span(request: &axum::http::Request<axum::body::Body>) -> tracing::Span {
    let method = request.method().as_str().to_owned();
    let path = request.uri().path().to_owned();
    if is_polled_endpoint(&path) {
        tracing::debug_span!("request", %method, %path)
    } else {
        tracing::info_span!("request", %method, %path)
    }
}

fn is_polled_endpoint(path: &str) -> bool {
    matches!(path, "/current" | "/placard/url" | "/experiences")
}

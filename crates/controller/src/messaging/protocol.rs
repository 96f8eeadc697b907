// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol between apps, their clients, and the router.
//!
//! Frames are JSON with a short `type` tag and a protocol version. The
//! variant determines which fields exist; `client` in particular is not a
//! runtime probe but a property of the message kind. Frames sourced from a
//! client gain a `client` field when the router forwards them to the app.

use serde::{Deserialize, Serialize};

use crate::current::LockStatus;

pub const PROTOCOL_VERSION: u32 = 1;

/// Settings an app may change on its own current run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplaySettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock: Option<LockStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WireMessage {
    /// Client requests admission to the app.
    #[serde(rename = "con")]
    Connect { version: u32 },

    /// App admits or refuses a client. A refusal terminates the client's
    /// connection once the frame is delivered.
    #[serde(rename = "acc")]
    Access {
        version: u32,
        accepted: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        client: String,
    },

    /// App liveness, router → client.
    #[serde(rename = "ahb")]
    AppHeartbeat { version: u32, up: bool },

    /// Client roster. `up: true` carries the authoritative list of connected
    /// clients; `up: false` lists clients that dropped.
    #[serde(rename = "chb")]
    ClientHeartbeat { version: u32, up: bool, clients: Vec<String> },

    /// Application-defined payload, client → app.
    #[serde(rename = "cap")]
    ClientApp {
        version: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        req: Option<String>,
        body: serde_json::Value,
    },

    /// Application-defined payload, app → one client. The router strips
    /// `client` before forwarding.
    #[serde(rename = "app")]
    AppClient {
        version: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        req: Option<String>,
        body: serde_json::Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client: Option<String>,
    },

    /// App updates the current run's settings; handled by the router, never
    /// forwarded.
    #[serde(rename = "dse")]
    DisplaySettings { version: u32, settings: DisplaySettings },

    /// Lifecycle notification (pause, resume).
    #[serde(rename = "lcy")]
    Lifecycle { version: u32, paused: bool },
}

impl WireMessage {
    pub fn connect() -> Self {
        Self::Connect { version: PROTOCOL_VERSION }
    }

    pub fn app_heartbeat(up: bool) -> Self {
        Self::AppHeartbeat { version: PROTOCOL_VERSION, up }
    }

    pub fn client_heartbeat(up: bool, clients: Vec<String>) -> Self {
        Self::ClientHeartbeat { version: PROTOCOL_VERSION, up, clients }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("frame is not a JSON object")]
    Malformed,
    #[error("frame doesn't contain required field 'type'")]
    MissingType,
    #[error("frame specified unrecognized type '{type_tag}'")]
    UnknownType { type_tag: String },
    #[error("frame version {found} doesn't match the supported protocol version")]
    VersionMismatch { found: u64 },
    #[error("frame failed to deserialize: {reason}")]
    InvalidFields { reason: String },
}

const KNOWN_TYPES: &[&str] = &["con", "acc", "ahb", "chb", "cap", "app", "dse", "lcy"];

/// Parse one frame, rejecting unknown types and version mismatches before
/// field-level deserialization so the error names the actual problem.
pub fn deserialize(text: &str) -> Result<WireMessage, ProtocolError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|_| ProtocolError::Malformed)?;
    let object = value.as_object().ok_or(ProtocolError::Malformed)?;

    let type_tag = object
        .get("type")
        .and_then(|tag| tag.as_str())
        .ok_or(ProtocolError::MissingType)?;
    if !KNOWN_TYPES.contains(&type_tag) {
        return Err(ProtocolError::UnknownType { type_tag: type_tag.to_owned() });
    }

    let version = object.get("version").and_then(|version| version.as_u64()).unwrap_or(0);
    if version != u64::from(PROTOCOL_VERSION) {
        return Err(ProtocolError::VersionMismatch { found: version });
    }

    serde_json::from_value(value)
        .map_err(|err| ProtocolError::InvalidFields { reason: err.to_string() })
}

/// Serialize one frame.
pub fn serialize(message: &WireMessage) -> String {
    serde_json::to_string(message).unwrap_or_default()
}

/// Serialize a client-sourced frame for the app, stamping the source client
/// id. The app needs to know which client every forwarded frame came from.
pub fn serialize_for_app(message: &WireMessage, client_id: &str) -> String {
    let mut value = serde_json::to_value(message).unwrap_or_default();
    if let serde_json::Value::Object(object) = &mut value {
        object.insert("client".to_owned(), serde_json::Value::String(client_id.to_owned()));
    }
    value.to_string()
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;

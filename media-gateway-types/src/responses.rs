/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

//! Response envelope and plugin payloads.
//!
//! A response is a success, a bare ack, or an error; anything else fails
//! deserialization. Plugin payloads additionally embed errors inside their
//! `data` object (`error_code`/`error`), which callers must surface before
//! decoding the payload into a typed event.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::id::RoomId;

/// Top-level response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum GatewayResponse {
    Success {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<SessionData>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<PluginPayload>,
    },
    Ack,
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<GatewayErrorInfo>,
    },
}

/// `data` object of a session-level success (`create`/`attach`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(deserialize_with = "crate::id::opaque_id")]
    pub id: String,
}

/// Error details, either top-level or embedded in a plugin payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayErrorInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    pub reason: String,
}

/// Synchronous result of a plugin `message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginPayload {
    pub data: serde_json::Value,
}

impl PluginPayload {
    /// Plugin-level error embedded in the payload, if any.
    pub fn error_info(&self) -> Option<GatewayErrorInfo> {
        let code = self.data.get("error_code").and_then(|v| v.as_i64());
        let reason = self.data.get("error").and_then(|v| v.as_str());
        if code.is_none() && reason.is_none() {
            return None;
        }
        Some(GatewayErrorInfo {
            code,
            reason: reason.unwrap_or("plugin error").to_string(),
        })
    }

    /// Decode the payload into a typed plugin event.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.clone())
    }
}

/// Payload of a successful room creation in either plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomCreated {
    pub room: RoomId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_session_success() {
        let resp: GatewayResponse =
            serde_json::from_value(json!({ "action": "success", "data": { "id": 12345 } }))
                .unwrap();
        match resp {
            GatewayResponse::Success { data: Some(d), .. } => assert_eq!(d.id, "12345"),
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn parses_bare_ack() {
        let resp: GatewayResponse = serde_json::from_value(json!({ "action": "ack" })).unwrap();
        assert_eq!(resp, GatewayResponse::Ack);
    }

    #[test]
    fn parses_top_level_error() {
        let resp: GatewayResponse = serde_json::from_value(json!({
            "action": "error",
            "error": { "code": 403, "reason": "unauthorized request" }
        }))
        .unwrap();
        match resp {
            GatewayResponse::Error { error: Some(e) } => {
                assert_eq!(e.code, Some(403));
                assert_eq!(e.reason, "unauthorized request");
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn unknown_action_fails_typecheck() {
        let raw = json!({ "action": "hangup" });
        assert!(serde_json::from_value::<GatewayResponse>(raw).is_err());
    }

    #[test]
    fn plugin_payload_surfaces_embedded_error() {
        let payload = PluginPayload {
            data: json!({ "error_code": 426, "error": "no such room" }),
        };
        let info = payload.error_info().unwrap();
        assert_eq!(info.code, Some(426));
        assert_eq!(info.reason, "no such room");
    }

    #[test]
    fn plugin_payload_without_error_decodes_typed_event() {
        let payload = PluginPayload {
            data: json!({ "room": 99 }),
        };
        assert!(payload.error_info().is_none());
        let created: RoomCreated = payload.decode().unwrap();
        assert_eq!(created.room.as_str(), "99");
    }
}

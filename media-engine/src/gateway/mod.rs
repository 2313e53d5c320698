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

//! Gateway transport: the signaling seam to the SFU gateway.
//!
//! [`GatewayTransport`] models the five control-plane operations as
//! synchronous request/acknowledgement round trips. Implementations must
//! collapse every failure into the single-failure-path classification of
//! [`MediaError`]: transport problems as `GatewayUnavailable`, protocol
//! problems as `GatewayRejected`. The production implementation is
//! [`HttpGatewayClient`].

pub mod http;

pub use http::HttpGatewayClient;

use media_gateway_types::{ConnectionId, HandleId, Plugin, PluginBody, SessionDescription};
use serde::de::DeserializeOwned;

use crate::error::MediaError;

/// Reply to a plugin message: either a bare ack or a synchronous payload.
#[derive(Debug, Clone)]
pub struct PluginReply {
    pub data: Option<serde_json::Value>,
}

impl PluginReply {
    /// Decode the payload into a typed plugin event.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, MediaError> {
        let data = self
            .data
            .as_ref()
            .ok_or_else(|| MediaError::malformed("plugin reply carried no payload"))?;
        serde_json::from_value(data.clone())
            .map_err(|e| MediaError::malformed(format!("unexpected plugin payload: {e}")))
    }
}

/// Control-plane operations on the SFU gateway.
///
/// Every call is a single bounded round trip; none is retried by the engine
/// (the protocol has no idempotency key, so a retried `create` could
/// provision a duplicate resource).
#[allow(async_fn_in_trait)]
pub trait GatewayTransport: Send + Sync {
    /// Open a gateway session and return its connection id.
    async fn open_session(&self) -> Result<ConnectionId, MediaError>;

    /// Attach a plugin handle on an open session.
    async fn attach_handle(
        &self,
        connection: &ConnectionId,
        plugin: Plugin,
    ) -> Result<HandleId, MediaError>;

    /// Send a plugin message, optionally carrying an SDP payload.
    async fn send_message(
        &self,
        connection: &ConnectionId,
        handle: &HandleId,
        body: PluginBody,
        sdp: Option<SessionDescription>,
    ) -> Result<PluginReply, MediaError>;

    /// Detach a plugin handle.
    async fn detach_handle(
        &self,
        connection: &ConnectionId,
        handle: &HandleId,
    ) -> Result<(), MediaError>;

    /// Destroy a gateway session.
    async fn close_session(&self, connection: &ConnectionId) -> Result<(), MediaError>;
}

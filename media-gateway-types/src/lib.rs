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

//! Signaling contract types for the SFU media gateway.
//!
//! This crate defines the JSON-over-HTTP wire protocol spoken to the media
//! gateway: the request envelope, the response envelope, and the message
//! bodies understood by the audio-mixing and video-routing plugins. It
//! carries no HTTP client and no database types, so the engine, gateway
//! stubs, and integration tests can all share it.
//!
//! Every plugin message is a closed tagged variant, so an unexpected or
//! malformed gateway payload fails deserialization instead of propagating
//! as an untyped map.

pub mod id;
pub mod requests;
pub mod responses;
pub mod sdp;
pub mod streams;

pub use id::{ConnectionId, HandleId, RoomId};
pub use requests::{AudioRoomRequest, GatewayRequest, Plugin, PluginBody, VideoRoomRequest, VideoRoomRole};
pub use responses::{GatewayErrorInfo, GatewayResponse, PluginPayload, RoomCreated, SessionData};
pub use sdp::{SdpType, SessionDescription};
pub use streams::{Feed, StreamKind, StreamRef};

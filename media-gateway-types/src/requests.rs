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

//! Request envelope and plugin message bodies.
//!
//! Every request to the gateway is a JSON POST whose top-level `action`
//! selects the operation. Plugin traffic rides inside a `message` envelope
//! whose `body` is one of the closed per-plugin request sets below.

use serde::{Deserialize, Serialize};

use crate::id::RoomId;
use crate::sdp::SessionDescription;
use crate::streams::StreamRef;

/// Plugins the gateway exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Plugin {
    #[serde(rename = "gateway.plugin.audiomixer")]
    AudioMixer,
    #[serde(rename = "gateway.plugin.videorouter")]
    VideoRouter,
}

impl Plugin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plugin::AudioMixer => "gateway.plugin.audiomixer",
            Plugin::VideoRouter => "gateway.plugin.videorouter",
        }
    }
}

/// Top-level request envelope.
///
/// `Create` and `Destroy` are posted to the session endpoint, `Attach` to a
/// session, and `Message`/`Detach` to a handle. Every variant carries a
/// per-call `transaction` correlation token and the pre-shared `secret`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum GatewayRequest {
    Create {
        transaction: String,
        secret: String,
    },
    Attach {
        transaction: String,
        plugin: Plugin,
        secret: String,
    },
    Message {
        transaction: String,
        body: PluginBody,
        secret: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sdp: Option<SessionDescription>,
    },
    Detach {
        transaction: String,
        secret: String,
    },
    Destroy {
        transaction: String,
        secret: String,
    },
}

/// Body of a `message` request, addressed to whichever plugin the target
/// handle is attached to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PluginBody {
    Audio(AudioRoomRequest),
    Video(VideoRoomRequest),
}

/// Requests understood by the audio-mixing plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "request", rename_all = "lowercase")]
pub enum AudioRoomRequest {
    /// Create a mixing room.
    Create {
        sampling_rate: u32,
        record: bool,
        is_private: bool,
    },
    /// Destroy a mixing room.
    Destroy { room: RoomId },
    /// Join the mixing room; `id` is the participant's user id. The SDP
    /// offer rides on the envelope.
    Join {
        room: RoomId,
        id: String,
        muted: bool,
    },
    /// Mute a participant, addressed by user id. Room-management action,
    /// sent on the meeting's shared handle.
    Mute { room: RoomId, id: String },
    /// Unmute a participant, addressed by user id.
    Unmute { room: RoomId, id: String },
}

/// Role a handle takes inside a video room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoRoomRole {
    Publisher,
    Subscriber,
}

/// Requests understood by the video-routing plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "request", rename_all = "lowercase")]
pub enum VideoRoomRequest {
    /// Create a routing room.
    Create {
        publishers: u32,
        bitrate: u64,
        record: bool,
        is_private: bool,
        videocodec: String,
    },
    /// Destroy a routing room.
    Destroy { room: RoomId },
    /// Join a routing room, either to publish a named feed or to subscribe
    /// to a list of streams.
    Join {
        room: RoomId,
        ptype: VideoRoomRole,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        feed: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        streams: Option<Vec<StreamRef>>,
    },
    /// Publish the handle's feed. The SDP offer rides on the envelope.
    Publish { room: RoomId, feed: String },
    /// Stop publishing; the handle stays attached for reuse.
    Unpublish { room: RoomId },
    /// Complete a negotiation. The SDP answer rides on the envelope.
    Start { room: RoomId },
    /// Change an existing subscriber's stream set. Only non-empty lists are
    /// present on the wire.
    Update {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subscribe: Option<Vec<StreamRef>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unsubscribe: Option<Vec<StreamRef>>,
    },
}

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

//! SDP payloads carried alongside plugin messages.

use serde::{Deserialize, Serialize};

/// Direction of an SDP payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SdpType {
    Offer,
    Answer,
}

/// A session description attached to a gateway `message` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpType,
    pub value: String,
}

impl SessionDescription {
    pub fn offer(value: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Offer,
            value: value.into(),
        }
    }

    pub fn answer(value: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Answer,
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offer_serializes_with_uppercase_type_tag() {
        let sdp = SessionDescription::offer("v=0...");
        let json = serde_json::to_value(&sdp).unwrap();
        assert_eq!(json["type"], "OFFER");
        assert_eq!(json["value"], "v=0...");
    }

    #[test]
    fn answer_round_trips() {
        let sdp = SessionDescription::answer("v=0...");
        let back: SessionDescription =
            serde_json::from_str(&serde_json::to_string(&sdp).unwrap()).unwrap();
        assert_eq!(back, sdp);
    }
}

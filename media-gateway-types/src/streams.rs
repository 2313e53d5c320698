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

//! Feeds: named media streams inside a video room.
//!
//! A feed is identified by the producing user and the kind of stream
//! (camera or screen share): `<user_id>/<kind>`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a published media stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Video,
    Screen,
}

impl StreamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Video => "video",
            StreamKind::Screen => "screen",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A feed addressed by producer and stream kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Feed {
    pub user_id: String,
    pub kind: StreamKind,
}

impl Feed {
    pub fn new(user_id: impl Into<String>, kind: StreamKind) -> Self {
        Self {
            user_id: user_id.into(),
            kind,
        }
    }

    /// Wire form of the feed identifier, e.g. `"alice@example.com/video"`.
    pub fn id(&self) -> String {
        format!("{}/{}", self.user_id, self.kind)
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.user_id, self.kind)
    }
}

/// A stream reference as it appears in subscribe/unsubscribe lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRef {
    pub feed: String,
}

impl From<&Feed> for StreamRef {
    fn from(feed: &Feed) -> Self {
        Self { feed: feed.id() }
    }
}

impl From<Feed> for StreamRef {
    fn from(feed: Feed) -> Self {
        Self { feed: feed.id() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_id_is_user_slash_kind() {
        assert_eq!(Feed::new("alice", StreamKind::Video).id(), "alice/video");
        assert_eq!(Feed::new("bob", StreamKind::Screen).id(), "bob/screen");
    }

    #[test]
    fn stream_ref_serializes_feed_field() {
        let r = StreamRef::from(Feed::new("alice", StreamKind::Screen));
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json, serde_json::json!({ "feed": "alice/screen" }));
    }
}

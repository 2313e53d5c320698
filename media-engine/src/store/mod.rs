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

//! Meeting media store: persisted gateway resource bookkeeping.
//!
//! The store exclusively owns both session entity types. Domain entities
//! reference media sessions by meeting/participant identity only; the
//! gateway identifiers recorded here never leave the engine.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryMediaStore;
pub use postgres::PgMediaStore;

use media_gateway_types::{ConnectionId, HandleId, RoomId};

use crate::error::MediaError;

/// Gateway-level resources shared by every participant of an active meeting.
///
/// All five gateway fields are mandatory: a row exists if and only if the
/// meeting's media plane is fully provisioned. `start` persists the session
/// only after the last provisioning step succeeded, and `stop` removes it
/// only after the last teardown step succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingMediaSession {
    pub meeting_id: String,
    /// Gateway session used for meeting-level room management.
    pub connection_id: ConnectionId,
    pub audio_handle_id: HandleId,
    pub video_handle_id: HandleId,
    pub audio_room_id: RoomId,
    pub video_room_id: RoomId,
}

/// Which negotiation is awaiting the client's SDP answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerTarget {
    /// A subscriber join, answered on the video-in handle.
    Subscriber,
    /// A camera publish, answered on the video-out handle.
    VideoPublisher,
    /// A screen-share publish, answered on the screen handle.
    ScreenPublisher,
}

impl AnswerTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerTarget::Subscriber => "subscriber",
            AnswerTarget::VideoPublisher => "video_publisher",
            AnswerTarget::ScreenPublisher => "screen_publisher",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "subscriber" => Some(AnswerTarget::Subscriber),
            "video_publisher" => Some(AnswerTarget::VideoPublisher),
            "screen_publisher" => Some(AnswerTarget::ScreenPublisher),
            _ => None,
        }
    }
}

/// Gateway resources owned by one participant session in a meeting.
///
/// A user may hold several of these in the same meeting, one per device
/// (`queue_id`). Handle fields are populated lazily, on first use of that
/// media type; the stream flags mirror the meeting-domain participant
/// entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantMediaSession {
    pub user_id: String,
    pub queue_id: String,
    /// Gateway session owned solely by this participant.
    pub connection_id: ConnectionId,
    pub audio_handle_id: Option<HandleId>,
    pub video_out_handle_id: Option<HandleId>,
    pub video_in_handle_id: Option<HandleId>,
    pub screen_handle_id: Option<HandleId>,
    pub audio_stream_on: bool,
    pub video_stream_on: bool,
    pub screen_stream_on: bool,
    pub pending_answer: Option<AnswerTarget>,
}

impl ParticipantMediaSession {
    pub fn new(
        user_id: impl Into<String>,
        queue_id: impl Into<String>,
        connection_id: ConnectionId,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            queue_id: queue_id.into(),
            connection_id,
            audio_handle_id: None,
            video_out_handle_id: None,
            video_in_handle_id: None,
            screen_handle_id: None,
            audio_stream_on: false,
            video_stream_on: false,
            screen_stream_on: false,
            pending_answer: None,
        }
    }

    /// Every handle currently attached on the participant's connection.
    pub fn attached_handles(&self) -> Vec<&HandleId> {
        [
            self.audio_handle_id.as_ref(),
            self.video_in_handle_id.as_ref(),
            self.video_out_handle_id.as_ref(),
            self.screen_handle_id.as_ref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Persistence seam for meeting and participant media sessions.
///
/// Implementations must make the write operations atomic per row; ordering
/// across rows is the orchestrators' responsibility, under the per-meeting
/// locking discipline described in [`crate::locks`].
#[allow(async_fn_in_trait)]
pub trait MediaStore: Send + Sync {
    async fn meeting_session(
        &self,
        meeting_id: &str,
    ) -> Result<Option<MeetingMediaSession>, MediaError>;

    /// Insert a fully provisioned meeting session. Fails if one exists.
    async fn insert_meeting_session(
        &self,
        session: &MeetingMediaSession,
    ) -> Result<(), MediaError>;

    /// Remove a meeting session and all of its participant sessions.
    async fn remove_meeting_session(&self, meeting_id: &str) -> Result<(), MediaError>;

    async fn participant_session(
        &self,
        meeting_id: &str,
        queue_id: &str,
    ) -> Result<Option<ParticipantMediaSession>, MediaError>;

    async fn participant_sessions(
        &self,
        meeting_id: &str,
    ) -> Result<Vec<ParticipantMediaSession>, MediaError>;

    /// Insert a participant session under an existing meeting session.
    async fn insert_participant_session(
        &self,
        meeting_id: &str,
        session: &ParticipantMediaSession,
    ) -> Result<(), MediaError>;

    /// Overwrite an existing participant session (handles, flags, pending
    /// negotiation). Fails if the session does not exist.
    async fn update_participant_session(
        &self,
        meeting_id: &str,
        session: &ParticipantMediaSession,
    ) -> Result<(), MediaError>;

    async fn remove_participant_session(
        &self,
        meeting_id: &str,
        queue_id: &str,
    ) -> Result<(), MediaError>;

    async fn participant_count(&self, meeting_id: &str) -> Result<i64, MediaError>;
}

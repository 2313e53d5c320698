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

//! Lifecycle and mutation of a single participant's media resources.

use std::sync::Arc;

use media_gateway_types::{
    AudioRoomRequest, Feed, HandleId, Plugin, PluginBody, SdpType, SessionDescription,
    StreamKind, StreamRef, VideoRoomRequest, VideoRoomRole,
};

use crate::error::MediaError;
use crate::gateway::GatewayTransport;
use crate::locks::MediaLocks;
use crate::orchestrator::{teardown_participant, MeetingMediaOrchestrator};
use crate::store::{AnswerTarget, MediaStore, MeetingMediaSession, ParticipantMediaSession};

/// Domain flags carried into `join`, mirrored from the meeting-domain
/// participant entity.
#[derive(Debug, Clone, Default)]
pub struct JoinSettings {
    pub audio_stream_on: bool,
    pub video_stream_on: bool,
    /// Initial SDP offer; required when `video_stream_on` is set.
    pub video_offer: Option<SessionDescription>,
}

/// Streams to add and remove in one subscription change.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionUpdate {
    pub subscribe: Vec<Feed>,
    pub unsubscribe: Vec<Feed>,
}

/// Owns every participant's gateway session, plugin handles, and stream
/// state. Shares the gateway, store, and lock registry with the meeting
/// orchestrator so that leave-of-last-participant can stop the meeting
/// under the same meeting scope.
pub struct ParticipantMediaOrchestrator<G, S> {
    meetings: Arc<MeetingMediaOrchestrator<G, S>>,
}

impl<G: GatewayTransport, S: MediaStore> ParticipantMediaOrchestrator<G, S> {
    pub fn new(meetings: Arc<MeetingMediaOrchestrator<G, S>>) -> Self {
        Self { meetings }
    }

    fn gateway(&self) -> &G {
        self.meetings.gateway.as_ref()
    }

    fn store(&self) -> &S {
        self.meetings.store.as_ref()
    }

    fn locks(&self) -> &MediaLocks {
        self.meetings.locks.as_ref()
    }

    async fn active_meeting(&self, meeting_id: &str) -> Result<MeetingMediaSession, MediaError> {
        self.store()
            .meeting_session(meeting_id)
            .await?
            .ok_or_else(|| MediaError::NotActive(meeting_id.to_string()))
    }

    /// Create a participant media session on a fresh gateway connection.
    ///
    /// With `video_stream_on`, the video-out handle is attached immediately
    /// and a publisher join carrying the initial offer is sent; the caller
    /// must then complete negotiation via [`Self::answer`].
    pub async fn join(
        &self,
        meeting_id: &str,
        user_id: &str,
        queue_id: &str,
        settings: JoinSettings,
    ) -> Result<(), MediaError> {
        if settings.video_stream_on && settings.video_offer.is_none() {
            return Err(MediaError::InvalidRequest(
                "joining with video requires an SDP offer".to_string(),
            ));
        }
        if let Some(sdp) = &settings.video_offer {
            require_offer(sdp)?;
        }

        let _meeting_guard = self.locks().lock_meeting(meeting_id).await;
        let meeting = self.active_meeting(meeting_id).await?;

        if self
            .store()
            .participant_session(meeting_id, queue_id)
            .await?
            .is_some()
        {
            return Err(MediaError::AlreadyJoined {
                meeting_id: meeting_id.to_string(),
                queue_id: queue_id.to_string(),
            });
        }

        let connection_id = self.gateway().open_session().await?;
        let mut session = ParticipantMediaSession::new(user_id, queue_id, connection_id);
        session.audio_stream_on = settings.audio_stream_on;

        if settings.video_stream_on {
            if let Err(err) = self
                .publish_on_join(&meeting, &mut session, settings.video_offer)
                .await
            {
                tracing::warn!(
                    "participant '{queue_id}' join to meeting '{meeting_id}' failed \
                     mid-provisioning; gateway connection '{}' may be leaked: {err}",
                    session.connection_id
                );
                return Err(err);
            }
        }

        self.store()
            .insert_participant_session(meeting_id, &session)
            .await?;
        tracing::info!(
            "participant '{user_id}' ('{queue_id}') joined media of meeting '{meeting_id}'"
        );
        Ok(())
    }

    async fn publish_on_join(
        &self,
        meeting: &MeetingMediaSession,
        session: &mut ParticipantMediaSession,
        offer: Option<SessionDescription>,
    ) -> Result<(), MediaError> {
        let handle = self
            .gateway()
            .attach_handle(&session.connection_id, Plugin::VideoRouter)
            .await?;
        let feed = Feed::new(session.user_id.clone(), StreamKind::Video);
        let body = VideoRoomRequest::Join {
            room: meeting.video_room_id.clone(),
            ptype: VideoRoomRole::Publisher,
            feed: Some(feed.id()),
            streams: None,
        };
        self.gateway()
            .send_message(&session.connection_id, &handle, PluginBody::Video(body), offer)
            .await?;

        session.video_out_handle_id = Some(handle);
        session.video_stream_on = true;
        session.pending_answer = Some(AnswerTarget::VideoPublisher);
        Ok(())
    }

    /// Release the participant's gateway resources and remove their
    /// session. When the last participant leaves, the meeting's media
    /// plane is stopped under the same meeting scope.
    pub async fn leave(
        &self,
        meeting_id: &str,
        user_id: &str,
        queue_id: &str,
    ) -> Result<(), MediaError> {
        let _meeting_guard = self.locks().lock_meeting(meeting_id).await;
        let _participant_guard = self.locks().lock_participant(meeting_id, queue_id).await;

        let session = self
            .store()
            .participant_session(meeting_id, queue_id)
            .await?
            .filter(|s| s.user_id == user_id)
            .ok_or_else(|| MediaError::NotAJoinedParticipant {
                meeting_id: meeting_id.to_string(),
                queue_id: queue_id.to_string(),
            })?;

        if let Err(err) = teardown_participant(self.gateway(), &session).await {
            tracing::warn!(
                "participant '{queue_id}' teardown in meeting '{meeting_id}' failed; \
                 gateway connection '{}' may be leaked: {err}",
                session.connection_id
            );
            return Err(err);
        }

        self.store()
            .remove_participant_session(meeting_id, queue_id)
            .await?;
        self.locks().forget_participant(meeting_id, queue_id);
        tracing::info!(
            "participant '{user_id}' ('{queue_id}') left media of meeting '{meeting_id}'"
        );

        if self.store().participant_count(meeting_id).await? == 0 {
            tracing::info!(
                "last participant left meeting '{meeting_id}', stopping its media session"
            );
            self.meetings.stop_locked(meeting_id).await?;
        }
        Ok(())
    }

    /// Mute or unmute a participant in the mixing room.
    ///
    /// This is a room-management action: the message is sent on the
    /// meeting's shared audio handle, addressed to the session's user id,
    /// not on the participant's own handle. Whether the caller may target
    /// a user other than themselves is enforced by the domain layer.
    pub async fn set_audio(
        &self,
        meeting_id: &str,
        queue_id: &str,
        enabled: bool,
    ) -> Result<(), MediaError> {
        let _participant_guard = self.locks().lock_participant(meeting_id, queue_id).await;
        let meeting = self.active_meeting(meeting_id).await?;
        let mut session = self
            .store()
            .participant_session(meeting_id, queue_id)
            .await?
            .ok_or_else(|| MediaError::ParticipantNotFound(queue_id.to_string()))?;

        if session.audio_stream_on == enabled {
            return Ok(());
        }

        let body = if enabled {
            AudioRoomRequest::Unmute {
                room: meeting.audio_room_id.clone(),
                id: session.user_id.clone(),
            }
        } else {
            AudioRoomRequest::Mute {
                room: meeting.audio_room_id.clone(),
                id: session.user_id.clone(),
            }
        };
        self.gateway()
            .send_message(
                &meeting.connection_id,
                &meeting.audio_handle_id,
                PluginBody::Audio(body),
                None,
            )
            .await?;

        session.audio_stream_on = enabled;
        self.store()
            .update_participant_session(meeting_id, &session)
            .await?;
        Ok(())
    }

    /// Publish or stop the participant's camera stream.
    pub async fn set_video(
        &self,
        meeting_id: &str,
        queue_id: &str,
        enabled: bool,
        sdp_offer: Option<SessionDescription>,
    ) -> Result<(), MediaError> {
        self.set_published_stream(meeting_id, queue_id, StreamKind::Video, enabled, sdp_offer)
            .await
    }

    /// Publish or stop the participant's screen-share stream.
    pub async fn set_screen_share(
        &self,
        meeting_id: &str,
        queue_id: &str,
        enabled: bool,
        sdp_offer: Option<SessionDescription>,
    ) -> Result<(), MediaError> {
        self.set_published_stream(meeting_id, queue_id, StreamKind::Screen, enabled, sdp_offer)
            .await
    }

    async fn set_published_stream(
        &self,
        meeting_id: &str,
        queue_id: &str,
        kind: StreamKind,
        enabled: bool,
        sdp_offer: Option<SessionDescription>,
    ) -> Result<(), MediaError> {
        let _participant_guard = self.locks().lock_participant(meeting_id, queue_id).await;
        let meeting = self.active_meeting(meeting_id).await?;
        let mut session = self
            .store()
            .participant_session(meeting_id, queue_id)
            .await?
            .ok_or_else(|| MediaError::ParticipantNotFound(queue_id.to_string()))?;

        let current = match kind {
            StreamKind::Video => session.video_stream_on,
            StreamKind::Screen => session.screen_stream_on,
        };
        if current == enabled {
            return Ok(());
        }

        if enabled {
            let offer = sdp_offer.ok_or_else(|| {
                MediaError::InvalidRequest(format!("enabling {kind} requires an SDP offer"))
            })?;
            require_offer(&offer)?;

            let handle = match kind {
                StreamKind::Video => self.ensure_video_out_handle(meeting_id, &mut session).await?,
                StreamKind::Screen => self.ensure_screen_handle(meeting_id, &mut session).await?,
            };
            let feed = Feed::new(session.user_id.clone(), kind);
            let body = VideoRoomRequest::Publish {
                room: meeting.video_room_id.clone(),
                feed: feed.id(),
            };
            self.gateway()
                .send_message(&session.connection_id, &handle, PluginBody::Video(body), Some(offer))
                .await?;

            match kind {
                StreamKind::Video => {
                    session.video_stream_on = true;
                    session.pending_answer = Some(AnswerTarget::VideoPublisher);
                }
                StreamKind::Screen => {
                    session.screen_stream_on = true;
                    session.pending_answer = Some(AnswerTarget::ScreenPublisher);
                }
            }
        } else {
            let handle = match kind {
                StreamKind::Video => session.video_out_handle_id.clone(),
                StreamKind::Screen => session.screen_handle_id.clone(),
            }
            .ok_or_else(|| {
                MediaError::InvalidRequest(format!("{kind} stream has no publish handle"))
            })?;
            self.gateway()
                .send_message(
                    &session.connection_id,
                    &handle,
                    PluginBody::Video(VideoRoomRequest::Unpublish {
                        room: meeting.video_room_id.clone(),
                    }),
                    None,
                )
                .await?;

            // Handle is retained for the next publish.
            match kind {
                StreamKind::Video => session.video_stream_on = false,
                StreamKind::Screen => session.screen_stream_on = false,
            }
        }

        self.store()
            .update_participant_session(meeting_id, &session)
            .await?;
        Ok(())
    }

    /// Change which feeds the participant receives.
    ///
    /// The first subscription attaches the shared video-in handle and joins
    /// as a subscriber with exactly the subscribe list; afterwards a single
    /// update message carries only the non-empty lists.
    pub async fn update_subscriptions(
        &self,
        meeting_id: &str,
        queue_id: &str,
        update: SubscriptionUpdate,
    ) -> Result<(), MediaError> {
        if update.subscribe.is_empty() && update.unsubscribe.is_empty() {
            return Err(MediaError::InvalidRequest(
                "both subscribe and unsubscribe lists are empty".to_string(),
            ));
        }

        let _participant_guard = self.locks().lock_participant(meeting_id, queue_id).await;
        let meeting = self.active_meeting(meeting_id).await?;
        let mut session = self
            .store()
            .participant_session(meeting_id, queue_id)
            .await?
            .ok_or_else(|| MediaError::NotAJoinedParticipant {
                meeting_id: meeting_id.to_string(),
                queue_id: queue_id.to_string(),
            })?;

        match session.video_in_handle_id.clone() {
            None => {
                // Nothing has been subscribed yet, so an unsubscribe-only
                // change has no work to do.
                if update.subscribe.is_empty() {
                    return Ok(());
                }
                let handle = self.ensure_video_in_handle(meeting_id, &mut session).await?;
                let body = VideoRoomRequest::Join {
                    room: meeting.video_room_id.clone(),
                    ptype: VideoRoomRole::Subscriber,
                    feed: None,
                    streams: Some(update.subscribe.iter().map(StreamRef::from).collect()),
                };
                self.gateway()
                    .send_message(&session.connection_id, &handle, PluginBody::Video(body), None)
                    .await?;
                session.pending_answer = Some(AnswerTarget::Subscriber);
            }
            Some(handle) => {
                let body = VideoRoomRequest::Update {
                    subscribe: non_empty(&update.subscribe),
                    unsubscribe: non_empty(&update.unsubscribe),
                };
                self.gateway()
                    .send_message(&session.connection_id, &handle, PluginBody::Video(body), None)
                    .await?;
            }
        }

        self.store()
            .update_participant_session(meeting_id, &session)
            .await?;
        Ok(())
    }

    /// Complete a previously initiated publish or subscribe negotiation.
    pub async fn answer(
        &self,
        meeting_id: &str,
        queue_id: &str,
        sdp_answer: SessionDescription,
    ) -> Result<(), MediaError> {
        if sdp_answer.kind != SdpType::Answer {
            return Err(MediaError::InvalidRequest(
                "expected an SDP answer".to_string(),
            ));
        }

        let _participant_guard = self.locks().lock_participant(meeting_id, queue_id).await;
        let meeting = self.active_meeting(meeting_id).await?;
        let mut session = self
            .store()
            .participant_session(meeting_id, queue_id)
            .await?
            .ok_or_else(|| MediaError::NotAJoinedParticipant {
                meeting_id: meeting_id.to_string(),
                queue_id: queue_id.to_string(),
            })?;

        let target = session.pending_answer.ok_or_else(|| {
            MediaError::InvalidRequest("no media negotiation is awaiting an answer".to_string())
        })?;
        let handle = match target {
            AnswerTarget::Subscriber => session.video_in_handle_id.clone(),
            AnswerTarget::VideoPublisher => session.video_out_handle_id.clone(),
            AnswerTarget::ScreenPublisher => session.screen_handle_id.clone(),
        }
        .ok_or_else(|| {
            MediaError::InvalidRequest("pending negotiation has no attached handle".to_string())
        })?;

        self.gateway()
            .send_message(
                &session.connection_id,
                &handle,
                PluginBody::Video(VideoRoomRequest::Start {
                    room: meeting.video_room_id.clone(),
                }),
                Some(sdp_answer),
            )
            .await?;

        session.pending_answer = None;
        self.store()
            .update_participant_session(meeting_id, &session)
            .await?;
        Ok(())
    }

    /// Join the participant to the mixing room with their audio offer.
    /// The join is muted by default; [`Self::set_audio`] unmutes.
    pub async fn offer_audio(
        &self,
        meeting_id: &str,
        queue_id: &str,
        sdp_offer: SessionDescription,
    ) -> Result<(), MediaError> {
        require_offer(&sdp_offer)?;

        let _participant_guard = self.locks().lock_participant(meeting_id, queue_id).await;
        let meeting = self.active_meeting(meeting_id).await?;
        let mut session = self
            .store()
            .participant_session(meeting_id, queue_id)
            .await?
            .ok_or_else(|| MediaError::NotAJoinedParticipant {
                meeting_id: meeting_id.to_string(),
                queue_id: queue_id.to_string(),
            })?;

        let handle = self.ensure_audio_handle(meeting_id, &mut session).await?;
        let body = AudioRoomRequest::Join {
            room: meeting.audio_room_id.clone(),
            id: session.user_id.clone(),
            muted: true,
        };
        self.gateway()
            .send_message(&session.connection_id, &handle, PluginBody::Audio(body), Some(sdp_offer))
            .await?;
        Ok(())
    }

    // ── Lazy handle creation ─────────────────────────────────────────────
    //
    // One helper per handle kind. Each checks the stored slot, attaches on
    // first use, and records the handle before any message is sent on it,
    // so `leave` always sees every attached handle.

    async fn ensure_audio_handle(
        &self,
        meeting_id: &str,
        session: &mut ParticipantMediaSession,
    ) -> Result<HandleId, MediaError> {
        if let Some(handle) = &session.audio_handle_id {
            return Ok(handle.clone());
        }
        let handle = self
            .gateway()
            .attach_handle(&session.connection_id, Plugin::AudioMixer)
            .await?;
        session.audio_handle_id = Some(handle.clone());
        self.store()
            .update_participant_session(meeting_id, session)
            .await?;
        Ok(handle)
    }

    async fn ensure_video_out_handle(
        &self,
        meeting_id: &str,
        session: &mut ParticipantMediaSession,
    ) -> Result<HandleId, MediaError> {
        if let Some(handle) = &session.video_out_handle_id {
            return Ok(handle.clone());
        }
        let handle = self
            .gateway()
            .attach_handle(&session.connection_id, Plugin::VideoRouter)
            .await?;
        session.video_out_handle_id = Some(handle.clone());
        self.store()
            .update_participant_session(meeting_id, session)
            .await?;
        Ok(handle)
    }

    async fn ensure_video_in_handle(
        &self,
        meeting_id: &str,
        session: &mut ParticipantMediaSession,
    ) -> Result<HandleId, MediaError> {
        if let Some(handle) = &session.video_in_handle_id {
            return Ok(handle.clone());
        }
        let handle = self
            .gateway()
            .attach_handle(&session.connection_id, Plugin::VideoRouter)
            .await?;
        session.video_in_handle_id = Some(handle.clone());
        self.store()
            .update_participant_session(meeting_id, session)
            .await?;
        Ok(handle)
    }

    async fn ensure_screen_handle(
        &self,
        meeting_id: &str,
        session: &mut ParticipantMediaSession,
    ) -> Result<HandleId, MediaError> {
        if let Some(handle) = &session.screen_handle_id {
            return Ok(handle.clone());
        }
        let handle = self
            .gateway()
            .attach_handle(&session.connection_id, Plugin::VideoRouter)
            .await?;
        session.screen_handle_id = Some(handle.clone());
        self.store()
            .update_participant_session(meeting_id, session)
            .await?;
        Ok(handle)
    }
}

fn require_offer(sdp: &SessionDescription) -> Result<(), MediaError> {
    if sdp.kind != SdpType::Offer {
        return Err(MediaError::InvalidRequest(
            "expected an SDP offer".to_string(),
        ));
    }
    Ok(())
}

fn non_empty(feeds: &[Feed]) -> Option<Vec<StreamRef>> {
    if feeds.is_empty() {
        None
    } else {
        Some(feeds.iter().map(StreamRef::from).collect())
    }
}

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

//! Lifecycle of a meeting's shared media plane.

use std::sync::Arc;

use media_gateway_types::{
    AudioRoomRequest, ConnectionId, Plugin, PluginBody, RoomCreated, VideoRoomRequest,
};

use crate::config::RoomLimits;
use crate::error::MediaError;
use crate::gateway::GatewayTransport;
use crate::locks::MediaLocks;
use crate::orchestrator::teardown_participant;
use crate::store::{MediaStore, MeetingMediaSession};

/// Mixing rooms always run at 16 kHz; the rate is part of the room's
/// identity and cannot change after creation.
const AUDIO_SAMPLING_RATE: u32 = 16_000;

/// Codec preference list applied to every video room.
const VIDEO_CODEC_PREFERENCES: &str = "vp8,vp9,h264";

/// Owns provisioning and teardown of the audio-mixing and video-routing
/// rooms backing a meeting.
pub struct MeetingMediaOrchestrator<G, S> {
    pub(crate) gateway: Arc<G>,
    pub(crate) store: Arc<S>,
    pub(crate) locks: Arc<MediaLocks>,
    limits: RoomLimits,
}

impl<G: GatewayTransport, S: MediaStore> MeetingMediaOrchestrator<G, S> {
    pub fn new(
        gateway: Arc<G>,
        store: Arc<S>,
        locks: Arc<MediaLocks>,
        limits: RoomLimits,
    ) -> Self {
        Self {
            gateway,
            store,
            locks,
            limits,
        }
    }

    /// Provision the meeting's media plane.
    ///
    /// Runs the five-step sequence (open session, attach audio handle,
    /// create audio room, attach video handle, create video room), aborting
    /// at the first failed step. The session is persisted only once all
    /// five steps succeeded; a partially provisioned gateway state is
    /// reported and left for operator cleanup, never recorded.
    pub async fn start(&self, meeting_id: &str) -> Result<MeetingMediaSession, MediaError> {
        let _meeting = self.locks.lock_meeting(meeting_id).await;

        if self.store.meeting_session(meeting_id).await?.is_some() {
            return Err(MediaError::AlreadyActive(meeting_id.to_string()));
        }

        let connection_id = self.gateway.open_session().await?;
        let session = match self.provision(meeting_id, &connection_id).await {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!(
                    "starting meeting '{meeting_id}' failed mid-sequence; \
                     gateway connection '{connection_id}' may be leaked: {err}"
                );
                return Err(err);
            }
        };

        self.store.insert_meeting_session(&session).await?;
        tracing::info!(
            "meeting '{meeting_id}' media session started (audio room '{}', video room '{}')",
            session.audio_room_id,
            session.video_room_id
        );
        Ok(session)
    }

    async fn provision(
        &self,
        meeting_id: &str,
        connection_id: &ConnectionId,
    ) -> Result<MeetingMediaSession, MediaError> {
        let audio_handle = self
            .gateway
            .attach_handle(connection_id, Plugin::AudioMixer)
            .await?;
        let reply = self
            .gateway
            .send_message(
                connection_id,
                &audio_handle,
                PluginBody::Audio(AudioRoomRequest::Create {
                    sampling_rate: AUDIO_SAMPLING_RATE,
                    record: false,
                    is_private: false,
                }),
                None,
            )
            .await?;
        let audio_room = reply.decode::<RoomCreated>()?.room;

        let video_handle = self
            .gateway
            .attach_handle(connection_id, Plugin::VideoRouter)
            .await?;
        let reply = self
            .gateway
            .send_message(
                connection_id,
                &video_handle,
                PluginBody::Video(VideoRoomRequest::Create {
                    publishers: self.limits.publisher_cap,
                    bitrate: self.limits.bitrate_cap,
                    record: false,
                    is_private: false,
                    videocodec: VIDEO_CODEC_PREFERENCES.to_string(),
                }),
                None,
            )
            .await?;
        let video_room = reply.decode::<RoomCreated>()?.room;

        Ok(MeetingMediaSession {
            meeting_id: meeting_id.to_string(),
            connection_id: connection_id.clone(),
            audio_handle_id: audio_handle,
            video_handle_id: video_handle,
            audio_room_id: audio_room,
            video_room_id: video_room,
        })
    }

    /// Tear down the meeting's media plane.
    ///
    /// Participant sessions still present (a room deleted mid-call) are
    /// released first, then the meeting-level resources in reverse
    /// dependency order: destroy video room, destroy audio room, detach
    /// audio handle, detach video handle, destroy the session. The store
    /// row is removed only after every step succeeded.
    pub async fn stop(&self, meeting_id: &str) -> Result<(), MediaError> {
        let _meeting = self.locks.lock_meeting(meeting_id).await;
        self.stop_locked(meeting_id).await
    }

    /// `stop` body, for callers already inside the meeting scope
    /// (leave-of-last-participant).
    pub(crate) async fn stop_locked(&self, meeting_id: &str) -> Result<(), MediaError> {
        let session = self
            .store
            .meeting_session(meeting_id)
            .await?
            .ok_or_else(|| MediaError::NotActive(meeting_id.to_string()))?;

        for participant in self.store.participant_sessions(meeting_id).await? {
            if let Err(err) = teardown_participant(self.gateway.as_ref(), &participant).await {
                tracing::warn!(
                    "stopping meeting '{meeting_id}': teardown of participant session '{}' \
                     failed; gateway connection '{}' may be leaked: {err}",
                    participant.queue_id,
                    participant.connection_id
                );
                return Err(err);
            }
            self.store
                .remove_participant_session(meeting_id, &participant.queue_id)
                .await?;
            self.locks.forget_participant(meeting_id, &participant.queue_id);
        }

        if let Err(err) = self.teardown(&session).await {
            tracing::warn!(
                "stopping meeting '{meeting_id}' failed mid-sequence; \
                 gateway connection '{}' may be leaked: {err}",
                session.connection_id
            );
            return Err(err);
        }

        self.store.remove_meeting_session(meeting_id).await?;
        self.locks.forget_meeting(meeting_id);
        tracing::info!("meeting '{meeting_id}' media session stopped");
        Ok(())
    }

    async fn teardown(&self, session: &MeetingMediaSession) -> Result<(), MediaError> {
        let connection = &session.connection_id;
        self.gateway
            .send_message(
                connection,
                &session.video_handle_id,
                PluginBody::Video(VideoRoomRequest::Destroy {
                    room: session.video_room_id.clone(),
                }),
                None,
            )
            .await?;
        self.gateway
            .send_message(
                connection,
                &session.audio_handle_id,
                PluginBody::Audio(AudioRoomRequest::Destroy {
                    room: session.audio_room_id.clone(),
                }),
                None,
            )
            .await?;
        self.gateway
            .detach_handle(connection, &session.audio_handle_id)
            .await?;
        self.gateway
            .detach_handle(connection, &session.video_handle_id)
            .await?;
        self.gateway.close_session(connection).await?;
        Ok(())
    }
}

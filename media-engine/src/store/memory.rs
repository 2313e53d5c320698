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

//! In-process media store.
//!
//! Backs tests and single-node embeddings. State does not survive a
//! restart; production deployments use [`crate::store::PgMediaStore`].

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::error::MediaError;
use crate::store::{MediaStore, MeetingMediaSession, ParticipantMediaSession};

struct MeetingEntry {
    session: MeetingMediaSession,
    participants: HashMap<String, ParticipantMediaSession>,
}

/// Media store keyed by meeting id in a shared map.
#[derive(Default)]
pub struct InMemoryMediaStore {
    meetings: RwLock<HashMap<String, MeetingEntry>>,
}

impl InMemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MediaStore for InMemoryMediaStore {
    async fn meeting_session(
        &self,
        meeting_id: &str,
    ) -> Result<Option<MeetingMediaSession>, MediaError> {
        let meetings = self.meetings.read().await;
        Ok(meetings.get(meeting_id).map(|e| e.session.clone()))
    }

    async fn insert_meeting_session(
        &self,
        session: &MeetingMediaSession,
    ) -> Result<(), MediaError> {
        let mut meetings = self.meetings.write().await;
        if meetings.contains_key(&session.meeting_id) {
            return Err(MediaError::Storage(format!(
                "meeting media session '{}' already exists",
                session.meeting_id
            )));
        }
        meetings.insert(
            session.meeting_id.clone(),
            MeetingEntry {
                session: session.clone(),
                participants: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn remove_meeting_session(&self, meeting_id: &str) -> Result<(), MediaError> {
        self.meetings.write().await.remove(meeting_id);
        Ok(())
    }

    async fn participant_session(
        &self,
        meeting_id: &str,
        queue_id: &str,
    ) -> Result<Option<ParticipantMediaSession>, MediaError> {
        let meetings = self.meetings.read().await;
        Ok(meetings
            .get(meeting_id)
            .and_then(|e| e.participants.get(queue_id))
            .cloned())
    }

    async fn participant_sessions(
        &self,
        meeting_id: &str,
    ) -> Result<Vec<ParticipantMediaSession>, MediaError> {
        let meetings = self.meetings.read().await;
        let mut sessions: Vec<ParticipantMediaSession> = meetings
            .get(meeting_id)
            .map(|e| e.participants.values().cloned().collect())
            .unwrap_or_default();
        sessions.sort_by(|a, b| a.queue_id.cmp(&b.queue_id));
        Ok(sessions)
    }

    async fn insert_participant_session(
        &self,
        meeting_id: &str,
        session: &ParticipantMediaSession,
    ) -> Result<(), MediaError> {
        let mut meetings = self.meetings.write().await;
        let entry = meetings.get_mut(meeting_id).ok_or_else(|| {
            MediaError::Storage(format!("no meeting media session '{meeting_id}'"))
        })?;
        if entry.participants.contains_key(&session.queue_id) {
            return Err(MediaError::Storage(format!(
                "participant media session '{}' already exists in meeting '{meeting_id}'",
                session.queue_id
            )));
        }
        entry
            .participants
            .insert(session.queue_id.clone(), session.clone());
        Ok(())
    }

    async fn update_participant_session(
        &self,
        meeting_id: &str,
        session: &ParticipantMediaSession,
    ) -> Result<(), MediaError> {
        let mut meetings = self.meetings.write().await;
        let entry = meetings.get_mut(meeting_id).ok_or_else(|| {
            MediaError::Storage(format!("no meeting media session '{meeting_id}'"))
        })?;
        let slot = entry.participants.get_mut(&session.queue_id).ok_or_else(|| {
            MediaError::Storage(format!(
                "no participant media session '{}' in meeting '{meeting_id}'",
                session.queue_id
            ))
        })?;
        *slot = session.clone();
        Ok(())
    }

    async fn remove_participant_session(
        &self,
        meeting_id: &str,
        queue_id: &str,
    ) -> Result<(), MediaError> {
        let mut meetings = self.meetings.write().await;
        if let Some(entry) = meetings.get_mut(meeting_id) {
            entry.participants.remove(queue_id);
        }
        Ok(())
    }

    async fn participant_count(&self, meeting_id: &str) -> Result<i64, MediaError> {
        let meetings = self.meetings.read().await;
        Ok(meetings
            .get(meeting_id)
            .map(|e| e.participants.len() as i64)
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_gateway_types::{ConnectionId, HandleId, RoomId};

    fn meeting(meeting_id: &str) -> MeetingMediaSession {
        MeetingMediaSession {
            meeting_id: meeting_id.into(),
            connection_id: ConnectionId::new("c1"),
            audio_handle_id: HandleId::new("h-audio"),
            video_handle_id: HandleId::new("h-video"),
            audio_room_id: RoomId::new("r-audio"),
            video_room_id: RoomId::new("r-video"),
        }
    }

    #[tokio::test]
    async fn meeting_sessions_insert_and_remove() {
        let store = InMemoryMediaStore::new();
        assert!(store.meeting_session("m1").await.unwrap().is_none());

        store.insert_meeting_session(&meeting("m1")).await.unwrap();
        assert_eq!(store.meeting_session("m1").await.unwrap(), Some(meeting("m1")));

        // Double insert is a storage error, mirroring the primary key.
        assert!(store.insert_meeting_session(&meeting("m1")).await.is_err());

        store.remove_meeting_session("m1").await.unwrap();
        assert!(store.meeting_session("m1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn participants_require_a_meeting_session() {
        let store = InMemoryMediaStore::new();
        let p = ParticipantMediaSession::new("alice", "q1", ConnectionId::new("c2"));
        assert!(store.insert_participant_session("m1", &p).await.is_err());
    }

    #[tokio::test]
    async fn participants_are_keyed_by_queue_id() {
        let store = InMemoryMediaStore::new();
        store.insert_meeting_session(&meeting("m1")).await.unwrap();

        let laptop = ParticipantMediaSession::new("alice", "q1", ConnectionId::new("c2"));
        let phone = ParticipantMediaSession::new("alice", "q2", ConnectionId::new("c3"));
        store.insert_participant_session("m1", &laptop).await.unwrap();
        store.insert_participant_session("m1", &phone).await.unwrap();

        // Same queue id again is rejected; same user on another device is fine.
        assert!(store.insert_participant_session("m1", &laptop).await.is_err());
        assert_eq!(store.participant_count("m1").await.unwrap(), 2);

        let sessions = store.participant_sessions("m1").await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert!(sessions.iter().all(|s| s.user_id == "alice"));
    }

    #[tokio::test]
    async fn update_rewrites_handles_and_flags() {
        let store = InMemoryMediaStore::new();
        store.insert_meeting_session(&meeting("m1")).await.unwrap();

        let mut p = ParticipantMediaSession::new("alice", "q1", ConnectionId::new("c2"));
        store.insert_participant_session("m1", &p).await.unwrap();

        p.video_out_handle_id = Some(HandleId::new("h-out"));
        p.video_stream_on = true;
        store.update_participant_session("m1", &p).await.unwrap();

        let stored = store.participant_session("m1", "q1").await.unwrap().unwrap();
        assert_eq!(stored.video_out_handle_id, Some(HandleId::new("h-out")));
        assert!(stored.video_stream_on);
    }

    #[tokio::test]
    async fn removing_the_meeting_drops_its_participants() {
        let store = InMemoryMediaStore::new();
        store.insert_meeting_session(&meeting("m1")).await.unwrap();
        let p = ParticipantMediaSession::new("alice", "q1", ConnectionId::new("c2"));
        store.insert_participant_session("m1", &p).await.unwrap();

        store.remove_meeting_session("m1").await.unwrap();
        assert!(store.participant_session("m1", "q1").await.unwrap().is_none());
        assert_eq!(store.participant_count("m1").await.unwrap(), 0);
    }
}

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

//! PostgreSQL media store.
//!
//! Rows persist across process restarts so an active meeting's gateway
//! resources can be located after a crash or redeploy.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use media_gateway_types::{ConnectionId, HandleId, RoomId};

use crate::error::MediaError;
use crate::store::{AnswerTarget, MediaStore, MeetingMediaSession, ParticipantMediaSession};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS meeting_media_sessions (
    meeting_id TEXT PRIMARY KEY,
    connection_id TEXT NOT NULL,
    audio_handle_id TEXT NOT NULL,
    video_handle_id TEXT NOT NULL,
    audio_room_id TEXT NOT NULL,
    video_room_id TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS participant_media_sessions (
    meeting_id TEXT NOT NULL REFERENCES meeting_media_sessions(meeting_id) ON DELETE CASCADE,
    queue_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    connection_id TEXT NOT NULL,
    audio_handle_id TEXT,
    video_out_handle_id TEXT,
    video_in_handle_id TEXT,
    screen_handle_id TEXT,
    audio_stream_on BOOLEAN NOT NULL DEFAULT FALSE,
    video_stream_on BOOLEAN NOT NULL DEFAULT FALSE,
    screen_stream_on BOOLEAN NOT NULL DEFAULT FALSE,
    pending_answer TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (meeting_id, queue_id)
);
"#;

/// Row from the `meeting_media_sessions` table.
#[derive(Debug, sqlx::FromRow)]
struct MeetingMediaRow {
    meeting_id: String,
    connection_id: String,
    audio_handle_id: String,
    video_handle_id: String,
    audio_room_id: String,
    video_room_id: String,
}

impl From<MeetingMediaRow> for MeetingMediaSession {
    fn from(row: MeetingMediaRow) -> Self {
        Self {
            meeting_id: row.meeting_id,
            connection_id: ConnectionId::new(row.connection_id),
            audio_handle_id: HandleId::new(row.audio_handle_id),
            video_handle_id: HandleId::new(row.video_handle_id),
            audio_room_id: RoomId::new(row.audio_room_id),
            video_room_id: RoomId::new(row.video_room_id),
        }
    }
}

/// Row from the `participant_media_sessions` table.
#[derive(Debug, sqlx::FromRow)]
struct ParticipantMediaRow {
    user_id: String,
    queue_id: String,
    connection_id: String,
    audio_handle_id: Option<String>,
    video_out_handle_id: Option<String>,
    video_in_handle_id: Option<String>,
    screen_handle_id: Option<String>,
    audio_stream_on: bool,
    video_stream_on: bool,
    screen_stream_on: bool,
    pending_answer: Option<String>,
}

impl ParticipantMediaRow {
    fn into_session(self) -> Result<ParticipantMediaSession, MediaError> {
        let pending_answer = match self.pending_answer {
            None => None,
            Some(raw) => Some(AnswerTarget::parse(&raw).ok_or_else(|| {
                MediaError::Storage(format!("unknown pending_answer value '{raw}'"))
            })?),
        };
        Ok(ParticipantMediaSession {
            user_id: self.user_id,
            queue_id: self.queue_id,
            connection_id: ConnectionId::new(self.connection_id),
            audio_handle_id: self.audio_handle_id.map(HandleId::new),
            video_out_handle_id: self.video_out_handle_id.map(HandleId::new),
            video_in_handle_id: self.video_in_handle_id.map(HandleId::new),
            screen_handle_id: self.screen_handle_id.map(HandleId::new),
            audio_stream_on: self.audio_stream_on,
            video_stream_on: self.video_stream_on,
            screen_stream_on: self.screen_stream_on,
            pending_answer,
        })
    }
}

/// Media store backed by PostgreSQL.
pub struct PgMediaStore {
    pool: PgPool,
}

impl PgMediaStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, MediaError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Create the media session tables if they do not exist.
    pub async fn ensure_schema(&self) -> Result<(), MediaError> {
        for statement in SCHEMA.split(';').filter(|s| !s.trim().is_empty()) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

impl MediaStore for PgMediaStore {
    async fn meeting_session(
        &self,
        meeting_id: &str,
    ) -> Result<Option<MeetingMediaSession>, MediaError> {
        let row = sqlx::query_as::<_, MeetingMediaRow>(
            r#"
            SELECT meeting_id, connection_id, audio_handle_id, video_handle_id,
                   audio_room_id, video_room_id
            FROM meeting_media_sessions
            WHERE meeting_id = $1
            "#,
        )
        .bind(meeting_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(MeetingMediaSession::from))
    }

    async fn insert_meeting_session(
        &self,
        session: &MeetingMediaSession,
    ) -> Result<(), MediaError> {
        sqlx::query(
            r#"
            INSERT INTO meeting_media_sessions
                (meeting_id, connection_id, audio_handle_id, video_handle_id,
                 audio_room_id, video_room_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&session.meeting_id)
        .bind(session.connection_id.as_str())
        .bind(session.audio_handle_id.as_str())
        .bind(session.video_handle_id.as_str())
        .bind(session.audio_room_id.as_str())
        .bind(session.video_room_id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_meeting_session(&self, meeting_id: &str) -> Result<(), MediaError> {
        sqlx::query("DELETE FROM meeting_media_sessions WHERE meeting_id = $1")
            .bind(meeting_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn participant_session(
        &self,
        meeting_id: &str,
        queue_id: &str,
    ) -> Result<Option<ParticipantMediaSession>, MediaError> {
        let row = sqlx::query_as::<_, ParticipantMediaRow>(
            r#"
            SELECT user_id, queue_id, connection_id, audio_handle_id,
                   video_out_handle_id, video_in_handle_id, screen_handle_id,
                   audio_stream_on, video_stream_on, screen_stream_on, pending_answer
            FROM participant_media_sessions
            WHERE meeting_id = $1 AND queue_id = $2
            "#,
        )
        .bind(meeting_id)
        .bind(queue_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(ParticipantMediaRow::into_session).transpose()
    }

    async fn participant_sessions(
        &self,
        meeting_id: &str,
    ) -> Result<Vec<ParticipantMediaSession>, MediaError> {
        let rows = sqlx::query_as::<_, ParticipantMediaRow>(
            r#"
            SELECT user_id, queue_id, connection_id, audio_handle_id,
                   video_out_handle_id, video_in_handle_id, screen_handle_id,
                   audio_stream_on, video_stream_on, screen_stream_on, pending_answer
            FROM participant_media_sessions
            WHERE meeting_id = $1
            ORDER BY queue_id
            "#,
        )
        .bind(meeting_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(ParticipantMediaRow::into_session)
            .collect()
    }

    async fn insert_participant_session(
        &self,
        meeting_id: &str,
        session: &ParticipantMediaSession,
    ) -> Result<(), MediaError> {
        sqlx::query(
            r#"
            INSERT INTO participant_media_sessions
                (meeting_id, queue_id, user_id, connection_id, audio_handle_id,
                 video_out_handle_id, video_in_handle_id, screen_handle_id,
                 audio_stream_on, video_stream_on, screen_stream_on, pending_answer)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(meeting_id)
        .bind(&session.queue_id)
        .bind(&session.user_id)
        .bind(session.connection_id.as_str())
        .bind(session.audio_handle_id.as_ref().map(|h| h.as_str()))
        .bind(session.video_out_handle_id.as_ref().map(|h| h.as_str()))
        .bind(session.video_in_handle_id.as_ref().map(|h| h.as_str()))
        .bind(session.screen_handle_id.as_ref().map(|h| h.as_str()))
        .bind(session.audio_stream_on)
        .bind(session.video_stream_on)
        .bind(session.screen_stream_on)
        .bind(session.pending_answer.map(|t| t.as_str()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_participant_session(
        &self,
        meeting_id: &str,
        session: &ParticipantMediaSession,
    ) -> Result<(), MediaError> {
        let result = sqlx::query(
            r#"
            UPDATE participant_media_sessions
            SET audio_handle_id = $3, video_out_handle_id = $4,
                video_in_handle_id = $5, screen_handle_id = $6,
                audio_stream_on = $7, video_stream_on = $8,
                screen_stream_on = $9, pending_answer = $10
            WHERE meeting_id = $1 AND queue_id = $2
            "#,
        )
        .bind(meeting_id)
        .bind(&session.queue_id)
        .bind(session.audio_handle_id.as_ref().map(|h| h.as_str()))
        .bind(session.video_out_handle_id.as_ref().map(|h| h.as_str()))
        .bind(session.video_in_handle_id.as_ref().map(|h| h.as_str()))
        .bind(session.screen_handle_id.as_ref().map(|h| h.as_str()))
        .bind(session.audio_stream_on)
        .bind(session.video_stream_on)
        .bind(session.screen_stream_on)
        .bind(session.pending_answer.map(|t| t.as_str()))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(MediaError::Storage(format!(
                "no participant media session '{}' in meeting '{meeting_id}'",
                session.queue_id
            )));
        }
        Ok(())
    }

    async fn remove_participant_session(
        &self,
        meeting_id: &str,
        queue_id: &str,
    ) -> Result<(), MediaError> {
        sqlx::query(
            "DELETE FROM participant_media_sessions WHERE meeting_id = $1 AND queue_id = $2",
        )
        .bind(meeting_id)
        .bind(queue_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn participant_count(&self, meeting_id: &str) -> Result<i64, MediaError> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM participant_media_sessions WHERE meeting_id = $1",
        )
        .bind(meeting_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0)
    }
}

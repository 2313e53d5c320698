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

//! Per-entity mutual exclusion for orchestration sequences.
//!
//! Every "read stored resource id → issue remote call → persist the new id"
//! sequence runs under a lock keyed by the entity it touches, so two
//! concurrent operations never create or destroy the same gateway resource.
//!
//! Discipline (part of the orchestrators' public contract):
//! - meeting scope: `start`, `stop`, `join`, `leave` (leave must observe
//!   "is this the last participant" safely);
//! - participant scope: every other participant operation;
//! - ordering: a task that needs both takes the meeting lock first.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Default)]
struct MeetingEntry {
    meeting: Arc<AsyncMutex<()>>,
    participants: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Lock registry keyed by meeting id, with nested per-participant locks.
#[derive(Default)]
pub struct MediaLocks {
    meetings: Mutex<HashMap<String, Arc<MeetingEntry>>>,
}

impl MediaLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, meeting_id: &str) -> Arc<MeetingEntry> {
        let mut meetings = self.meetings.lock().expect("media lock registry poisoned");
        meetings
            .entry(meeting_id.to_string())
            .or_default()
            .clone()
    }

    /// Acquire the meeting-level scope.
    pub async fn lock_meeting(&self, meeting_id: &str) -> OwnedMutexGuard<()> {
        let entry = self.entry(meeting_id);
        entry.meeting.clone().lock_owned().await
    }

    /// Acquire the per-participant sub-scope.
    pub async fn lock_participant(&self, meeting_id: &str, queue_id: &str) -> OwnedMutexGuard<()> {
        let entry = self.entry(meeting_id);
        let lock = {
            let mut participants = entry
                .participants
                .lock()
                .expect("media lock registry poisoned");
            participants
                .entry(queue_id.to_string())
                .or_default()
                .clone()
        };
        lock.lock_owned().await
    }

    /// Drop a meeting's locks after its media session was torn down.
    /// In-flight holders keep their own `Arc`; late arrivals get a fresh
    /// entry and then observe the missing store row.
    pub fn forget_meeting(&self, meeting_id: &str) {
        let mut meetings = self.meetings.lock().expect("media lock registry poisoned");
        meetings.remove(meeting_id);
    }

    /// Drop a participant's lock after their session was removed.
    pub fn forget_participant(&self, meeting_id: &str, queue_id: &str) {
        let meetings = self.meetings.lock().expect("media lock registry poisoned");
        if let Some(entry) = meetings.get(meeting_id) {
            let mut participants = entry
                .participants
                .lock()
                .expect("media lock registry poisoned");
            participants.remove(queue_id);
        }
    }
}

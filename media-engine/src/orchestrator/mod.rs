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

//! Media orchestrators, the domain-facing surface of the engine.
//!
//! [`MeetingMediaOrchestrator`] owns a meeting's shared media plane (the
//! audio-mixing and video-routing rooms); [`ParticipantMediaOrchestrator`]
//! owns each participant's gateway session, plugin handles, and stream
//! state. Both take domain identifiers only and run every mutation under
//! the locking discipline of [`crate::locks`].

pub mod meeting;
pub mod participant;

pub use meeting::MeetingMediaOrchestrator;
pub use participant::{JoinSettings, ParticipantMediaOrchestrator, SubscriptionUpdate};

use crate::error::MediaError;
use crate::gateway::GatewayTransport;
use crate::store::ParticipantMediaSession;

/// Release every gateway resource owned by one participant session:
/// detach each attached handle, then destroy the participant's connection.
/// Handle order is not significant; each call targets an independent
/// handle on the same connection.
pub(crate) async fn teardown_participant<G: GatewayTransport>(
    gateway: &G,
    session: &ParticipantMediaSession,
) -> Result<(), MediaError> {
    for handle in session.attached_handles() {
        gateway.detach_handle(&session.connection_id, handle).await?;
    }
    gateway.close_session(&session.connection_id).await
}

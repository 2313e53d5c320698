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

//! Meeting media orchestration engine.
//!
//! This crate owns the media-plane resources backing a meeting on the
//! external SFU gateway: the shared audio-mixing and video-routing rooms
//! ([`MeetingMediaOrchestrator`]) and every participant's own gateway
//! session and plugin handles ([`ParticipantMediaOrchestrator`]). Domain
//! services call in with domain identifiers only; gateway identifiers never
//! leave this crate.
//!
//! Wiring follows the same shape as the other backend services: load
//! [`config::Config`] from the environment, connect a [`store::PgMediaStore`],
//! build an [`gateway::HttpGatewayClient`], and share one [`locks::MediaLocks`]
//! registry between both orchestrators. The locking discipline is part of the
//! public contract; see [`locks`].

pub mod config;
pub mod error;
pub mod gateway;
pub mod locks;
pub mod orchestrator;
pub mod store;

pub use config::{Config, GatewayConfig, RoomLimits};
pub use error::MediaError;
pub use gateway::{GatewayTransport, HttpGatewayClient, PluginReply};
pub use locks::MediaLocks;
pub use orchestrator::{
    JoinSettings, MeetingMediaOrchestrator, ParticipantMediaOrchestrator, SubscriptionUpdate,
};
pub use store::{
    AnswerTarget, InMemoryMediaStore, MediaStore, MeetingMediaSession, ParticipantMediaSession,
    PgMediaStore,
};

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

//! Engine error taxonomy.
//!
//! Every operation fails with exactly one of these variants; the engine
//! never retries a remote call and never leaves a partially applied store
//! write behind (rows are written only after the full step sequence
//! succeeded). The domain layer maps dependency failures onto its single
//! "dependency failed" outward signal.

use media_gateway_types::GatewayErrorInfo;
use thiserror::Error;

/// Error returned by the orchestrators and the gateway transport.
#[derive(Debug, Clone, Error)]
pub enum MediaError {
    /// Transport-level failure: connect error, timeout, or a non-2xx HTTP
    /// response from the gateway.
    #[error("gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// The gateway answered, but with a protocol-level error: a top-level
    /// error action, a plugin payload embedding an error, or a body that
    /// failed the wire typecheck.
    #[error("gateway rejected request: {reason}")]
    GatewayRejected { code: Option<i64>, reason: String },

    /// `start` on a meeting that already has an active media session.
    #[error("meeting '{0}' already has an active media session")]
    AlreadyActive(String),

    /// An operation that needs an active media session found none.
    #[error("meeting '{0}' has no active media session")]
    NotActive(String),

    /// `join` for a queue id that already holds a participant session.
    #[error("participant session '{queue_id}' already joined meeting '{meeting_id}'")]
    AlreadyJoined {
        meeting_id: String,
        queue_id: String,
    },

    /// An operation on a queue id with no participant session.
    #[error("participant session '{queue_id}' is not joined to meeting '{meeting_id}'")]
    NotAJoinedParticipant {
        meeting_id: String,
        queue_id: String,
    },

    /// A stream-toggle operation named a participant that is not in the
    /// meeting.
    #[error("participant '{0}' not found")]
    ParticipantNotFound(String),

    /// The request failed validation before any gateway call.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The media store failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl MediaError {
    pub(crate) fn rejected(error: Option<GatewayErrorInfo>) -> Self {
        match error {
            Some(info) => MediaError::GatewayRejected {
                code: info.code,
                reason: info.reason,
            },
            None => MediaError::GatewayRejected {
                code: None,
                reason: "gateway returned an error with no details".to_string(),
            },
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        MediaError::GatewayRejected {
            code: None,
            reason: reason.into(),
        }
    }

    /// Whether this error should surface to API clients as a failed
    /// dependency (HTTP 424-equivalent) rather than a caller mistake.
    pub fn is_dependency_failure(&self) -> bool {
        matches!(
            self,
            MediaError::GatewayUnavailable(_) | MediaError::GatewayRejected { .. }
        )
    }
}

impl From<sqlx::Error> for MediaError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("media store error: {err}");
        MediaError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_failures_are_dependency_failures() {
        assert!(MediaError::GatewayUnavailable("connect refused".into()).is_dependency_failure());
        assert!(MediaError::GatewayRejected {
            code: Some(426),
            reason: "no such room".into()
        }
        .is_dependency_failure());
    }

    #[test]
    fn lifecycle_misuse_is_not_a_dependency_failure() {
        assert!(!MediaError::AlreadyActive("m1".into()).is_dependency_failure());
        assert!(!MediaError::InvalidRequest("empty lists".into()).is_dependency_failure());
        assert!(!MediaError::ParticipantNotFound("q1".into()).is_dependency_failure());
    }

    #[test]
    fn rejected_keeps_gateway_error_details() {
        let err = MediaError::rejected(Some(GatewayErrorInfo {
            code: Some(403),
            reason: "unauthorized request".into(),
        }));
        match err {
            MediaError::GatewayRejected { code, reason } => {
                assert_eq!(code, Some(403));
                assert_eq!(reason, "unauthorized request");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

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

//! JSON-over-HTTP implementation of [`GatewayTransport`].

use media_gateway_types::{
    ConnectionId, GatewayRequest, GatewayResponse, HandleId, Plugin, PluginBody,
    SessionDescription,
};
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::error::MediaError;
use crate::gateway::{GatewayTransport, PluginReply};

/// Gateway client speaking the JSON signaling protocol over HTTP POST.
///
/// Every request carries a fresh transaction token and the pre-shared
/// secret; every round trip is bounded by the configured timeout.
pub struct HttpGatewayClient {
    http: reqwest::Client,
    base_url: String,
    secret: String,
}

impl HttpGatewayClient {
    pub fn new(config: &GatewayConfig) -> Result<Self, MediaError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| MediaError::GatewayUnavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            secret: config.secret.clone(),
        })
    }

    fn transaction() -> String {
        Uuid::new_v4().to_string()
    }

    fn session_url(&self, connection: &ConnectionId) -> String {
        format!("{}/{}", self.base_url, connection)
    }

    fn handle_url(&self, connection: &ConnectionId, handle: &HandleId) -> String {
        format!("{}/{}/{}", self.base_url, connection, handle)
    }

    async fn post(&self, url: &str, request: &GatewayRequest) -> Result<GatewayResponse, MediaError> {
        let response = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::GatewayUnavailable(format!(
                "gateway returned HTTP {status}"
            )));
        }

        response
            .json::<GatewayResponse>()
            .await
            .map_err(|e| MediaError::malformed(format!("malformed gateway response: {e}")))
    }
}

fn transport_error(err: reqwest::Error) -> MediaError {
    if err.is_timeout() {
        MediaError::GatewayUnavailable(format!("gateway request timed out: {err}"))
    } else {
        MediaError::GatewayUnavailable(err.to_string())
    }
}

/// A `create`/`attach` must come back as a success carrying the new id.
fn expect_id(response: GatewayResponse) -> Result<String, MediaError> {
    match response {
        GatewayResponse::Success { data: Some(d), .. } => Ok(d.id),
        GatewayResponse::Success { data: None, .. } | GatewayResponse::Ack => {
            Err(MediaError::malformed("gateway success carried no id"))
        }
        GatewayResponse::Error { error } => Err(MediaError::rejected(error)),
    }
}

fn expect_ok(response: GatewayResponse) -> Result<(), MediaError> {
    match response {
        GatewayResponse::Success { .. } | GatewayResponse::Ack => Ok(()),
        GatewayResponse::Error { error } => Err(MediaError::rejected(error)),
    }
}

impl GatewayTransport for HttpGatewayClient {
    async fn open_session(&self) -> Result<ConnectionId, MediaError> {
        let request = GatewayRequest::Create {
            transaction: Self::transaction(),
            secret: self.secret.clone(),
        };
        let response = self.post(&self.base_url, &request).await?;
        expect_id(response).map(ConnectionId::new)
    }

    async fn attach_handle(
        &self,
        connection: &ConnectionId,
        plugin: Plugin,
    ) -> Result<HandleId, MediaError> {
        let request = GatewayRequest::Attach {
            transaction: Self::transaction(),
            plugin,
            secret: self.secret.clone(),
        };
        let response = self.post(&self.session_url(connection), &request).await?;
        expect_id(response).map(HandleId::new)
    }

    async fn send_message(
        &self,
        connection: &ConnectionId,
        handle: &HandleId,
        body: PluginBody,
        sdp: Option<SessionDescription>,
    ) -> Result<PluginReply, MediaError> {
        let request = GatewayRequest::Message {
            transaction: Self::transaction(),
            body,
            secret: self.secret.clone(),
            sdp,
        };
        let response = self.post(&self.handle_url(connection, handle), &request).await?;

        match response {
            GatewayResponse::Ack => Ok(PluginReply { data: None }),
            GatewayResponse::Success { payload, .. } => match payload {
                Some(payload) => {
                    if let Some(info) = payload.error_info() {
                        return Err(MediaError::rejected(Some(info)));
                    }
                    Ok(PluginReply {
                        data: Some(payload.data),
                    })
                }
                None => Ok(PluginReply { data: None }),
            },
            GatewayResponse::Error { error } => Err(MediaError::rejected(error)),
        }
    }

    async fn detach_handle(
        &self,
        connection: &ConnectionId,
        handle: &HandleId,
    ) -> Result<(), MediaError> {
        let request = GatewayRequest::Detach {
            transaction: Self::transaction(),
            secret: self.secret.clone(),
        };
        let response = self.post(&self.handle_url(connection, handle), &request).await?;
        expect_ok(response)
    }

    async fn close_session(&self, connection: &ConnectionId) -> Result<(), MediaError> {
        let request = GatewayRequest::Destroy {
            transaction: Self::transaction(),
            secret: self.secret.clone(),
        };
        let response = self.post(&self.session_url(connection), &request).await?;
        expect_ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_gateway_types::{GatewayErrorInfo, PluginPayload, SessionData};

    fn client() -> HttpGatewayClient {
        HttpGatewayClient::new(&GatewayConfig {
            url: "http://sfu:8188/gateway/".into(),
            secret: "s3cret".into(),
            request_timeout: std::time::Duration::from_millis(100),
        })
        .unwrap()
    }

    #[test]
    fn base_url_is_normalized() {
        let client = client();
        assert_eq!(client.base_url, "http://sfu:8188/gateway");
        assert_eq!(
            client.session_url(&ConnectionId::new("c1")),
            "http://sfu:8188/gateway/c1"
        );
        assert_eq!(
            client.handle_url(&ConnectionId::new("c1"), &HandleId::new("h2")),
            "http://sfu:8188/gateway/c1/h2"
        );
    }

    #[test]
    fn transactions_are_unique() {
        assert_ne!(
            HttpGatewayClient::transaction(),
            HttpGatewayClient::transaction()
        );
    }

    #[test]
    fn expect_id_rejects_bare_ack() {
        let err = expect_id(GatewayResponse::Ack).unwrap_err();
        assert!(matches!(err, MediaError::GatewayRejected { .. }));
    }

    #[test]
    fn expect_id_returns_the_new_id() {
        let response = GatewayResponse::Success {
            data: Some(SessionData { id: "c-17".into() }),
            payload: None,
        };
        assert_eq!(expect_id(response).unwrap(), "c-17");
    }

    #[test]
    fn expect_ok_surfaces_gateway_error() {
        let response = GatewayResponse::Error {
            error: Some(GatewayErrorInfo {
                code: Some(458),
                reason: "no such session".into(),
            }),
        };
        match expect_ok(response).unwrap_err() {
            MediaError::GatewayRejected { code, reason } => {
                assert_eq!(code, Some(458));
                assert_eq!(reason, "no such session");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn plugin_reply_decode_requires_payload() {
        let reply = PluginReply { data: None };
        assert!(reply.decode::<media_gateway_types::RoomCreated>().is_err());
    }

    #[test]
    fn payload_error_wins_over_decode() {
        // send_message surfaces embedded plugin errors before decoding.
        let payload = PluginPayload {
            data: serde_json::json!({ "error_code": 489, "error": "room exists" }),
        };
        assert!(payload.error_info().is_some());
    }
}

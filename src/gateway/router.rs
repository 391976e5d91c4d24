//! Endpoint behaviors of the gateway
//!
//! `GatewayRouter` composes the signer, the session translator and the
//! backend transport. Each endpoint makes exactly one backend call and turns
//! every outcome, including failures, into a response for its caller.

use crate::domain::envelope::fields;
use crate::domain::{RequestEnvelope, SessionToken, SmsWebhookForm};
use crate::gateway::backend::{BackendReply, BackendRequest, BackendTransport};
use crate::gateway::error_response::{proxy_failure_response, sms_failure_response, xml_response};
use crate::gateway::types::*;
use crate::gateway::url_resolver::UrlResolver;
use crate::session::SessionTranslator;
use crate::signing::RequestSigner;
use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Body sent by the SMS endpoint when the backend returns no `data`
pub const SMS_NO_DATA_BODY: &str = "No Data";

/// Dispatches the API, SMS and proxy endpoints
#[derive(Clone)]
pub struct GatewayRouter {
    config: Arc<GatewayConfig>,
    signer: RequestSigner,
    sessions: SessionTranslator,
    backend: Arc<dyn BackendTransport>,
}

impl GatewayRouter {
    pub fn new(config: GatewayConfig, backend: Arc<dyn BackendTransport>) -> Self {
        let signer = RequestSigner::new(config.secret.clone());
        let sessions = SessionTranslator::new(config.cookie_root_domain.clone());
        Self {
            config: Arc::new(config),
            signer,
            sessions,
            backend,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// JSON API passthrough
    ///
    /// The client body is the base envelope; `key` and `token` are attached,
    /// the result is signed and posted to the backend. Login and logout
    /// answers drive the session cookie, and the token never reaches the body.
    pub async fn relay_api(&self, session: &SessionToken, body: &[u8]) -> Response {
        match self.try_relay_api(session, body).await {
            Ok(response) => response,
            Err(error) => {
                if error.is_transport_failure() {
                    warn!(endpoint = "api", error = %error, "Backend not responding");
                } else {
                    warn!(endpoint = "api", error = %error, "API request failed");
                }
                error.into_response()
            }
        }
    }

    async fn try_relay_api(
        &self,
        session: &SessionToken,
        body: &[u8],
    ) -> GatewayResult<Response> {
        let envelope = RequestEnvelope::from_client_body(body)
            .map_err(|e| GatewayError::InvalidRequestBody(e.to_string()))?
            .with_credentials(&self.config.api_key, session);

        let reply = self.post_envelope(&envelope).await?;
        let mut body: Value = serde_json::from_slice(&reply.body)
            .map_err(GatewayError::MalformedBackendResponse)?;

        let directive = SessionTranslator::classify(&body);
        SessionTranslator::sanitize(&mut body);

        let mut response = (StatusCode::OK, Json(body)).into_response();
        self.sessions.apply_cookie(response.headers_mut(), &directive);
        Ok(response)
    }

    /// SMS provider webhook
    ///
    /// Answers with the backend's `data.twiml` verbatim, or `No Data` when
    /// the backend sent no `data`.
    pub async fn relay_sms(&self, session: &SessionToken, form: &SmsWebhookForm) -> Response {
        let envelope =
            RequestEnvelope::sms_webhook(form).with_credentials(&self.config.api_key, session);

        let body = match self.post_envelope(&envelope).await.and_then(|reply| {
            serde_json::from_slice::<Value>(&reply.body)
                .map_err(GatewayError::MalformedBackendResponse)
        }) {
            Ok(body) => body,
            Err(error) => {
                warn!(endpoint = "sms", error = %error, "SMS webhook failed");
                return sms_failure_response(&error);
            }
        };

        match body.get(fields::DATA) {
            None | Some(Value::Null) => xml_response(StatusCode::OK, SMS_NO_DATA_BODY),
            Some(data) => {
                let twiml = data
                    .get(fields::TWIML)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                xml_response(StatusCode::OK, twiml)
            }
        }
    }

    /// Generic proxy to the proxy backend
    ///
    /// Forwards the raw body and content type to the proxy backend path that
    /// follows the prefix. Only the session cookie is re-attached; the rest of
    /// the browser's cookies stay behind.
    pub async fn relay_proxy(
        &self,
        session: &SessionToken,
        path_and_query: &str,
        content_type: Option<HeaderValue>,
        body: Bytes,
    ) -> Response {
        match self
            .try_relay_proxy(session, path_and_query, content_type, body)
            .await
        {
            Ok(reply) => xml_response(StatusCode::OK, reply.body),
            Err(error) => {
                warn!(endpoint = "proxy", error = %error, "Proxy request failed");
                proxy_failure_response(&error)
            }
        }
    }

    async fn try_relay_proxy(
        &self,
        session: &SessionToken,
        path_and_query: &str,
        content_type: Option<HeaderValue>,
        body: Bytes,
    ) -> GatewayResult<BackendReply> {
        let proxy_backend = self.config.proxy_backend_url.as_ref().ok_or_else(|| {
            GatewayError::InvalidDestination("no proxy backend configured".to_string())
        })?;

        let destination = UrlResolver::resolve_proxy_destination(
            proxy_backend,
            &self.config.endpoints.proxy,
            path_and_query,
        )?;

        let cookie = HeaderValue::from_str(&SessionTranslator::outbound_cookie(session))
            .or_else(|_| {
                warn!(
                    endpoint = "proxy",
                    "Session token is not header-safe; forwarding without session"
                );
                HeaderValue::from_str(&SessionTranslator::outbound_cookie(&SessionToken::Absent))
            })
            .map_err(|e| GatewayError::InvalidDestination(e.to_string()))?;

        info!(endpoint = "proxy", destination = %destination, "Forwarding proxy request");
        self.backend
            .post(BackendRequest::raw(destination, content_type, cookie, body))
            .await
    }

    async fn post_envelope(&self, envelope: &RequestEnvelope) -> GatewayResult<BackendReply> {
        let signed = self.signer.sign(envelope);
        let uri = UrlResolver::backend_uri(&self.config.backend_url)?;
        self.backend
            .post(BackendRequest::json(uri, signed.to_json_bytes()?))
            .await
    }
}

impl std::fmt::Debug for GatewayRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayRouter")
            .field("config", &self.config)
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

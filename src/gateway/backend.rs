//! Outbound HTTP calls to the backend
//!
//! One attempt per inbound request, no retries. The only timeout is the
//! transport's own; a non-2xx answer counts as a failed call and carries the
//! backend body along for endpoints that relay it.

use crate::gateway::headers::content_types;
use crate::gateway::types::*;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{CONTENT_TYPE, COOKIE};
use http::{HeaderMap, HeaderValue, Method, Request, StatusCode, Uri};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use std::time::Duration;
use tracing::debug;

/// POST request bound for the backend
#[derive(Clone, Debug)]
pub struct BackendRequest {
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl BackendRequest {
    /// JSON request carrying a signed envelope
    pub fn json(uri: Uri, body: Vec<u8>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static(content_types::APPLICATION_JSON_UTF8),
        );
        Self {
            uri,
            headers,
            body: Bytes::from(body),
        }
    }

    /// Raw request with the caller's content type and a session cookie
    pub fn raw(
        uri: Uri,
        content_type: Option<HeaderValue>,
        cookie: HeaderValue,
        body: Bytes,
    ) -> Self {
        let mut headers = HeaderMap::new();
        if let Some(content_type) = content_type {
            headers.insert(CONTENT_TYPE, content_type);
        }
        headers.insert(COOKIE, cookie);
        Self { uri, headers, body }
    }
}

/// Successful backend answer
#[derive(Clone, Debug)]
pub struct BackendReply {
    pub status: StatusCode,
    pub body: Bytes,
}

/// Transport used to reach the backend
#[async_trait]
pub trait BackendTransport: Send + Sync {
    /// Issue a POST; `Ok` only for a 2xx answer
    async fn post(&self, request: BackendRequest) -> GatewayResult<BackendReply>;
}

/// Backend transport on the hyper client
#[derive(Clone)]
pub struct HyperBackend {
    client: Client<HttpConnector, Full<Bytes>>,
    request_timeout: Duration,
    max_response_size: ResponseSizeLimit,
}

impl HyperBackend {
    pub fn new(request_timeout: Duration, max_response_size: ResponseSizeLimit) -> Self {
        let client = Client::builder(TokioExecutor::new())
            .http1_title_case_headers(true)
            .build_http();

        Self {
            client,
            request_timeout,
            max_response_size,
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(config.request_timeout, config.max_response_size)
    }
}

#[async_trait]
impl BackendTransport for HyperBackend {
    async fn post(&self, request: BackendRequest) -> GatewayResult<BackendReply> {
        let mut builder = Request::builder().method(Method::POST).uri(request.uri);
        if let Some(headers) = builder.headers_mut() {
            headers.extend(request.headers);
        }
        let outgoing = builder.body(Full::new(request.body))?;

        let response: http::Response<Incoming> =
            tokio::time::timeout(self.request_timeout, self.client.request(outgoing))
                .await
                .map_err(|_| GatewayError::Timeout(self.request_timeout))?
                .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        let max_size = self.max_response_size;
        let body = Limited::new(response.into_body(), *max_size.as_ref())
            .collect()
            .await
            .map_err(|e| {
                if e.is::<LengthLimitError>() {
                    GatewayError::ResponseTooLarge { max_size }
                } else {
                    GatewayError::Transport(format!("Body collection error: {e}"))
                }
            })?
            .to_bytes();

        debug!(status = status.as_u16(), bytes = body.len(), "Backend answered");

        if status.is_success() {
            Ok(BackendReply { status, body })
        } else {
            Err(GatewayError::UpstreamStatus { status, body })
        }
    }
}

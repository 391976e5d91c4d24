//! Type definitions for the gateway module

use crate::domain::{ApiKey, CookieDomain, SharedSecret};
use bytes::Bytes;
use http::StatusCode;
use nutype::nutype;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

// ========== Size Types ==========

/// Maximum size for inbound request bodies in bytes
#[nutype(
    derive(Clone, Copy, Debug, Display, PartialEq, Deserialize, TryFrom, AsRef),
    validate(predicate = |size: &usize| *size > 0)
)]
pub struct RequestSizeLimit(usize);

/// Maximum size for backend response bodies in bytes
#[nutype(
    derive(Clone, Copy, Debug, Display, PartialEq, Deserialize, TryFrom, AsRef),
    validate(predicate = |size: &usize| *size > 0)
)]
pub struct ResponseSizeLimit(usize);

// ========== URL and Path Types ==========

/// Backend base URL
///
/// The backend is a private service reached over plain HTTP.
#[nutype(
    sanitize(trim),
    derive(Clone, Debug, Display, PartialEq, Eq, Deserialize, AsRef),
    validate(predicate = |s| s.starts_with("http://") && s.len() > "http://".len())
)]
pub struct BackendUrl(String);

/// Public path an endpoint is mounted on
///
/// Starts with `/`, has at least one more character, no trailing `/`, and no
/// characters the router treats as captures.
#[nutype(
    sanitize(trim),
    derive(Clone, Debug, Display, PartialEq, Eq, Deserialize, AsRef),
    validate(predicate = |s| {
        s.len() > 1
            && s.starts_with('/')
            && !s.ends_with('/')
            && !s.contains(|c: char| matches!(c, '{' | '}' | '*' | '?' | '#') || c.is_whitespace())
    })
)]
pub struct EndpointPath(String);

// ========== Defaults ==========

pub const DEFAULT_API_PATH: &str = "/json-api";
pub const DEFAULT_SMS_PATH: &str = "/sms";
pub const DEFAULT_PROXY_PATH: &str = "/proxy";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 2 * 1024 * 1024;
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 10 * 1024 * 1024;

/// Paths the three endpoints are mounted on
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointPaths {
    pub api: EndpointPath,
    pub sms: EndpointPath,
    pub proxy: EndpointPath,
}

impl Default for EndpointPaths {
    fn default() -> Self {
        Self {
            api: EndpointPath::try_new(DEFAULT_API_PATH).expect("default API path is valid"),
            sms: EndpointPath::try_new(DEFAULT_SMS_PATH).expect("default SMS path is valid"),
            proxy: EndpointPath::try_new(DEFAULT_PROXY_PATH)
                .expect("default proxy path is valid"),
        }
    }
}

/// Immutable gateway configuration shared by every request
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub api_key: ApiKey,
    pub secret: SharedSecret,
    pub backend_url: BackendUrl,
    /// Proxy endpoint is only mounted when this is set
    pub proxy_backend_url: Option<BackendUrl>,
    pub endpoints: EndpointPaths,
    pub cookie_root_domain: Option<CookieDomain>,
    pub request_timeout: Duration,
    pub max_request_size: RequestSizeLimit,
    pub max_response_size: ResponseSizeLimit,
}

impl GatewayConfig {
    /// Configuration with default paths and limits
    pub fn new(api_key: ApiKey, secret: SharedSecret, backend_url: BackendUrl) -> Self {
        Self {
            api_key,
            secret,
            backend_url,
            proxy_backend_url: None,
            endpoints: EndpointPaths::default(),
            cookie_root_domain: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_request_size: RequestSizeLimit::try_new(DEFAULT_MAX_REQUEST_BYTES)
                .expect("default request limit is valid"),
            max_response_size: ResponseSizeLimit::try_new(DEFAULT_MAX_RESPONSE_BYTES)
                .expect("default response limit is valid"),
        }
    }

    pub fn with_proxy_backend(mut self, url: BackendUrl) -> Self {
        self.proxy_backend_url = Some(url);
        self
    }

    pub fn with_endpoints(mut self, endpoints: EndpointPaths) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_cookie_root_domain(mut self, domain: CookieDomain) -> Self {
        self.cookie_root_domain = Some(domain);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Errors scoped to a single gateway request
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Connection error: {0}")]
    Transport(String),

    #[error("Backend request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Backend response exceeded {max_size} bytes")]
    ResponseTooLarge { max_size: ResponseSizeLimit },

    #[error("Backend answered with status {status}")]
    UpstreamStatus { status: StatusCode, body: Bytes },

    #[error("Backend response is not valid JSON: {0}")]
    MalformedBackendResponse(serde_json::Error),

    #[error("Invalid request body: {0}")]
    InvalidRequestBody(String),

    #[error("Invalid destination: {0}")]
    InvalidDestination(String),

    #[error("HTTP error: {0}")]
    Http(#[from] http::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GatewayError {
    /// The backend call produced no usable response
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::Timeout(_)
                | Self::ResponseTooLarge { .. }
                | Self::UpstreamStatus { .. }
        )
    }

    /// Body the backend sent along with a failure status, if any
    pub fn upstream_body(&self) -> Option<&Bytes> {
        match self {
            Self::UpstreamStatus { body, .. } if !body.is_empty() => Some(body),
            _ => None,
        }
    }
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;
